//! Client-side game state: snapshots, reconciliation, targeting and submission

pub mod channel;
pub mod client;
pub mod events;
pub mod feedback;
pub mod logger;
pub mod reconciler;
pub mod rules;
pub mod scripted_server;
pub mod snapshot;
pub mod submitter;
pub mod targeting;

pub use channel::{Ack, MpscChannel, Outbound, OutboundRequest, ServerChannel};
pub use client::{ClickOutcome, GameClient};
pub use events::{load_event_log, parse_event_log, EndReason, GameOutcome, ServerEvent};
pub use feedback::{FeedbackConfig, FeedbackContext, FeedbackCue};
pub use logger::{ClientLogger, LogEntry, OutputFormat, OutputMode, VerbosityLevel};
pub use reconciler::{reconcile, EntityReconciler, ReconcileReport};
pub use rules::{LegalMoveTable, RulesOracle};
pub use scripted_server::{ScriptStep, ScriptedServer};
pub use snapshot::{parse_placement, GameStatus, LastMove, PlacementSnapshot, START_PLACEMENT};
pub use submitter::{
    compose, AbilityDrop, ActionSubmitter, Composition, MoveAttempt, MoveSelection, PendingAction,
    RejectionPolicy, SubmissionOutcome, SubmissionState, TurnContext,
};
pub use targeting::{
    ArcanaInvocation, BindOutcome, TargetBinding, TargetingSession, TargetingState, TargetingView,
};
