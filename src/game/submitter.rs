//! Action composition and submission
//!
//! A submission goes through three steps:
//!
//! 1. `prepare` composes the move and the optional arcana activation into a
//!    [`PendingAction`], plays the optimistic cue and marks the submitter
//!    busy. A second `prepare` while busy is refused.
//! 2. The action is sent over a [`ServerChannel`].
//! 3. `resolve` applies the acknowledgement. Acceptance consumes the
//!    targeting session and clears the move selection. Rejection retracts the
//!    optimistic cue and, under [`RejectionPolicy::RetainOnRejection`], leaves
//!    selection and session in place so the player can resend at once.
//!
//! `submit` runs all three with a bounded wait. When the wait runs out the
//! submission becomes *unknown*: the next snapshot settles it by checking
//! whether its last move is the one we sent.

use crate::core::{ArcanaKind, PieceKind, Side, Square};
use crate::game::channel::{Ack, ServerChannel};
use crate::game::feedback::{FeedbackContext, FeedbackCue};
use crate::game::logger::{ClientLogger, VerbosityLevel};
use crate::game::snapshot::PlacementSnapshot;
use crate::game::targeting::{ArcanaInvocation, TargetingSession};
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// Reason given when an unacknowledged submission is settled as refused
pub const TIMEOUT_REASON: &str = "acknowledgement timed out";

/// A board move, already checked by the local rules library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAttempt {
    pub from: Square,
    pub to: Square,
    #[serde(
        rename = "replacementKind",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub promotion: Option<PieceKind>,
}

impl MoveAttempt {
    pub fn new(from: Square, to: Square) -> Self {
        MoveAttempt {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }
}

impl fmt::Display for MoveAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "={}", kind.fen_char(Side::White))?;
        }
        Ok(())
    }
}

/// The atomic unit sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    #[serde(rename = "move")]
    pub movement: MoveAttempt,
    #[serde(
        rename = "abilityInvocation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub arcana: Option<ArcanaInvocation>,
}

/// Why a selected ability was left out of a composed action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityDrop {
    /// Selected but not fully bound
    Incomplete(ArcanaKind),
    /// Already spent this game
    AlreadyUsed(ArcanaKind),
    NotInInventory(ArcanaKind),
    /// Arcana unlock with the first capture
    NotAscended(ArcanaKind),
}

impl fmt::Display for AbilityDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbilityDrop::Incomplete(a) => write!(f, "{} is not fully targeted", a),
            AbilityDrop::AlreadyUsed(a) => write!(f, "{} was already used", a),
            AbilityDrop::NotInInventory(a) => write!(f, "{} is not in hand", a),
            AbilityDrop::NotAscended(a) => write!(f, "{} is locked until ascension", a),
        }
    }
}

/// Output of composing a move
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub action: PendingAction,
    pub dropped: Option<AbilityDrop>,
    pub cue: FeedbackCue,
}

/// Whose move it is and the snapshot it is made against
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub snapshot: &'a PlacementSnapshot,
    pub acting: Side,
}

/// Compose a move and the session's ability into one action
///
/// Fails only for move-level problems (missing piece, missing or invalid
/// promotion). Ability problems never block the move: the ability is left
/// out and the reason reported in `dropped`.
pub fn compose(
    attempt: &MoveAttempt,
    session: &TargetingSession,
    ctx: &TurnContext<'_>,
) -> Result<Composition> {
    let occupants = ctx.snapshot.occupants()?;
    let mover = occupants
        .iter()
        .find(|o| o.square == attempt.from && o.side == ctx.acting)
        .ok_or(ArcanaError::IllegalMove {
            from: attempt.from,
            to: attempt.to,
        })?;
    let destination_occupied = occupants.iter().any(|o| o.square == attempt.to);

    let reaches_last_rank =
        mover.kind == PieceKind::Pawn && attempt.to.rank() == ctx.acting.promotion_rank();
    match (reaches_last_rank, attempt.promotion) {
        (true, None) => {
            return Err(ArcanaError::PromotionRequired {
                from: attempt.from,
                to: attempt.to,
            })
        }
        (true, Some(kind)) if !kind.is_promotion_choice() => {
            return Err(ArcanaError::InvalidPromotion(format!("cannot promote to {}", kind)))
        }
        (false, Some(kind)) => {
            return Err(ArcanaError::InvalidPromotion(format!(
                "{} does not promote (got {})",
                attempt, kind
            )))
        }
        _ => {}
    }

    let mut dropped = None;
    let mut arcana = None;
    if let Some(selected) = session.arcana() {
        let snapshot = ctx.snapshot;
        if !session.is_complete() {
            dropped = Some(AbilityDrop::Incomplete(selected));
        } else if snapshot.has_used(ctx.acting, selected) {
            dropped = Some(AbilityDrop::AlreadyUsed(selected));
        } else if !snapshot.has_arcana(ctx.acting, selected) {
            dropped = Some(AbilityDrop::NotInInventory(selected));
        } else if !snapshot.ascended {
            dropped = Some(AbilityDrop::NotAscended(selected));
        } else {
            arcana = session.invocation();
        }
    }

    Ok(Composition {
        action: PendingAction {
            movement: *attempt,
            arcana,
        },
        dropped,
        cue: FeedbackCue::for_destination(destination_occupied),
    })
}

/// What happens to selection and targeting when the server refuses an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Keep both so the player can resend immediately
    #[default]
    RetainOnRejection,
    /// Reset both
    ClearOnRejection,
}

/// Square selection and the move awaiting submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSelection {
    pub selected: Option<Square>,
    pub destinations: Vec<Square>,
    pub pending: Option<MoveAttempt>,
}

impl MoveSelection {
    pub fn clear(&mut self) {
        self.selected = None;
        self.destinations.clear();
        self.pending = None;
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none() && self.pending.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    AwaitingAck { action: PendingAction, sent_at: Instant },
    /// No acknowledgement arrived; settled by the next snapshot
    Unknown { action: PendingAction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { action: PendingAction },
    Rejected { reason: String },
}

#[derive(Debug)]
pub struct ActionSubmitter {
    policy: RejectionPolicy,
    ack_timeout: Duration,
    state: SubmissionState,
    last_error: Option<String>,
    logger: Rc<ClientLogger>,
}

impl ActionSubmitter {
    pub fn new(policy: RejectionPolicy, ack_timeout: Duration, logger: Rc<ClientLogger>) -> Self {
        ActionSubmitter {
            policy,
            ack_timeout,
            state: SubmissionState::Idle,
            last_error: None,
            logger,
        }
    }

    pub fn policy(&self) -> RejectionPolicy {
        self.policy
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SubmissionState::AwaitingAck { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.state, SubmissionState::Unknown { .. })
    }

    /// Transient error text for the UI
    pub fn error_text(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Compose an action and mark it as sent
    ///
    /// An unresolved (timed out) submission does not block a new one; the
    /// server refuses stale duplicates on its own.
    pub fn prepare(
        &mut self,
        attempt: &MoveAttempt,
        session: &TargetingSession,
        ctx: &TurnContext<'_>,
        feedback: &mut FeedbackContext,
    ) -> Result<Composition> {
        if self.is_in_flight() {
            return Err(ArcanaError::SubmissionInFlight);
        }
        if ctx.snapshot.is_ended() {
            return Err(ArcanaError::GameOver);
        }
        if ctx.snapshot.turn != ctx.acting {
            return Err(ArcanaError::NotYourTurn);
        }

        let composition = compose(attempt, session, ctx)?;

        if let SubmissionState::Unknown { action } = &self.state {
            self.logger.event(
                VerbosityLevel::Normal,
                "submit",
                format_args!("superseding unresolved {}", action.movement),
            );
        }
        if let Some(dropped) = composition.dropped {
            self.logger
                .event(VerbosityLevel::Normal, "submit", format_args!("arcana left out: {}", dropped));
        }

        feedback.play_optimistic(composition.cue);
        self.last_error = None;
        self.state = SubmissionState::AwaitingAck {
            action: composition.action.clone(),
            sent_at: Instant::now(),
        };

        match &composition.action.arcana {
            Some(invocation) => self.logger.event(
                VerbosityLevel::Normal,
                "submit",
                format_args!("sending {} with {}", composition.action.movement, invocation.arcana),
            ),
            None => self.logger.event(
                VerbosityLevel::Normal,
                "submit",
                format_args!("sending {}", composition.action.movement),
            ),
        }

        Ok(composition)
    }

    /// Apply the server's acknowledgement to the submission in flight
    ///
    /// A late acknowledgement for a timed-out submission is accepted too.
    pub fn resolve(
        &mut self,
        ack: &Ack,
        session: &mut TargetingSession,
        selection: &mut MoveSelection,
        feedback: &mut FeedbackContext,
    ) -> Result<SubmissionOutcome> {
        let (action, elapsed) = match std::mem::replace(&mut self.state, SubmissionState::Idle) {
            SubmissionState::AwaitingAck { action, sent_at } => (action, Some(sent_at.elapsed())),
            SubmissionState::Unknown { action } => (action, None),
            SubmissionState::Idle => {
                return Err(ArcanaError::InvalidTransition(
                    "no submission awaiting acknowledgement".to_string(),
                ))
            }
        };

        if ack.ok {
            feedback.confirm();
            session.consume();
            selection.clear();
            self.last_error = None;
            self.logger.event(
                VerbosityLevel::Normal,
                "submit",
                format_args!("{} accepted after {:?}", action.movement, elapsed.unwrap_or_default()),
            );
            Ok(SubmissionOutcome::Accepted { action })
        } else {
            let reason = ack.reason().to_string();
            feedback.retract();
            self.reject(&action, &reason, session, selection);
            Ok(SubmissionOutcome::Rejected { reason })
        }
    }

    /// No acknowledgement (timeout or transport failure); wait for a snapshot
    pub fn expire(&mut self, reason: &str, feedback: &mut FeedbackContext) {
        if let SubmissionState::AwaitingAck { action, .. } =
            std::mem::replace(&mut self.state, SubmissionState::Idle)
        {
            feedback.retract();
            self.logger.event(
                VerbosityLevel::Minimal,
                "submit",
                format_args!("{} unresolved: {}", action.movement, reason),
            );
            self.last_error = Some(reason.to_string());
            self.state = SubmissionState::Unknown { action };
        }
    }

    /// Settle an unknown submission against a fresh snapshot
    pub fn settle_unknown(
        &mut self,
        snapshot: &PlacementSnapshot,
        session: &mut TargetingSession,
        selection: &mut MoveSelection,
    ) -> Option<SubmissionOutcome> {
        let SubmissionState::Unknown { action } =
            std::mem::replace(&mut self.state, SubmissionState::Idle)
        else {
            return None;
        };

        let landed = snapshot
            .last_move
            .map(|m| m.from == action.movement.from && m.to == action.movement.to)
            .unwrap_or(false);

        if landed {
            session.consume();
            selection.clear();
            self.last_error = None;
            self.logger.event(
                VerbosityLevel::Normal,
                "submit",
                format_args!("{} confirmed by snapshot", action.movement),
            );
            Some(SubmissionOutcome::Accepted { action })
        } else {
            self.reject(&action, TIMEOUT_REASON, session, selection);
            Some(SubmissionOutcome::Rejected {
                reason: TIMEOUT_REASON.to_string(),
            })
        }
    }

    fn reject(
        &mut self,
        action: &PendingAction,
        reason: &str,
        session: &mut TargetingSession,
        selection: &mut MoveSelection,
    ) {
        self.logger.event(
            VerbosityLevel::Minimal,
            "submit",
            format_args!("{} rejected: {}", action.movement, reason),
        );
        self.last_error = Some(reason.to_string());
        if self.policy == RejectionPolicy::ClearOnRejection {
            session.cancel();
            selection.clear();
        }
    }

    /// Compose, send and await the acknowledgement within `ack_timeout`
    #[allow(clippy::too_many_arguments)]
    pub async fn submit<C: ServerChannel>(
        &mut self,
        channel: &mut C,
        attempt: &MoveAttempt,
        session: &mut TargetingSession,
        selection: &mut MoveSelection,
        ctx: &TurnContext<'_>,
        feedback: &mut FeedbackContext,
    ) -> Result<SubmissionOutcome> {
        let composition = self.prepare(attempt, session, ctx, feedback)?;

        match tokio::time::timeout(self.ack_timeout, channel.submit_action(&composition.action)).await {
            Ok(Ok(ack)) => self.resolve(&ack, session, selection, feedback),
            Ok(Err(e)) => {
                self.expire(&e.to_string(), feedback);
                Err(e)
            }
            Err(_) => {
                self.expire(TIMEOUT_REASON, feedback);
                Err(ArcanaError::AckTimeout(self.ack_timeout))
            }
        }
    }
}
