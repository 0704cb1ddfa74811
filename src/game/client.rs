//! Game client: the piece that hosts drive
//!
//! `GameClient` owns the reconciler, the targeting session, the square
//! selection and the submitter for one local player. The host feeds it
//! server events in arrival order and user input (square clicks, ability
//! selection, promotion choice), and calls the async request methods with
//! whatever `ServerChannel` it uses.

use crate::config::ClientConfig;
use crate::core::{ArcanaKind, PieceEntity, PieceKind, Side, Square, TargetKind};
use crate::game::channel::{Ack, ServerChannel};
use crate::game::events::{GameOutcome, ServerEvent};
use crate::game::feedback::FeedbackContext;
use crate::game::logger::{ClientLogger, VerbosityLevel};
use crate::game::reconciler::{EntityReconciler, ReconcileReport};
use crate::game::rules::RulesOracle;
use crate::game::snapshot::PlacementSnapshot;
use crate::game::submitter::{
    ActionSubmitter, Composition, MoveAttempt, MoveSelection, SubmissionOutcome, TurnContext,
    TIMEOUT_REASON,
};
use crate::game::targeting::{BindOutcome, TargetingSession, TargetingView};
use crate::{ArcanaError, Result};
use std::rc::Rc;

/// What a square click did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Own piece selected; its legal destinations are in the selection
    Selected { square: Square, destinations: usize },
    Deselected,
    TargetBound(BindOutcome),
    /// Ability target refused; show the reason once
    TargetRejected(String),
    /// A move is ready to submit
    MoveReady(MoveAttempt),
    /// A pawn reaches the last rank; call `choose_promotion` first
    PromotionRequired(MoveAttempt),
    Ignored,
}

pub struct GameClient<R: RulesOracle> {
    side: Side,
    logger: Rc<ClientLogger>,
    reconciler: EntityReconciler,
    targeting: TargetingSession,
    selection: MoveSelection,
    submitter: ActionSubmitter,
    feedback: FeedbackContext,
    rules: R,
    snapshot: Option<PlacementSnapshot>,
    last_report: Option<ReconcileReport>,
    outcome: Option<GameOutcome>,
    drawn: Vec<ArcanaKind>,
    opponent_draws: u32,
    opponent_used: Vec<(ArcanaKind, Option<Square>)>,
    draw_cooldown: u32,
    notice: Option<String>,
}

impl<R: RulesOracle> GameClient<R> {
    pub fn new(side: Side, config: &ClientConfig, rules: R) -> Self {
        let logger = Rc::new(ClientLogger::with_verbosity(config.verbosity));
        Self::with_logger(side, config, rules, logger)
    }

    /// Build a client that logs through an existing logger
    pub fn with_logger(side: Side, config: &ClientConfig, rules: R, logger: Rc<ClientLogger>) -> Self {
        GameClient {
            side,
            reconciler: EntityReconciler::new(Rc::clone(&logger)),
            targeting: TargetingSession::new(),
            selection: MoveSelection::default(),
            submitter: ActionSubmitter::new(
                config.rejection_policy,
                config.ack_timeout(),
                Rc::clone(&logger),
            ),
            feedback: FeedbackContext::init(config.feedback, Rc::clone(&logger)),
            rules,
            snapshot: None,
            last_report: None,
            outcome: None,
            drawn: Vec::new(),
            opponent_draws: 0,
            opponent_used: Vec::new(),
            draw_cooldown: 0,
            notice: None,
            logger,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn logger(&self) -> &Rc<ClientLogger> {
        &self.logger
    }

    pub fn snapshot(&self) -> Option<&PlacementSnapshot> {
        self.snapshot.as_ref()
    }

    /// Renderable entities for this cycle
    pub fn entities(&self) -> &[PieceEntity] {
        self.reconciler.entities()
    }

    pub fn reconciler(&self) -> &EntityReconciler {
        &self.reconciler
    }

    pub fn last_report(&self) -> Option<&ReconcileReport> {
        self.last_report.as_ref()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn targeting(&self) -> &TargetingSession {
        &self.targeting
    }

    pub fn selection(&self) -> &MoveSelection {
        &self.selection
    }

    pub fn submitter(&self) -> &ActionSubmitter {
        &self.submitter
    }

    pub fn feedback(&self) -> &FeedbackContext {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut FeedbackContext {
        &mut self.feedback
    }

    /// Arcana this player has drawn, as revealed by the server
    pub fn drawn_arcana(&self) -> &[ArcanaKind] {
        &self.drawn
    }

    /// Opponent draws are hidden; only their number is known
    pub fn opponent_draws(&self) -> u32 {
        self.opponent_draws
    }

    pub fn opponent_used(&self) -> &[(ArcanaKind, Option<Square>)] {
        &self.opponent_used
    }

    /// Transient error text for the UI
    pub fn error_text(&self) -> Option<&str> {
        self.notice.as_deref().or_else(|| self.submitter.error_text())
    }

    pub fn dismiss_error(&mut self) {
        self.notice = None;
        self.submitter.dismiss_error();
    }

    pub fn is_my_turn(&self) -> bool {
        self.snapshot
            .as_ref()
            .map(|s| s.turn == self.side && !s.is_ended())
            .unwrap_or(false)
            && self.outcome.is_none()
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some() || self.snapshot.as_ref().map(|s| s.is_ended()).unwrap_or(false)
    }

    /// Cooldown is counted by the host (in turns)
    pub fn set_draw_cooldown(&mut self, turns: u32) {
        self.draw_cooldown = turns;
    }

    pub fn draw_cooldown(&self) -> u32 {
        self.draw_cooldown
    }

    pub fn can_draw_arcana(&self) -> bool {
        self.is_my_turn() && !self.submitter.is_in_flight() && self.draw_cooldown == 0
    }

    /// Apply one server event
    ///
    /// A malformed snapshot is refused and leaves every piece of client
    /// state as it was.
    pub fn apply_event(&mut self, event: &ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            ServerEvent::GameEnded { winner, reason } => {
                self.outcome = Some(GameOutcome {
                    winner: *winner,
                    reason: *reason,
                });
                self.targeting.cancel();
                self.selection.clear();
                match winner {
                    Some(side) => self.logger.event(
                        VerbosityLevel::Minimal,
                        "game",
                        format_args!("game over: {} wins ({})", side, reason),
                    ),
                    None => self.logger.event(
                        VerbosityLevel::Minimal,
                        "game",
                        format_args!("game over: draw ({})", reason),
                    ),
                }
                Ok(())
            }
            ServerEvent::ArcanaDrawn { side, arcana } => {
                if *side == self.side {
                    if let Some(arcana) = arcana {
                        self.drawn.push(*arcana);
                        self.logger
                            .event(VerbosityLevel::Normal, "arcana", format_args!("drew {}", arcana));
                    }
                } else {
                    // Content of an opponent draw is never kept
                    self.opponent_draws += 1;
                    self.logger
                        .event(VerbosityLevel::Normal, "arcana", format_args!("{} drew an arcana", side));
                }
                Ok(())
            }
            ServerEvent::ArcanaUsed { side, arcana, target } => {
                if *side != self.side {
                    self.opponent_used.push((*arcana, *target));
                }
                match target {
                    Some(square) => self.logger.event(
                        VerbosityLevel::Normal,
                        "arcana",
                        format_args!("{} used {} on {}", side, arcana, square),
                    ),
                    None => self.logger.event(
                        VerbosityLevel::Normal,
                        "arcana",
                        format_args!("{} used {}", side, arcana),
                    ),
                }
                Ok(())
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &PlacementSnapshot) -> Result<()> {
        let report = self.reconciler.apply(snapshot)?;

        if let Some(previous) = &self.snapshot {
            for side in [Side::White, Side::Black] {
                let before = previous.used_arcana.get(side).len();
                let after = snapshot.used_arcana.get(side).len();
                if after < before {
                    self.logger.event(
                        VerbosityLevel::Minimal,
                        "arcana",
                        format_args!("warning: {} used arcana shrank from {} to {}", side, before, after),
                    );
                }
            }
        }

        self.submitter
            .settle_unknown(snapshot, &mut self.targeting, &mut self.selection);

        if snapshot.turn != self.side || snapshot.is_ended() {
            self.targeting.cancel();
            self.selection.clear();
        } else if let Some(selected) = self.selection.selected {
            // Selection survives only while the piece is still ours
            let still_ours = snapshot
                .occupant_at(selected)?
                .map(|o| o.side == self.side)
                .unwrap_or(false);
            if still_ours {
                self.selection.destinations = self.rules.legal_destinations(snapshot, selected);
            } else {
                self.selection.clear();
            }
        }

        self.last_report = Some(report);
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    /// The current snapshot, if this player may act on it
    fn playable<'a>(
        snapshot: &'a Option<PlacementSnapshot>,
        outcome: Option<GameOutcome>,
        side: Side,
    ) -> Result<&'a PlacementSnapshot> {
        let snapshot = snapshot
            .as_ref()
            .ok_or_else(|| ArcanaError::InvalidTransition("no snapshot received yet".to_string()))?;
        if outcome.is_some() || snapshot.is_ended() {
            return Err(ArcanaError::GameOver);
        }
        if snapshot.turn != side {
            return Err(ArcanaError::NotYourTurn);
        }
        Ok(snapshot)
    }

    /// Start targeting with an ability from this player's inventory
    pub fn select_ability(&mut self, arcana: ArcanaKind) -> Result<TargetKind> {
        let snapshot = Self::playable(&self.snapshot, self.outcome, self.side)?;
        let reason = if snapshot.has_used(self.side, arcana) {
            Some("already used")
        } else if !snapshot.has_arcana(self.side, arcana) {
            Some("not in hand")
        } else if !snapshot.ascended {
            Some("locked until ascension")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ArcanaError::ArcanaUnavailable {
                arcana,
                reason: reason.to_string(),
            });
        }

        let required = self.targeting.select_ability(arcana);
        self.logger.event(
            VerbosityLevel::Verbose,
            "targeting",
            format_args!("selected {} (target {:?})", arcana, required),
        );
        Ok(required)
    }

    pub fn cancel_targeting(&mut self) {
        self.targeting.cancel();
    }

    /// Secondary parameter for the selected ability
    pub fn choose_parameter(&mut self, kind: PieceKind) -> Result<()> {
        self.targeting.bind_parameter(kind)
    }

    pub fn targeting_view(&self) -> Option<TargetingView> {
        self.snapshot
            .as_ref()
            .map(|snapshot| self.targeting.view(snapshot, self.side))
    }

    /// Handle a click on `square`
    ///
    /// While an ability awaits its target the click goes to the targeting
    /// session; otherwise it drives piece selection and move building.
    pub fn click(&mut self, square: Square) -> Result<ClickOutcome> {
        if self.submitter.is_in_flight() {
            return Err(ArcanaError::SubmissionInFlight);
        }
        let snapshot = Self::playable(&self.snapshot, self.outcome, self.side)?;

        if self.targeting.is_awaiting_target() {
            return match self.targeting.attempt_bind(square, snapshot, self.side) {
                Ok(outcome) => Ok(ClickOutcome::TargetBound(outcome)),
                Err(ArcanaError::InvalidTarget { reason, .. }) => {
                    self.logger.event(
                        VerbosityLevel::Verbose,
                        "targeting",
                        format_args!("{} refused: {}", square, reason),
                    );
                    Ok(ClickOutcome::TargetRejected(reason))
                }
                Err(e) => Err(e),
            };
        }

        if self.selection.selected == Some(square) {
            self.selection.clear();
            return Ok(ClickOutcome::Deselected);
        }

        if let Some(from) = self.selection.selected {
            if self.selection.destinations.contains(&square) {
                let attempt = MoveAttempt::new(from, square);
                self.selection.pending = Some(attempt);
                let mover = snapshot.occupant_at(from)?;
                let promotes = mover
                    .map(|o| o.kind == PieceKind::Pawn && square.rank() == self.side.promotion_rank())
                    .unwrap_or(false);
                return Ok(if promotes {
                    ClickOutcome::PromotionRequired(attempt)
                } else {
                    ClickOutcome::MoveReady(attempt)
                });
            }
        }

        match snapshot.occupant_at(square)? {
            Some(occupant) if occupant.side == self.side => {
                let destinations = self.rules.legal_destinations(snapshot, square);
                let count = destinations.len();
                self.selection.selected = Some(square);
                self.selection.destinations = destinations;
                self.selection.pending = None;
                Ok(ClickOutcome::Selected {
                    square,
                    destinations: count,
                })
            }
            _ if !self.selection.is_empty() => {
                self.selection.clear();
                Ok(ClickOutcome::Deselected)
            }
            _ => Ok(ClickOutcome::Ignored),
        }
    }

    /// Bind the replacement kind for a pending promotion
    pub fn choose_promotion(&mut self, kind: PieceKind) -> Result<MoveAttempt> {
        let attempt = self
            .selection
            .pending
            .ok_or_else(|| ArcanaError::InvalidTransition("no move is pending".to_string()))?;
        if !kind.is_promotion_choice() {
            return Err(ArcanaError::InvalidPromotion(format!("cannot promote to {}", kind)));
        }
        let promoted = attempt.with_promotion(kind);
        self.selection.pending = Some(promoted);
        Ok(promoted)
    }

    fn pending_attempt(&self) -> Result<MoveAttempt> {
        self.selection
            .pending
            .ok_or_else(|| ArcanaError::InvalidTransition("no move is pending".to_string()))
    }

    /// First half of a manual submission: compose the pending move
    pub fn prepare_pending(&mut self) -> Result<Composition> {
        let attempt = self.pending_attempt()?;
        let snapshot = Self::playable(&self.snapshot, self.outcome, self.side)?;
        let ctx = TurnContext {
            snapshot,
            acting: self.side,
        };
        self.submitter
            .prepare(&attempt, &self.targeting, &ctx, &mut self.feedback)
    }

    /// Second half of a manual submission
    pub fn resolve_ack(&mut self, ack: &Ack) -> Result<SubmissionOutcome> {
        self.submitter
            .resolve(ack, &mut self.targeting, &mut self.selection, &mut self.feedback)
    }

    /// Submit the pending move (plus any ready ability) and await the answer
    pub async fn submit_pending<C: ServerChannel>(
        &mut self,
        channel: &mut C,
    ) -> Result<SubmissionOutcome> {
        let attempt = self.pending_attempt()?;
        self.notice = None;
        let snapshot = Self::playable(&self.snapshot, self.outcome, self.side)?;
        let ctx = TurnContext {
            snapshot,
            acting: self.side,
        };
        self.submitter
            .submit(
                channel,
                &attempt,
                &mut self.targeting,
                &mut self.selection,
                &ctx,
                &mut self.feedback,
            )
            .await
    }

    /// Ask the server for an arcana draw
    pub async fn draw_arcana<C: ServerChannel>(&mut self, channel: &mut C) -> Result<()> {
        Self::playable(&self.snapshot, self.outcome, self.side)?;
        if self.submitter.is_in_flight() {
            return Err(ArcanaError::SubmissionInFlight);
        }
        if self.draw_cooldown > 0 {
            return Err(ArcanaError::InvalidTransition(format!(
                "draw is on cooldown for {} more turns",
                self.draw_cooldown
            )));
        }

        let ack = self.await_ack(channel.draw_arcana()).await?;
        if ack.ok {
            self.logger
                .event(VerbosityLevel::Normal, "arcana", format_args!("draw accepted"));
            Ok(())
        } else {
            let reason = ack.reason().to_string();
            self.notice = Some(reason.clone());
            Err(ArcanaError::Rejected(reason))
        }
    }

    /// Concede; available whenever the game is still going
    pub async fn forfeit<C: ServerChannel>(&mut self, channel: &mut C) -> Result<()> {
        if self.is_over() {
            return Err(ArcanaError::GameOver);
        }
        self.targeting.cancel();
        let ack = self.await_ack(channel.forfeit()).await?;
        if ack.ok {
            self.logger
                .event(VerbosityLevel::Minimal, "game", format_args!("{} forfeits", self.side));
            Ok(())
        } else {
            let reason = ack.reason().to_string();
            self.notice = Some(reason.clone());
            Err(ArcanaError::Rejected(reason))
        }
    }

    async fn await_ack<F>(&mut self, request: F) -> Result<Ack>
    where
        F: std::future::Future<Output = Result<Ack>>,
    {
        let timeout = self.submitter.ack_timeout();
        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                self.notice = Some(TIMEOUT_REASON.to_string());
                Err(ArcanaError::AckTimeout(timeout))
            }
        }
    }

    /// Release the feedback context; the client keeps tracking events
    pub fn dispose(&mut self) {
        self.feedback.dispose();
    }
}
