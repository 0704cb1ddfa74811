//! Targeting session: ability selection and target binding
//!
//! ```text
//! Idle --select--> AwaitingTarget --bind--> AwaitingParameter --param--> Ready
//!   ^                   |   (target kind none) ------------------------>  |
//!   +------------------ cancel / consume ---------------------------------+
//! ```
//!
//! The session only holds state; it never talks to the server. A failed bind
//! leaves the state untouched and returns the reason for a one-shot hint.

use crate::core::{ArcanaKind, Occupant, ParameterSchema, PieceKind, Side, Square, TargetKind};
use crate::game::snapshot::PlacementSnapshot;
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};

/// Parameters bound to an ability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Square>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<PieceKind>,
}

/// Ability activation carried by a pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcanaInvocation {
    #[serde(rename = "abilityId")]
    pub arcana: ArcanaKind,
    pub params: TargetBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingState {
    Idle,
    AwaitingTarget {
        arcana: ArcanaKind,
    },
    AwaitingParameter {
        arcana: ArcanaKind,
        target: Square,
        schema: ParameterSchema,
    },
    Ready {
        arcana: ArcanaKind,
        binding: TargetBinding,
    },
}

/// Result of a successful bind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// Session is complete
    Ready,
    /// Target bound; a secondary parameter must still be chosen
    AwaitingParameter(ParameterSchema),
}

/// Read-only session state for renderers and UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetingView {
    pub arcana: Option<ArcanaKind>,
    pub required: TargetKind,
    pub bound: Option<TargetBinding>,
    pub complete: bool,
    /// Squares that would pass the predicate right now (empty unless a
    /// target is awaited)
    pub valid_targets: Vec<Square>,
}

#[derive(Debug, Clone)]
pub struct TargetingSession {
    state: TargetingState,
}

impl TargetingSession {
    pub fn new() -> Self {
        TargetingSession {
            state: TargetingState::Idle,
        }
    }

    pub fn state(&self) -> TargetingState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TargetingState::Idle
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, TargetingState::Ready { .. })
    }

    pub fn is_awaiting_target(&self) -> bool {
        matches!(self.state, TargetingState::AwaitingTarget { .. })
    }

    pub fn arcana(&self) -> Option<ArcanaKind> {
        match self.state {
            TargetingState::Idle => None,
            TargetingState::AwaitingTarget { arcana }
            | TargetingState::AwaitingParameter { arcana, .. }
            | TargetingState::Ready { arcana, .. } => Some(arcana),
        }
    }

    pub fn required_target_kind(&self) -> TargetKind {
        self.arcana()
            .map(|a| a.target_kind())
            .unwrap_or(TargetKind::None)
    }

    pub fn bound(&self) -> Option<TargetBinding> {
        match self.state {
            TargetingState::AwaitingParameter { target, .. } => Some(TargetBinding {
                target: Some(target),
                replacement: None,
            }),
            TargetingState::Ready { binding, .. } => Some(binding),
            _ => None,
        }
    }

    /// The invocation this session would produce, if complete
    pub fn invocation(&self) -> Option<ArcanaInvocation> {
        match self.state {
            TargetingState::Ready { arcana, binding } => Some(ArcanaInvocation {
                arcana,
                params: binding,
            }),
            _ => None,
        }
    }

    /// Start targeting an ability, replacing any previous selection
    pub fn select_ability(&mut self, arcana: ArcanaKind) -> TargetKind {
        let required = arcana.target_kind();
        self.state = match required {
            TargetKind::None => TargetingState::Ready {
                arcana,
                binding: TargetBinding::default(),
            },
            _ => TargetingState::AwaitingTarget { arcana },
        };
        required
    }

    /// Try to bind `square` as the ability's target
    pub fn attempt_bind(
        &mut self,
        square: Square,
        snapshot: &PlacementSnapshot,
        acting: Side,
    ) -> Result<BindOutcome> {
        let TargetingState::AwaitingTarget { arcana } = self.state else {
            return Err(ArcanaError::InvalidTransition(
                "no ability is awaiting a target".to_string(),
            ));
        };

        let occupant = snapshot.occupant_at(square)?;
        arcana
            .check_target(occupant.as_ref(), acting)
            .map_err(|reason| ArcanaError::InvalidTarget {
                square,
                reason: reason.to_string(),
            })?;

        match arcana.parameter() {
            Some(schema) => {
                self.state = TargetingState::AwaitingParameter {
                    arcana,
                    target: square,
                    schema,
                };
                Ok(BindOutcome::AwaitingParameter(schema))
            }
            None => {
                self.state = TargetingState::Ready {
                    arcana,
                    binding: TargetBinding {
                        target: Some(square),
                        replacement: None,
                    },
                };
                Ok(BindOutcome::Ready)
            }
        }
    }

    /// Choose the secondary parameter after the target is bound
    pub fn bind_parameter(&mut self, kind: PieceKind) -> Result<()> {
        let TargetingState::AwaitingParameter {
            arcana,
            target,
            schema,
        } = self.state
        else {
            return Err(ArcanaError::InvalidTransition(
                "no ability is awaiting a parameter".to_string(),
            ));
        };

        if !schema.accepts(kind) {
            return Err(ArcanaError::InvalidParameter(format!(
                "{} cannot turn a piece into a {}",
                arcana, kind
            )));
        }

        self.state = TargetingState::Ready {
            arcana,
            binding: TargetBinding {
                target: Some(target),
                replacement: Some(kind),
            },
        };
        Ok(())
    }

    /// Drop any selection; always safe
    pub fn cancel(&mut self) {
        self.state = TargetingState::Idle;
    }

    /// Take the completed invocation and return to Idle
    pub fn consume(&mut self) -> Option<ArcanaInvocation> {
        let invocation = self.invocation();
        self.state = TargetingState::Idle;
        invocation
    }

    /// Squares passing the current predicate for `acting`
    pub fn valid_targets(&self, snapshot: &PlacementSnapshot, acting: Side) -> Result<Vec<Square>> {
        let TargetingState::AwaitingTarget { arcana } = self.state else {
            return Ok(Vec::new());
        };

        let mut board: [Option<Occupant>; 64] = [None; 64];
        for occupant in snapshot.occupants()? {
            board[board_index(occupant.square)] = Some(occupant);
        }

        Ok(Square::all()
            .filter(|&square| {
                arcana
                    .check_target(board[board_index(square)].as_ref(), acting)
                    .is_ok()
            })
            .collect())
    }

    pub fn view(&self, snapshot: &PlacementSnapshot, acting: Side) -> TargetingView {
        TargetingView {
            arcana: self.arcana(),
            required: self.required_target_kind(),
            bound: self.bound(),
            complete: self.is_complete(),
            valid_targets: self.valid_targets(snapshot, acting).unwrap_or_default(),
        }
    }
}

impl Default for TargetingSession {
    fn default() -> Self {
        Self::new()
    }
}

fn board_index(square: Square) -> usize {
    square.rank_from_top() as usize * 8 + square.file() as usize
}
