//! Arcana catalogue: target requirements and parameter schemas
//!
//! Every ability is a closed enum variant. The target kind and secondary
//! parameter of each ability are decided by exhaustive matches, so adding an
//! ability without deciding how it is targeted does not compile.

use crate::core::{Occupant, PieceKind, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One-shot abilities a player may bind to a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcanaKind {
    ShieldPawn,
    PawnRush,
    Sanctuary,
    CursedSquare,
    Execution,
    MindControl,
    Metamorphosis,
    SpectralMarch,
    Necromancy,
    TimeFreeze,
}

/// What an ability must be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    OwnPawn,
    OwnPiece,
    EnemyNonKing,
    AnySquare,
    None,
}

/// Secondary parameter chosen after the target is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSchema {
    /// Replace the target with one of the listed kinds
    ReplacementKind { allowed: &'static [PieceKind] },
}

impl ParameterSchema {
    pub fn accepts(&self, kind: PieceKind) -> bool {
        match self {
            ParameterSchema::ReplacementKind { allowed } => allowed.contains(&kind),
        }
    }
}

const METAMORPHOSIS_KINDS: &[PieceKind] = &[PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

impl ArcanaKind {
    pub const ALL: [ArcanaKind; 10] = [
        ArcanaKind::ShieldPawn,
        ArcanaKind::PawnRush,
        ArcanaKind::Sanctuary,
        ArcanaKind::CursedSquare,
        ArcanaKind::Execution,
        ArcanaKind::MindControl,
        ArcanaKind::Metamorphosis,
        ArcanaKind::SpectralMarch,
        ArcanaKind::Necromancy,
        ArcanaKind::TimeFreeze,
    ];

    pub fn target_kind(&self) -> TargetKind {
        match self {
            ArcanaKind::ShieldPawn | ArcanaKind::PawnRush => TargetKind::OwnPawn,
            ArcanaKind::Sanctuary | ArcanaKind::CursedSquare => TargetKind::AnySquare,
            ArcanaKind::Execution | ArcanaKind::MindControl => TargetKind::EnemyNonKing,
            ArcanaKind::Metamorphosis | ArcanaKind::SpectralMarch => TargetKind::OwnPiece,
            ArcanaKind::Necromancy | ArcanaKind::TimeFreeze => TargetKind::None,
        }
    }

    pub fn parameter(&self) -> Option<ParameterSchema> {
        match self {
            ArcanaKind::Metamorphosis => Some(ParameterSchema::ReplacementKind {
                allowed: METAMORPHOSIS_KINDS,
            }),
            ArcanaKind::ShieldPawn
            | ArcanaKind::PawnRush
            | ArcanaKind::Sanctuary
            | ArcanaKind::CursedSquare
            | ArcanaKind::Execution
            | ArcanaKind::MindControl
            | ArcanaKind::SpectralMarch
            | ArcanaKind::Necromancy
            | ArcanaKind::TimeFreeze => None,
        }
    }

    /// Targeting predicate for this ability
    ///
    /// The target kind's check, plus: a king can never be replaced, so
    /// abilities with a replacement parameter refuse it.
    pub fn check_target(
        &self,
        occupant: Option<&Occupant>,
        acting: Side,
    ) -> std::result::Result<(), &'static str> {
        self.target_kind().check(occupant, acting)?;
        match (self.parameter(), occupant) {
            (Some(ParameterSchema::ReplacementKind { .. }), Some(o)) if o.kind == PieceKind::King => {
                Err("kings cannot be transformed")
            }
            _ => Ok(()),
        }
    }

    /// Wire identifier, e.g. `"shield_pawn"`
    pub fn id(&self) -> &'static str {
        match self {
            ArcanaKind::ShieldPawn => "shield_pawn",
            ArcanaKind::PawnRush => "pawn_rush",
            ArcanaKind::Sanctuary => "sanctuary",
            ArcanaKind::CursedSquare => "cursed_square",
            ArcanaKind::Execution => "execution",
            ArcanaKind::MindControl => "mind_control",
            ArcanaKind::Metamorphosis => "metamorphosis",
            ArcanaKind::SpectralMarch => "spectral_march",
            ArcanaKind::Necromancy => "necromancy",
            ArcanaKind::TimeFreeze => "time_freeze",
        }
    }
}

impl fmt::Display for ArcanaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ArcanaKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        ArcanaKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == needle)
            .ok_or_else(|| format!("unknown arcana '{s}'"))
    }
}

impl TargetKind {
    /// Check the targeting predicate against a square's occupant
    ///
    /// Returns the rejection reason on failure. Kings are never valid
    /// enemy targets.
    pub fn check(&self, occupant: Option<&Occupant>, acting: Side) -> std::result::Result<(), &'static str> {
        match self {
            TargetKind::AnySquare => Ok(()),
            TargetKind::None => Err("ability takes no target"),
            TargetKind::OwnPawn => match occupant {
                None => Err("square is empty"),
                Some(o) if o.side != acting => Err("not your piece"),
                Some(o) if o.kind != PieceKind::Pawn => Err("not a pawn"),
                Some(_) => Ok(()),
            },
            TargetKind::OwnPiece => match occupant {
                None => Err("square is empty"),
                Some(o) if o.side != acting => Err("not your piece"),
                Some(_) => Ok(()),
            },
            TargetKind::EnemyNonKing => match occupant {
                None => Err("square is empty"),
                Some(o) if o.side == acting => Err("not an enemy piece"),
                Some(o) if o.kind == PieceKind::King => Err("kings cannot be targeted"),
                Some(_) => Ok(()),
            },
        }
    }

    pub fn accepts(&self, occupant: Option<&Occupant>, acting: Side) -> bool {
        self.check(occupant, acting).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Square;

    fn occ(kind: PieceKind, side: Side, square: &str) -> Occupant {
        Occupant {
            kind,
            side,
            square: square.parse::<Square>().unwrap(),
        }
    }

    #[test]
    fn test_ids_round_trip() {
        for kind in ArcanaKind::ALL {
            assert_eq!(kind.id().parse::<ArcanaKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.id()));
        }
        assert!("fireball".parse::<ArcanaKind>().is_err());
        assert_eq!("Mind-Control".parse::<ArcanaKind>().unwrap(), ArcanaKind::MindControl);
    }

    #[test]
    fn test_own_pawn_predicate() {
        let pawn = occ(PieceKind::Pawn, Side::White, "e2");
        let knight = occ(PieceKind::Knight, Side::White, "g1");
        let enemy_pawn = occ(PieceKind::Pawn, Side::Black, "e7");

        assert!(TargetKind::OwnPawn.accepts(Some(&pawn), Side::White));
        assert!(!TargetKind::OwnPawn.accepts(Some(&knight), Side::White));
        assert!(!TargetKind::OwnPawn.accepts(Some(&enemy_pawn), Side::White));
        assert!(!TargetKind::OwnPawn.accepts(None, Side::White));
    }

    #[test]
    fn test_enemy_non_king_predicate() {
        let king = occ(PieceKind::King, Side::Black, "e8");
        let rook = occ(PieceKind::Rook, Side::Black, "a8");
        let own = occ(PieceKind::Rook, Side::White, "a1");

        assert_eq!(
            TargetKind::EnemyNonKing.check(Some(&king), Side::White),
            Err("kings cannot be targeted")
        );
        assert!(TargetKind::EnemyNonKing.accepts(Some(&rook), Side::White));
        assert!(!TargetKind::EnemyNonKing.accepts(Some(&own), Side::White));
        assert!(!TargetKind::EnemyNonKing.accepts(None, Side::White));
    }

    #[test]
    fn test_any_square_and_own_piece() {
        assert!(TargetKind::AnySquare.accepts(None, Side::Black));
        let king = occ(PieceKind::King, Side::Black, "e8");
        assert!(TargetKind::OwnPiece.accepts(Some(&king), Side::Black));
        assert!(!TargetKind::OwnPiece.accepts(Some(&king), Side::White));
        assert!(!TargetKind::None.accepts(None, Side::White));
    }

    #[test]
    fn test_metamorphosis_schema() {
        let schema = ArcanaKind::Metamorphosis.parameter().unwrap();
        assert!(schema.accepts(PieceKind::Knight));
        assert!(!schema.accepts(PieceKind::Queen));
        assert!(!schema.accepts(PieceKind::King));
        assert!(ArcanaKind::Execution.parameter().is_none());
    }

    #[test]
    fn test_metamorphosis_refuses_own_king() {
        let king = occ(PieceKind::King, Side::White, "e1");
        let knight = occ(PieceKind::Knight, Side::White, "g1");

        assert_eq!(
            ArcanaKind::Metamorphosis.check_target(Some(&king), Side::White),
            Err("kings cannot be transformed")
        );
        assert!(ArcanaKind::Metamorphosis.check_target(Some(&knight), Side::White).is_ok());
        // Moving the king is still allowed
        assert!(ArcanaKind::SpectralMarch.check_target(Some(&king), Side::White).is_ok());
    }
}
