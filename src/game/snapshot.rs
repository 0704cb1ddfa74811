//! Authoritative placement snapshots and the placement parser
//!
//! A snapshot is a full description of the board at a turn boundary, pushed
//! by the server. The client never mutates one; it parses the placement into
//! occupants and reads the arcana bookkeeping.

use crate::core::{ArcanaKind, Occupant, PieceKind, Side, SideMap, Square};
use crate::{ArcanaError, Result};
use nom::{
    branch::alt,
    character::complete::{char, one_of},
    combinator::{all_consuming, map, map_opt},
    multi::{many1, separated_list1},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether the game is still being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Ongoing,
    Ended,
}

/// The move that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub from: Square,
    pub to: Square,
    #[serde(default)]
    pub captured: bool,
}

/// Authoritative game state at a turn boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSnapshot {
    /// FEN placement field (a full FEN string is accepted; only the first
    /// field is read)
    pub placement: String,

    /// Side to move
    pub turn: Side,

    #[serde(default)]
    pub status: GameStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<LastMove>,

    /// Set once the first capture has happened; arcana are usable afterwards
    #[serde(default)]
    pub ascended: bool,

    /// Arcana each side holds
    #[serde(default)]
    pub arcana: SideMap<Vec<ArcanaKind>>,

    /// Arcana each side has already spent
    #[serde(default)]
    pub used_arcana: SideMap<Vec<ArcanaKind>>,

    /// Named persistent effects (e.g. "wards", "curses") and their squares
    #[serde(default)]
    pub effects: BTreeMap<String, Vec<Square>>,
}

/// Standard starting placement
pub const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

impl PlacementSnapshot {
    /// Snapshot with the given placement and default bookkeeping
    pub fn new(placement: impl Into<String>, turn: Side) -> Self {
        PlacementSnapshot {
            placement: placement.into(),
            turn,
            status: GameStatus::Ongoing,
            last_move: None,
            ascended: false,
            arcana: SideMap::default(),
            used_arcana: SideMap::default(),
            effects: BTreeMap::new(),
        }
    }

    pub fn starting_position() -> Self {
        Self::new(START_PLACEMENT, Side::White)
    }

    /// Parse the placement into occupants in board order
    pub fn occupants(&self) -> Result<Vec<Occupant>> {
        parse_placement(&self.placement)
    }

    /// Occupant of a single square, if the placement parses and it is occupied
    pub fn occupant_at(&self, square: Square) -> Result<Option<Occupant>> {
        Ok(self.occupants()?.into_iter().find(|o| o.square == square))
    }

    pub fn has_arcana(&self, side: Side, arcana: ArcanaKind) -> bool {
        self.arcana.get(side).contains(&arcana)
    }

    pub fn has_used(&self, side: Side, arcana: ArcanaKind) -> bool {
        self.used_arcana.get(side).contains(&arcana)
    }

    /// Squares under a named persistent effect
    pub fn effect_squares(&self, name: &str) -> &[Square] {
        self.effects.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_ended(&self) -> bool {
        self.status == GameStatus::Ended
    }
}

enum RankToken {
    Piece(PieceKind, Side),
    Gap(u8),
}

fn rank_token(input: &str) -> IResult<&str, RankToken> {
    alt((
        map_opt(one_of("KQRBNPkqrbnp"), |c| {
            PieceKind::from_fen_char(c).map(|(kind, side)| RankToken::Piece(kind, side))
        }),
        map(one_of("12345678"), |c: char| RankToken::Gap(c as u8 - b'0')),
    ))(input)
}

fn placement_ranks(input: &str) -> IResult<&str, Vec<Vec<RankToken>>> {
    all_consuming(separated_list1(char('/'), many1(rank_token)))(input)
}

/// Parse a FEN placement field into occupants, rank 8 first, file a first
///
/// Anything after the first whitespace (the rest of a full FEN) is ignored.
pub fn parse_placement(placement: &str) -> Result<Vec<Occupant>> {
    let field = placement.split_whitespace().next().unwrap_or("");
    let (_, ranks) = placement_ranks(field)
        .map_err(|e| ArcanaError::ParseError(format!("Invalid placement '{}': {}", field, e)))?;

    if ranks.len() != 8 {
        return Err(ArcanaError::ParseError(format!(
            "Placement has {} ranks, expected 8",
            ranks.len()
        )));
    }

    let mut occupants = Vec::with_capacity(32);
    for (row, tokens) in ranks.iter().enumerate() {
        let mut file: u8 = 0;
        for token in tokens {
            match token {
                RankToken::Gap(n) => file = file.saturating_add(*n),
                RankToken::Piece(kind, side) => {
                    if file >= 8 {
                        return Err(ArcanaError::ParseError(format!(
                            "Rank {} overflows the board",
                            8 - row
                        )));
                    }
                    occupants.push(Occupant {
                        kind: *kind,
                        side: *side,
                        square: Square::from_indices(file, row as u8),
                    });
                    file += 1;
                }
            }
        }
        if file != 8 {
            return Err(ArcanaError::ParseError(format!(
                "Rank {} covers {} files, expected 8",
                8 - row,
                file
            )));
        }
    }

    Ok(occupants)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_starting_position() {
        let occupants = parse_placement(START_PLACEMENT).unwrap();
        assert_eq!(occupants.len(), 32);

        assert_eq!(occupants[0].square, sq("a8"));
        assert_eq!(occupants[0].kind, PieceKind::Rook);
        assert_eq!(occupants[0].side, Side::Black);

        let white_king = occupants
            .iter()
            .find(|o| o.kind == PieceKind::King && o.side == Side::White)
            .unwrap();
        assert_eq!(white_king.square, sq("e1"));
    }

    #[test]
    fn test_full_fen_uses_first_field() {
        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        let occupants = parse_placement(fen).unwrap();
        assert_eq!(occupants.len(), 2);
        assert_eq!(occupants[0].square, sq("e8"));
        assert_eq!(occupants[1].square, sq("e1"));
    }

    #[test]
    fn test_rejects_malformed_placements() {
        assert!(parse_placement("").is_err());
        assert!(parse_placement("8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("8/8/8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("9/8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("7/8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("8p/8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("x7/8/8/8/8/8/8/8").is_err());
        assert!(parse_placement("8//8/8/8/8/8/8").is_err());
    }

    #[test]
    fn test_snapshot_json_defaults() {
        let json = r#"{"placement":"4k3/8/8/8/8/8/8/4K3","turn":"black"}"#;
        let snapshot: PlacementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.turn, Side::Black);
        assert_eq!(snapshot.status, GameStatus::Ongoing);
        assert!(!snapshot.ascended);
        assert!(snapshot.arcana.white.is_empty());
        assert!(snapshot.effect_squares("wards").is_empty());
    }

    #[test]
    fn test_snapshot_arcana_and_effects() {
        let json = r#"{
            "placement": "4k3/8/8/8/8/8/8/4K3",
            "turn": "white",
            "ascended": true,
            "last_move": {"from": "e2", "to": "e4"},
            "arcana": {"white": ["execution", "sanctuary"], "black": ["necromancy"]},
            "used_arcana": {"white": ["sanctuary"]},
            "effects": {"wards": ["e4", "d4"]}
        }"#;
        let snapshot: PlacementSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.has_arcana(Side::White, ArcanaKind::Execution));
        assert!(snapshot.has_used(Side::White, ArcanaKind::Sanctuary));
        assert!(!snapshot.has_used(Side::Black, ArcanaKind::Necromancy));
        assert_eq!(snapshot.effect_squares("wards"), &[sq("e4"), sq("d4")]);
        assert!(!snapshot.last_move.unwrap().captured);
    }

    #[test]
    fn test_occupant_at() {
        let snapshot = PlacementSnapshot::starting_position();
        let d1 = snapshot.occupant_at(sq("d1")).unwrap().unwrap();
        assert_eq!(d1.kind, PieceKind::Queen);
        assert!(snapshot.occupant_at(sq("e4")).unwrap().is_none());
    }
}
