//! Seam to the local chess rules library
//!
//! Legality is not computed here. The client asks a `RulesOracle` for the
//! legal destinations of a selected square and only ever builds moves from
//! that answer.

use crate::core::Square;
use crate::game::snapshot::PlacementSnapshot;
use crate::{ArcanaError, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::str::FromStr;

pub trait RulesOracle {
    /// Legal destinations for the piece on `from`, empty if none
    fn legal_destinations(&self, snapshot: &PlacementSnapshot, from: Square) -> Vec<Square>;

    fn is_legal(&self, snapshot: &PlacementSnapshot, from: Square, to: Square) -> bool {
        self.legal_destinations(snapshot, from).contains(&to)
    }
}

impl<F> RulesOracle for F
where
    F: Fn(&PlacementSnapshot, Square) -> Vec<Square>,
{
    fn legal_destinations(&self, snapshot: &PlacementSnapshot, from: Square) -> Vec<Square> {
        self(snapshot, from)
    }
}

/// Fixed table of legal moves, independent of the snapshot
///
/// Parsed from whitespace-separated coordinate moves (`"e2e4 g1f3"`).
/// Useful when the host has already computed legality for the position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegalMoveTable {
    moves: FxHashMap<Square, SmallVec<[Square; 8]>>,
}

impl LegalMoveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Square, to: Square) {
        let destinations = self.moves.entry(from).or_default();
        if !destinations.contains(&to) {
            destinations.push(to);
        }
    }

    pub fn len(&self) -> usize {
        self.moves.values().map(|d| d.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl FromStr for LegalMoveTable {
    type Err = ArcanaError;

    fn from_str(s: &str) -> Result<Self> {
        let mut table = LegalMoveTable::new();
        for token in s.split_whitespace() {
            if token.len() != 4 || !token.is_ascii() {
                return Err(ArcanaError::ParseError(format!(
                    "expected a move like e2e4, got '{}'",
                    token
                )));
            }
            let from: Square = token[..2].parse()?;
            let to: Square = token[2..].parse()?;
            table.insert(from, to);
        }
        Ok(table)
    }
}

impl RulesOracle for LegalMoveTable {
    fn legal_destinations(&self, _snapshot: &PlacementSnapshot, from: Square) -> Vec<Square> {
        self.moves
            .get(&from)
            .map(|d| d.to_vec())
            .unwrap_or_default()
    }
}
