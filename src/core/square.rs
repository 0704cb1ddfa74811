//! Board squares and the board coordinate model
//!
//! Squares are plain value types over the 8x8 grid. The coordinate model maps
//! a square to a board-relative (x, z) position centred on the origin, which
//! is the frame the renderer animates in and the frame the reconciler
//! measures distances in.

use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A square on the 8x8 board
///
/// `file` is 0 for the a-file, `rank` is 0 for rank 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

/// Board-relative render position of a square
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardCoord {
    pub x: f32,
    pub z: f32,
}

impl BoardCoord {
    /// Squared Euclidean distance to another coordinate
    #[inline]
    pub fn distance_sq(&self, other: &BoardCoord) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

impl Square {
    /// Create a square from 0-based file and rank, or None if off the board
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Square { file, rank })
        } else {
            None
        }
    }

    /// Build a square from a file index and a rank counted from the top edge
    ///
    /// `rank_from_top` 0 is rank 8. Callers pass indices produced by
    /// iterating the board, so both are always in `0..8`.
    pub fn from_indices(file: u8, rank_from_top: u8) -> Self {
        debug_assert!(file < 8 && rank_from_top < 8);
        Square {
            file: file & 7,
            rank: 7 - (rank_from_top & 7),
        }
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Rank index counted from the top edge (rank 8 is 0)
    pub fn rank_from_top(&self) -> u8 {
        7 - self.rank
    }

    /// File letter, 'a' through 'h'
    pub fn file_char(&self) -> char {
        (b'a' + self.file) as char
    }

    /// Render coordinate of this square's centre
    pub fn to_coordinate(&self) -> BoardCoord {
        BoardCoord {
            x: self.file as f32 - 3.5,
            z: self.rank_from_top() as f32 - 3.5,
        }
    }

    /// Iterate all 64 squares in board order (rank 8 to 1, file a to h)
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |file| Square::from_indices(file, row)))
    }
}

/// Free-function form of [`Square::to_coordinate`]
pub fn to_coordinate(square: Square) -> BoardCoord {
    square.to_coordinate()
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = ArcanaError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 2 {
            return Err(ArcanaError::InvalidSquare(s.to_string()));
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ArcanaError::InvalidSquare(s.to_string()))
    }
}

impl TryFrom<String> for Square {
    type Error = ArcanaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}
