//! Renderable piece entities with stable integer IDs

use crate::core::{BoardCoord, PieceKind, Side, Square};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple integer ID for piece entities
///
/// IDs are handed out in increasing order and never reused, so an ID
/// identifies one piece for its whole lifetime on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    pub fn new(id: u32) -> Self {
        EntityId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic EntityId generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityIdAllocator {
    next_id: u32,
}

impl EntityIdAllocator {
    pub fn new() -> Self {
        EntityIdAllocator { next_id: 0 }
    }

    /// Generate a new unique EntityId
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Number of IDs handed out so far
    pub fn issued(&self) -> u32 {
        self.next_id
    }
}

/// A piece as the renderer sees it
///
/// Owned by the reconciler. Consumers borrow the current list for one frame
/// and look entities up again by `id` on the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceEntity {
    pub id: EntityId,
    pub kind: PieceKind,
    pub side: Side,
    pub square: Square,
    pub coordinate: BoardCoord,
}

impl PieceEntity {
    pub fn new(id: EntityId, kind: PieceKind, side: Side, square: Square) -> Self {
        PieceEntity {
            id,
            kind,
            side,
            square,
            coordinate: square.to_coordinate(),
        }
    }

    /// Move this entity onto a new authoritative square
    pub fn place(&mut self, square: Square) {
        self.square = square;
        self.coordinate = square.to_coordinate();
    }
}
