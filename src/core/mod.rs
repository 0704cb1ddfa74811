//! Core board vocabulary: squares, pieces, entities and the arcana catalogue

pub mod arcana;
pub mod entity;
pub mod piece;
pub mod square;

pub use arcana::{ArcanaKind, ParameterSchema, TargetKind};
pub use entity::{EntityId, EntityIdAllocator, PieceEntity};
pub use piece::{Occupant, PieceKind, Side, SideMap};
pub use square::{to_coordinate, BoardCoord, Square};
