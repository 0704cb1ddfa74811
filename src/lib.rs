//! Arcana client core
//!
//! Client-side state reconciliation and action resolution for a two-player
//! chess variant with one-shot abilities ("arcana"). The server is
//! authoritative; this crate turns its snapshots into stable piece entities
//! and turns player input into one atomic action per turn.

pub mod config;
pub mod core;
pub mod error;
pub mod game;

pub use error::{ArcanaError, Result};
