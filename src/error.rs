//! Error types for the Arcana client core

use crate::core::{ArcanaKind, Square};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArcanaError {
    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Illegal move: {from} -> {to}")]
    IllegalMove { from: Square, to: Square },

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Game is over")]
    GameOver,

    #[error("Promotion required for {from} -> {to}")]
    PromotionRequired { from: Square, to: Square },

    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),

    #[error("Arcana unavailable: {arcana} ({reason})")]
    ArcanaUnavailable { arcana: ArcanaKind, reason: String },

    #[error("Invalid target {square}: {reason}")]
    InvalidTarget { square: Square, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid targeting transition: {0}")]
    InvalidTransition(String),

    #[error("A submission is already awaiting acknowledgement")]
    SubmissionInFlight,

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("No acknowledgement within {0:?}")]
    AckTimeout(Duration),

    #[error("Server channel closed: {0}")]
    ChannelClosed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ArcanaError {
    fn from(e: serde_json::Error) -> Self {
        ArcanaError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ArcanaError>;
