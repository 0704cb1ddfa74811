//! Inbound server events and event-log loading
//!
//! Events arrive as JSON objects tagged by `type`. An event log is a file
//! with one event per line; blank lines are skipped.

use crate::core::{ArcanaKind, Side, Square};
use crate::game::snapshot::PlacementSnapshot;
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Normal,
    Forfeit,
    Disconnect,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Normal => write!(f, "normal"),
            EndReason::Forfeit => write!(f, "forfeit"),
            EndReason::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// Final result of a game; `winner` is None for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Option<Side>,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Snapshot(PlacementSnapshot),
    GameEnded {
        #[serde(default)]
        winner: Option<Side>,
        reason: EndReason,
    },
    /// The server only fills in `arcana` for the receiving player's own draws
    ArcanaDrawn {
        side: Side,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arcana: Option<ArcanaKind>,
    },
    ArcanaUsed {
        side: Side,
        arcana: ArcanaKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Square>,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Snapshot(_) => "snapshot",
            ServerEvent::GameEnded { .. } => "game_ended",
            ServerEvent::ArcanaDrawn { .. } => "arcana_drawn",
            ServerEvent::ArcanaUsed { .. } => "arcana_used",
        }
    }
}

/// Parse newline-delimited JSON events
pub fn parse_event_log(content: &str) -> Result<Vec<ServerEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                ArcanaError::SerializationError(format!("line {}: {}", index + 1, e))
            })
        })
        .collect()
}

/// Load an event log from disk
pub async fn load_event_log(path: &Path) -> Result<Vec<ServerEvent>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(ArcanaError::IoError)?;

    parse_event_log(&contents).map_err(|e| match e {
        ArcanaError::SerializationError(msg) => ArcanaError::SerializationError(format!(
            "Failed to parse event log '{}': {}",
            path.display(),
            msg
        )),
        other => other,
    })
}
