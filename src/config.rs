//! Client configuration
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! empty) file is valid.

use crate::game::feedback::FeedbackConfig;
use crate::game::logger::VerbosityLevel;
use crate::game::submitter::RejectionPolicy;
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long to wait for an acknowledgement before the submission is
    /// treated as unknown
    pub ack_timeout_ms: u64,
    pub rejection_policy: RejectionPolicy,
    pub verbosity: VerbosityLevel,
    pub feedback: FeedbackConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            ack_timeout_ms: 10_000,
            rejection_policy: RejectionPolicy::RetainOnRejection,
            verbosity: VerbosityLevel::Normal,
            feedback: FeedbackConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content).map_err(|e| {
            ArcanaError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ack_timeout_ms == 0 {
            return Err(ArcanaError::Config(
                "ack_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.feedback.validate()
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}
