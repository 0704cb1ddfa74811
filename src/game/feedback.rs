//! Local feedback context for optimistic move cues
//!
//! Audio and haptics live outside this crate. The context decides which cue
//! a submission should produce, remembers the cue that is currently
//! optimistic (not yet confirmed by the server), and keeps a queue the host
//! drains to actually play sounds. It is created with `init` and torn down
//! with `dispose`, and is passed to whatever needs it.

use crate::game::logger::{ClientLogger, VerbosityLevel};
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    /// 0.0 to 1.0
    pub volume: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        FeedbackConfig {
            enabled: true,
            volume: 0.8,
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ArcanaError::Config(format!(
                "feedback volume {} out of range 0.0..=1.0",
                self.volume
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCue {
    Move,
    Capture,
}

impl FeedbackCue {
    /// Cue for a move, keyed on whether the destination was occupied before it
    pub fn for_destination(occupied: bool) -> Self {
        if occupied {
            FeedbackCue::Capture
        } else {
            FeedbackCue::Move
        }
    }
}

#[derive(Debug)]
pub struct FeedbackContext {
    config: FeedbackConfig,
    optimistic: Option<FeedbackCue>,
    queued: Vec<(FeedbackCue, f32)>,
    retractions: u32,
    disposed: bool,
    logger: Rc<ClientLogger>,
}

impl FeedbackContext {
    pub fn init(config: FeedbackConfig, logger: Rc<ClientLogger>) -> Self {
        FeedbackContext {
            config,
            optimistic: None,
            queued: Vec::new(),
            retractions: 0,
            disposed: false,
            logger,
        }
    }

    /// Release the context; later cues are ignored
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.optimistic = None;
        self.queued.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn config(&self) -> FeedbackConfig {
        self.config
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, 1.0);
    }

    /// Play a cue ahead of server confirmation
    pub fn play_optimistic(&mut self, cue: FeedbackCue) {
        if self.disposed {
            return;
        }
        self.optimistic = Some(cue);
        if self.config.enabled {
            self.queued.push((cue, self.config.volume));
        }
        self.logger
            .event(VerbosityLevel::Verbose, "feedback", format_args!("optimistic {:?}", cue));
    }

    /// Server confirmed the action; the optimistic cue stands
    pub fn confirm(&mut self) {
        self.optimistic = None;
    }

    /// Server refused the action; clear the optimistic flag
    pub fn retract(&mut self) {
        if self.optimistic.take().is_some() {
            self.retractions += 1;
            self.logger
                .event(VerbosityLevel::Verbose, "feedback", format_args!("optimistic cue retracted"));
        }
    }

    pub fn optimistic(&self) -> Option<FeedbackCue> {
        self.optimistic
    }

    pub fn retractions(&self) -> u32 {
        self.retractions
    }

    /// Hand queued cues (with volume) to the audio layer
    pub fn drain(&mut self) -> Vec<(FeedbackCue, f32)> {
        std::mem::take(&mut self.queued)
    }
}
