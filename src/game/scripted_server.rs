//! Scripted server for tests and demos
//!
//! Answers requests from a predetermined script of replies. Once the script
//! is exhausted every request is accepted. Every request is recorded so a
//! test can check exactly what was sent.

use crate::game::channel::{Ack, OutboundRequest, ServerChannel};
use crate::game::submitter::PendingAction;
use crate::{ArcanaError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Reply(Ack),
    /// Reply after a delay
    Delayed(Duration, Ack),
    /// Never reply (connection stalls)
    Stall,
    /// Transport failure
    Disconnect,
}

impl From<Ack> for ScriptStep {
    fn from(ack: Ack) -> Self {
        ScriptStep::Reply(ack)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedServer {
    script: VecDeque<ScriptStep>,
    requests: Vec<OutboundRequest>,
}

impl ScriptedServer {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        ScriptedServer {
            script: script.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    /// Server that accepts everything
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl Into<ScriptStep>) {
        self.script.push_back(step.into());
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> &[OutboundRequest] {
        &self.requests
    }

    /// Submitted actions only
    pub fn actions(&self) -> Vec<&PendingAction> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                OutboundRequest::Action(action) => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    async fn answer(&mut self, request: OutboundRequest) -> Result<Ack> {
        self.requests.push(request);
        match self.script.pop_front() {
            None => Ok(Ack::accepted()),
            Some(ScriptStep::Reply(ack)) => Ok(ack),
            Some(ScriptStep::Delayed(delay, ack)) => {
                tokio::time::sleep(delay).await;
                Ok(ack)
            }
            Some(ScriptStep::Stall) => std::future::pending().await,
            Some(ScriptStep::Disconnect) => {
                Err(ArcanaError::ChannelClosed("scripted disconnect".to_string()))
            }
        }
    }
}

impl ServerChannel for ScriptedServer {
    async fn submit_action(&mut self, action: &PendingAction) -> Result<Ack> {
        self.answer(OutboundRequest::Action(action.clone())).await
    }

    async fn draw_arcana(&mut self) -> Result<Ack> {
        self.answer(OutboundRequest::DrawArcana).await
    }

    async fn forfeit(&mut self) -> Result<Ack> {
        self.answer(OutboundRequest::Forfeit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default_accept() {
        let mut server = ScriptedServer::new([Ack::rejected("cooldown").into()]);
        assert_eq!(server.draw_arcana().await.unwrap(), Ack::rejected("cooldown"));
        assert_eq!(server.draw_arcana().await.unwrap(), Ack::accepted());
        assert_eq!(server.requests().len(), 2);
        assert_eq!(server.remaining(), 0);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut server = ScriptedServer::new([ScriptStep::Disconnect]);
        let err = server.forfeit().await.unwrap_err();
        assert!(matches!(err, ArcanaError::ChannelClosed(_)));
        assert_eq!(server.requests(), &[OutboundRequest::Forfeit]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_never_answers() {
        let mut server = ScriptedServer::new([ScriptStep::Stall]);
        let waited = tokio::time::timeout(Duration::from_secs(30), server.forfeit()).await;
        assert!(waited.is_err());
    }
}
