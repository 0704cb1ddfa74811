//! Outbound requests to the authoritative server
//!
//! The core only sees a request/acknowledgement interface. `MpscChannel`
//! adapts it to a tokio task that owns the real connection: each request is
//! queued with a oneshot reply slot the network task fills in.

use crate::game::submitter::PendingAction;
use crate::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Server acknowledgement for any request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn accepted() -> Self {
        Ack { ok: true, error: None }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Ack {
            ok: false,
            error: Some(reason.into()),
        }
    }

    /// Rejection reason, with a placeholder when the server gave none
    pub fn reason(&self) -> &str {
        self.error.as_deref().unwrap_or("rejected by server")
    }
}

/// Request/acknowledgement interface to the server
///
/// Every call resolves to exactly one acknowledgement, or to an error if the
/// transport fails. Callers bound the wait themselves.
#[allow(async_fn_in_trait)]
pub trait ServerChannel {
    /// Submit a move with an optional arcana activation
    async fn submit_action(&mut self, action: &PendingAction) -> Result<Ack>;

    /// Ask to draw an arcana
    async fn draw_arcana(&mut self) -> Result<Ack>;

    /// Concede the game
    async fn forfeit(&mut self) -> Result<Ack>;
}

/// Request as queued for the network task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundRequest {
    Action(PendingAction),
    DrawArcana,
    Forfeit,
}

/// Queued request plus its reply slot
#[derive(Debug)]
pub struct Outbound {
    pub request: OutboundRequest,
    pub reply: oneshot::Sender<Ack>,
}

/// `ServerChannel` backed by a tokio mpsc queue
#[derive(Debug, Clone)]
pub struct MpscChannel {
    tx: mpsc::Sender<Outbound>,
}

impl MpscChannel {
    /// Create the channel and the receiver the network task reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (MpscChannel { tx }, rx)
    }

    async fn send(&self, request: OutboundRequest) -> Result<Ack> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Outbound { request, reply })
            .await
            .map_err(|_| ArcanaError::ChannelClosed("request queue closed".to_string()))?;
        response
            .await
            .map_err(|_| ArcanaError::ChannelClosed("reply dropped before acknowledgement".to_string()))
    }
}

impl ServerChannel for MpscChannel {
    async fn submit_action(&mut self, action: &PendingAction) -> Result<Ack> {
        self.send(OutboundRequest::Action(action.clone())).await
    }

    async fn draw_arcana(&mut self) -> Result<Ack> {
        self.send(OutboundRequest::DrawArcana).await
    }

    async fn forfeit(&mut self) -> Result<Ack> {
        self.send(OutboundRequest::Forfeit).await
    }
}
