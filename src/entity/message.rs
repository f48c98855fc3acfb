//! Inter-actor messages

use crate::core::types::{ActorId, Round};
use serde::{Deserialize, Serialize};

/// A message waiting in the mailbox for its delivery round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub sender: ActorId,
    /// Actor id or identifier as named by the sender; resolved at delivery
    pub recipient: String,
    pub content: String,
    pub sent_round: Round,
    pub deliver_round: Round,
}

impl PendingMessage {
    /// Messages are always delivered the round after they are sent
    pub fn new(
        sender: ActorId,
        recipient: impl Into<String>,
        content: impl Into<String>,
        sent_round: Round,
    ) -> Self {
        Self {
            sender,
            recipient: recipient.into(),
            content: content.into(),
            sent_round,
            deliver_round: sent_round + 1,
        }
    }
}

/// A message as it appears in the recipient's round state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub from_actor_id: ActorId,
    pub from_actor_identifier: String,
    pub content: String,
    pub sent_round: Round,
}
