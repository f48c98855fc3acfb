//! Deferred, round-targeted message delivery

use crate::core::types::Round;
use crate::entity::message::PendingMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mailbox {
    messages: Vec<PendingMessage>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, message: PendingMessage) {
        tracing::debug!(
            sender = %message.sender,
            recipient = %message.recipient,
            deliver_round = message.deliver_round,
            "queued message"
        );
        self.messages.push(message);
    }

    /// Messages due in `round`, grouped by recipient reference in send order
    pub fn deliverable(&self, round: Round) -> BTreeMap<&str, Vec<&PendingMessage>> {
        let mut grouped: BTreeMap<&str, Vec<&PendingMessage>> = BTreeMap::new();
        for message in self.messages.iter().filter(|m| m.deliver_round == round) {
            grouped
                .entry(message.recipient.as_str())
                .or_default()
                .push(message);
        }
        grouped
    }

    /// Drop every message targeting `round`; returns how many were removed
    pub fn purge(&mut self, round: Round) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.deliver_round != round);
        before - self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ActorId;
    use proptest::prelude::*;

    #[test]
    fn test_deliverable_groups_by_recipient() {
        let mut mailbox = Mailbox::new();
        let sender = ActorId::new();
        mailbox.send(PendingMessage::new(sender, "Union", "first", 1));
        mailbox.send(PendingMessage::new(sender, "Mayor", "hello", 1));
        mailbox.send(PendingMessage::new(sender, "Union", "second", 1));
        mailbox.send(PendingMessage::new(sender, "Union", "later", 2));

        let due = mailbox.deliverable(2);
        assert_eq!(due.len(), 2);
        let union: Vec<_> = due["Union"].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(union, vec!["first", "second"]);
        assert_eq!(due["Mayor"].len(), 1);
    }

    #[test]
    fn test_purge_only_touches_target_round() {
        let mut mailbox = Mailbox::new();
        let sender = ActorId::new();
        mailbox.send(PendingMessage::new(sender, "Union", "now", 1));
        mailbox.send(PendingMessage::new(sender, "Union", "later", 2));

        assert_eq!(mailbox.purge(2), 1);
        assert_eq!(mailbox.purge(2), 0);
        assert_eq!(mailbox.len(), 1);
        assert!(mailbox.deliverable(3).contains_key("Union"));
    }

    proptest! {
        #[test]
        fn prop_purge_empties_round(sent in proptest::collection::vec(0u32..6, 0..50), target in 0u32..7) {
            let mut mailbox = Mailbox::new();
            let sender = ActorId::new();
            for round in &sent {
                mailbox.send(PendingMessage::new(sender, "X", "m", *round));
            }
            let expected = sent.iter().filter(|r| **r + 1 == target).count();
            prop_assert_eq!(mailbox.purge(target), expected);
            prop_assert!(mailbox.deliverable(target).is_empty());
            prop_assert_eq!(mailbox.len(), sent.len() - expected);
        }
    }
}
