//! Rate-limited chat with a bounded history.

use std::collections::VecDeque;
use std::time::Duration;

use loto_protocol::ChatMessage;
use tokio::time::Instant;

use crate::ChatError;

/// Local side of the room chat.
///
/// Sends are throttled per client. The throttle is only enforced here:
/// a peer that skips it can still flood, but an honest client never will.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    throttle: Duration,
    capacity: usize,
    history: VecDeque<ChatMessage>,
    last_sent: Option<Instant>,
}

impl ChatRelay {
    pub fn new(throttle: Duration, capacity: usize) -> Self {
        Self {
            throttle,
            capacity: capacity.max(1),
            history: VecDeque::with_capacity(capacity.max(1)),
            last_sent: None,
        }
    }

    /// Accepts a local message, or says why not.
    ///
    /// On success the message is already in the history; the caller only
    /// has to broadcast it. A rejected send does not restart the throttle.
    pub fn send(
        &mut self,
        sender: &str,
        text: &str,
        now: Instant,
        wall_ms: u64,
    ) -> Result<ChatMessage, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::Empty);
        }
        let remaining = self.cooldown(now);
        if !remaining.is_zero() {
            return Err(ChatError::Throttled { remaining });
        }

        let message = ChatMessage {
            id: loto_ticket::short_id(&mut rand::rng(), 9),
            sender_name: sender.to_string(),
            text: text.to_string(),
            timestamp: wall_ms,
        };
        self.push(message.clone());
        self.last_sent = Some(now);
        Ok(message)
    }

    /// Appends a message from a peer. Returns `false` for a duplicate.
    pub fn receive(&mut self, message: ChatMessage) -> bool {
        if self.history.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.push(message);
        true
    }

    fn push(&mut self, message: ChatMessage) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }

    /// Empties the history. The throttle is kept.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Time left before the next send is accepted. Zero when ready.
    pub fn cooldown(&self, now: Instant) -> Duration {
        self.cooldown_ends()
            .map(|end| end.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// When the current cooldown ends, if one was ever started.
    pub fn cooldown_ends(&self) -> Option<Instant> {
        self.last_sent.map(|at| at + self.throttle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> ChatRelay {
        ChatRelay::new(Duration::from_secs(2), 3)
    }

    fn incoming(id: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            sender_name: "binh".into(),
            text: "hi".into(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_send_blank_rejected_as_empty() {
        let mut chat = relay();
        assert_eq!(chat.send("an", "   ", Instant::now(), 0), Err(ChatError::Empty));
        assert!(chat.is_empty());
    }

    #[test]
    fn test_send_within_throttle_reports_remaining() {
        let mut chat = relay();
        let t0 = Instant::now();
        chat.send("an", "một", t0, 0).unwrap();

        let err = chat
            .send("an", "hai", t0 + Duration::from_millis(500), 0)
            .unwrap_err();
        assert_eq!(
            err,
            ChatError::Throttled {
                remaining: Duration::from_millis(1500)
            }
        );
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn test_send_rejected_attempt_does_not_restart_throttle() {
        let mut chat = relay();
        let t0 = Instant::now();
        chat.send("an", "một", t0, 0).unwrap();
        let _ = chat.send("an", "hai", t0 + Duration::from_millis(1900), 0);
        assert!(chat.send("an", "ba", t0 + Duration::from_secs(2), 0).is_ok());
    }

    #[test]
    fn test_send_sets_sender_and_timestamp() {
        let mut chat = relay();
        let msg = chat.send("an", "xin chào", Instant::now(), 1_700).unwrap();
        assert_eq!(msg.sender_name, "an");
        assert_eq!(msg.timestamp, 1_700);
        assert_eq!(msg.id.len(), 9);
    }

    #[test]
    fn test_history_capped_oldest_evicted() {
        let mut chat = relay();
        for id in ["a", "b", "c", "d"] {
            chat.receive(incoming(id));
        }
        let ids: Vec<_> = chat.history().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "d"]);
    }

    #[test]
    fn test_receive_duplicate_id_dropped() {
        let mut chat = relay();
        assert!(chat.receive(incoming("x")));
        assert!(!chat.receive(incoming("x")));
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn test_cooldown_zero_before_first_send() {
        let chat = relay();
        assert_eq!(chat.cooldown(Instant::now()), Duration::ZERO);
        assert_eq!(chat.cooldown_ends(), None);
    }

    #[test]
    fn test_clear_keeps_throttle() {
        let mut chat = relay();
        let t0 = Instant::now();
        chat.send("an", "một", t0, 0).unwrap();
        chat.clear();
        assert!(chat.is_empty());
        assert!(!chat.cooldown(t0).is_zero());
    }
}
