//! Publish/subscribe message bus
//!
//! Delivery is synchronous: `publish` invokes every matching handler inline
//! before it returns. Handlers may publish again from inside a delivery; the
//! bus never holds one of its own locks while a handler runs.
//!
//! A broadcast (no recipient) reaches every broadcast subscriber and every
//! directed subscriber. A component subscribed both ways therefore sees a
//! broadcast once per subscription.

use super::{Message, MessageType};
use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Default number of messages kept in history
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Callback invoked for each delivered message
pub type MessageHandler = Arc<dyn Fn(&Message) -> Result<()> + Send + Sync>;

/// Subscriber lists, in registration order
#[derive(Default)]
struct Subscribers {
    directed: Vec<(String, Vec<MessageHandler>)>,
    broadcast: Vec<MessageHandler>,
}

impl Subscribers {
    fn handlers_for(&self, agent_id: &str) -> Option<&Vec<MessageHandler>> {
        self.directed
            .iter()
            .find(|(id, _)| id == agent_id)
            .map(|(_, handlers)| handlers)
    }
}

/// Central message bus for agent communication
pub struct MessageBus {
    subscribers: RwLock<Subscribers>,
    history: Mutex<VecDeque<Arc<Message>>>,
    capacity: usize,
}

impl MessageBus {
    /// Create a bus keeping at most `capacity` messages of history
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            subscribers: RwLock::new(Subscribers::default()),
            history: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Register a handler for messages directed at `agent_id`
    ///
    /// Several handlers may share one id; all of them are invoked.
    pub fn subscribe(&self, agent_id: impl Into<String>, handler: MessageHandler) {
        let agent_id = agent_id.into();
        let mut subs = self.subscribers.write();
        match subs.directed.iter_mut().find(|(id, _)| *id == agent_id) {
            Some((_, handlers)) => handlers.push(handler),
            None => subs.directed.push((agent_id.clone(), vec![handler])),
        }
        tracing::debug!(agent = %agent_id, "Bus: subscribed");
    }

    /// Register a handler for every broadcast message
    pub fn subscribe_broadcast(&self, handler: MessageHandler) {
        self.subscribers.write().broadcast.push(handler);
    }

    /// Remove every handler registered for `agent_id`
    pub fn unsubscribe(&self, agent_id: &str) {
        self.subscribers
            .write()
            .directed
            .retain(|(id, _)| id != agent_id);
        tracing::debug!(agent = %agent_id, "Bus: unsubscribed");
    }

    /// Publish a message to its recipient, or to everyone when it has none
    pub fn publish(&self, message: Message) {
        let message = Arc::new(message);

        {
            let mut history = self.history.lock();
            history.push_back(Arc::clone(&message));
            while history.len() > self.capacity {
                history.pop_front();
            }
        }

        // Snapshot handlers so none of them runs under the subscriber lock
        let handlers: Vec<MessageHandler> = {
            let subs = self.subscribers.read();
            match &message.recipient {
                None => subs
                    .broadcast
                    .iter()
                    .chain(subs.directed.iter().flat_map(|(_, handlers)| handlers.iter()))
                    .cloned()
                    .collect(),
                Some(recipient) => subs.handlers_for(recipient).cloned().unwrap_or_default(),
            }
        };

        tracing::debug!(
            kind = %message.message_type,
            from = %message.sender,
            to = message.recipient.as_deref().unwrap_or("broadcast"),
            handlers = handlers.len(),
            "Bus: publish"
        );

        for handler in &handlers {
            deliver(handler, &message);
        }
    }

    /// Filtered history, oldest first, limited to the last `limit` matches
    pub fn get_history(
        &self,
        sender: Option<&str>,
        recipient: Option<&str>,
        message_type: Option<MessageType>,
        limit: usize,
    ) -> Vec<Arc<Message>> {
        let history = self.history.lock();
        let matching: Vec<Arc<Message>> = history
            .iter()
            .filter(|m| sender.map_or(true, |s| m.sender == s))
            .filter(|m| recipient.map_or(true, |r| m.recipient.as_deref() == Some(r)))
            .filter(|m| message_type.map_or(true, |t| m.message_type == t))
            .cloned()
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    /// Number of messages currently held in history
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// History capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of handlers registered for `agent_id`
    pub fn subscriber_count(&self, agent_id: &str) -> usize {
        self.subscribers
            .read()
            .handlers_for(agent_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Invoke one handler, isolating its failure from the other handlers
fn deliver(handler: &MessageHandler, message: &Message) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(
                kind = %message.message_type,
                id = %message.id,
                "Bus handler error: {}",
                e
            );
        }
        Err(_) => {
            tracing::error!(kind = %message.message_type, id = %message.id, "Bus handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KasparroError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, MessageHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler: MessageHandler = Arc::new(move |_msg: &Message| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (count, handler)
    }

    fn heartbeat(sender: &str, recipient: Option<&str>) -> Message {
        Message::new(
            MessageType::Heartbeat,
            sender,
            recipient.map(str::to_string),
            json!({}),
        )
    }

    #[test]
    fn test_directed_delivery_only_reaches_recipient() {
        let bus = MessageBus::default();
        let (a_count, a) = counter();
        let (b_count, b) = counter();
        let (bc_count, bc) = counter();
        bus.subscribe("a", a);
        bus.subscribe("b", b);
        bus.subscribe_broadcast(bc);

        bus.publish(heartbeat("x", Some("a")));

        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert_eq!(b_count.load(Ordering::SeqCst), 0);
        assert_eq!(bc_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_broadcast_reaches_everyone_once() {
        let bus = MessageBus::default();
        let (bc_count, bc) = counter();
        bus.subscribe_broadcast(bc);
        let (a_count, a) = counter();
        bus.subscribe("a", a);
        let (b1_count, b1) = counter();
        let (b2_count, b2) = counter();
        bus.subscribe("b", b1);
        bus.subscribe("b", b2);

        bus.publish(heartbeat("x", None));

        for count in [&bc_count, &a_count, &b1_count, &b2_count] {
            assert_eq!(count.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_unsubscribe_removes_all_handlers() {
        let bus = MessageBus::default();
        let (count, handler) = counter();
        bus.subscribe("a", Arc::clone(&handler));
        bus.subscribe("a", handler);
        assert_eq!(bus.subscriber_count("a"), 2);

        bus.unsubscribe("a");
        bus.publish(heartbeat("x", Some("a")));
        bus.publish(heartbeat("x", None));

        assert_eq!(bus.subscriber_count("a"), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let bus = MessageBus::new(3);
        for i in 0..5 {
            bus.publish(heartbeat(&format!("s{}", i), None));
        }

        let history = bus.get_history(None, None, None, 100);
        let senders: Vec<&str> = history.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, vec!["s2", "s3", "s4"]);
    }

    #[test]
    fn test_history_filter_and_limit() {
        let bus = MessageBus::default();
        bus.publish(heartbeat("a", Some("orchestrator")));
        bus.publish(Message::directed(
            MessageType::GoalComplete,
            "a",
            "orchestrator",
            json!({"n": 1}),
        ));
        bus.publish(heartbeat("b", Some("orchestrator")));
        bus.publish(Message::directed(
            MessageType::GoalComplete,
            "a",
            "orchestrator",
            json!({"n": 2}),
        ));

        let from_a = bus.get_history(Some("a"), None, None, 100);
        assert_eq!(from_a.len(), 3);

        let completes =
            bus.get_history(None, Some("orchestrator"), Some(MessageType::GoalComplete), 1);
        assert_eq!(completes.len(), 1);
        assert_eq!(completes[0].content["n"], 2);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let bus = MessageBus::default();
        bus.subscribe(
            "a",
            Arc::new(|_msg: &Message| -> Result<()> { Err(KasparroError::agent("boom")) }),
        );
        bus.subscribe(
            "a",
            Arc::new(|_msg: &Message| -> Result<()> { panic!("handler panic") }),
        );
        let (count, handler) = counter();
        bus.subscribe("a", handler);

        bus.publish(heartbeat("x", Some("a")));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_publish_reentrantly() {
        let bus = Arc::new(MessageBus::default());
        let (count, handler) = counter();
        bus.subscribe("b", handler);

        let inner = Arc::downgrade(&bus);
        bus.subscribe(
            "a",
            Arc::new(move |msg: &Message| -> Result<()> {
                if let Some(bus) = inner.upgrade() {
                    bus.publish(msg.reply(MessageType::Heartbeat, json!({})));
                    bus.publish(heartbeat("a", Some("b")));
                }
                Ok(())
            }),
        );

        bus.publish(heartbeat("x", Some("a")));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.history_len(), 3);
    }
}
