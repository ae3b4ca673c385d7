//! Inter-agent messaging
//!
//! A [`Message`] is the typed envelope agents and the orchestrator exchange;
//! the [`MessageBus`] delivers it synchronously to subscribers.

mod bus;

pub use bus::{MessageBus, MessageHandler, DEFAULT_HISTORY_CAPACITY};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Highest message priority
pub const PRIORITY_HIGHEST: u8 = 1;

/// Lowest message priority
pub const PRIORITY_LOWEST: u8 = 10;

/// Priority used when none is given
pub const DEFAULT_PRIORITY: u8 = 5;

/// Kinds of messages agents can exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Ask an agent to perform a named task
    TaskRequest,
    /// A requested task finished
    TaskComplete,
    /// A requested task failed
    TaskFailed,
    /// Ask an agent for a blackboard value
    DataRequest,
    /// Answer to a data or task request
    DataResponse,
    /// Ask an agent what it can do
    CapabilityQuery,
    /// Answer to a capability query
    CapabilityResponse,
    /// Progress report
    StatusUpdate,
    /// Keep-alive
    Heartbeat,
    /// Orchestrator hands a goal to an agent
    GoalAssigned,
    /// Agent reports the outcome of a goal
    GoalComplete,
    /// Agent asks any capable peer for help
    NeedAssistance,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::TaskRequest => "TASK_REQUEST",
            MessageType::TaskComplete => "TASK_COMPLETE",
            MessageType::TaskFailed => "TASK_FAILED",
            MessageType::DataRequest => "DATA_REQUEST",
            MessageType::DataResponse => "DATA_RESPONSE",
            MessageType::CapabilityQuery => "CAPABILITY_QUERY",
            MessageType::CapabilityResponse => "CAPABILITY_RESPONSE",
            MessageType::StatusUpdate => "STATUS_UPDATE",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::GoalAssigned => "GOAL_ASSIGNED",
            MessageType::GoalComplete => "GOAL_COMPLETE",
            MessageType::NeedAssistance => "NEED_ASSISTANCE",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message exchanged between agents
///
/// A message is handed to [`MessageBus::publish`] by value and is shared
/// read-only with every handler from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier
    pub id: String,

    /// Kind of message
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Agent ID of the sender
    pub sender: String,

    /// Agent ID of the recipient; `None` broadcasts
    pub recipient: Option<String>,

    /// Key-value payload
    pub content: Value,

    /// Creation time
    pub timestamp: DateTime<Local>,

    /// Links a reply to the message it answers
    pub correlation_id: Option<String>,

    /// 1 = highest, 10 = lowest
    pub priority: u8,
}

impl Message {
    /// Create a message with a fresh id and the default priority
    pub fn new(
        message_type: MessageType,
        sender: impl Into<String>,
        recipient: Option<String>,
        content: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type,
            sender: sender.into(),
            recipient,
            content,
            timestamp: Local::now(),
            correlation_id: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Create a directed message
    pub fn directed(
        message_type: MessageType,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: Value,
    ) -> Self {
        Self::new(message_type, sender, Some(recipient.into()), content)
    }

    /// Create a broadcast message
    pub fn broadcast(message_type: MessageType, sender: impl Into<String>, content: Value) -> Self {
        Self::new(message_type, sender, None, content)
    }

    /// Set the priority, clamped into 1..=10
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(PRIORITY_HIGHEST, PRIORITY_LOWEST);
        self
    }

    /// Set the correlation id
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Build a reply addressed back to this message's sender
    pub fn reply(&self, message_type: MessageType, content: Value) -> Message {
        let sender = self
            .recipient
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        Message::directed(message_type, sender, self.sender.clone(), content)
            .with_correlation(self.id.clone())
            .with_priority(self.priority)
    }

    /// Whether the message has no recipient
    pub fn is_broadcast(&self) -> bool {
        self.recipient.is_none()
    }

    /// Look up a payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    /// Look up a string payload field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }

    /// Look up a boolean payload field
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.content.get(key).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_message_defaults() {
        let msg = Message::broadcast(MessageType::Heartbeat, "parser_agent", json!({}));
        assert!(msg.is_broadcast());
        assert_eq!(msg.priority, DEFAULT_PRIORITY);
        assert!(msg.correlation_id.is_none());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::broadcast(MessageType::Heartbeat, "a", json!({}));
        let b = Message::broadcast(MessageType::Heartbeat, "a", json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_priority_is_clamped() {
        let msg = Message::broadcast(MessageType::Heartbeat, "a", json!({})).with_priority(0);
        assert_eq!(msg.priority, PRIORITY_HIGHEST);
        let msg = msg.with_priority(42);
        assert_eq!(msg.priority, PRIORITY_LOWEST);
    }

    #[test]
    fn test_reply_links_back() {
        let request = Message::directed(
            MessageType::DataRequest,
            "builder_agent",
            "parser_agent",
            json!({"data_key": "product_data"}),
        )
        .with_priority(2);

        let reply = request.reply(MessageType::DataResponse, json!({"data": null}));
        assert_eq!(reply.sender, "parser_agent");
        assert_eq!(reply.recipient.as_deref(), Some("builder_agent"));
        assert_eq!(reply.correlation_id.as_deref(), Some(request.id.as_str()));
        assert_eq!(reply.priority, 2);
    }

    #[test]
    fn test_reply_to_broadcast_uses_unknown_sender() {
        let request = Message::broadcast(MessageType::CapabilityQuery, "orchestrator", json!({}));
        let reply = request.reply(MessageType::CapabilityResponse, json!({}));
        assert_eq!(reply.sender, "unknown");
    }

    #[test]
    fn test_payload_accessors() {
        let msg = Message::broadcast(
            MessageType::GoalComplete,
            "a",
            json!({"goal_id": "g1", "success": true}),
        );
        assert_eq!(msg.get_str("goal_id"), Some("g1"));
        assert_eq!(msg.get_bool("success"), Some(true));
        assert!(msg.get("missing").is_none());
    }

    #[test]
    fn test_message_type_serializes_screaming_case() {
        let encoded = serde_json::to_string(&MessageType::NeedAssistance).unwrap();
        assert_eq!(encoded, "\"NEED_ASSISTANCE\"");
        assert_eq!(MessageType::GoalAssigned.to_string(), "GOAL_ASSIGNED");
    }
}
