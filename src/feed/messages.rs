//! Change Feed Message Types
//!
//! Change events published by the store, the event mask used to filter
//! them, and the websocket messages exchanged with browser clients.

use serde::{Deserialize, Serialize};

use crate::store::Table;

/// Kind of row change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn bit(self) -> u8 {
        match self {
            ChangeKind::Insert => 0b001,
            ChangeKind::Update => 0b010,
            ChangeKind::Delete => 0b100,
        }
    }
}

/// Set of change kinds a subscriber wants to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u8);

impl EventMask {
    /// Every change kind (`*`)
    pub const ALL: EventMask = EventMask(0b111);

    pub fn only(kind: ChangeKind) -> Self {
        EventMask(kind.bit())
    }

    pub fn with(self, kind: ChangeKind) -> Self {
        EventMask(self.0 | kind.bit())
    }

    pub fn matches(&self, kind: ChangeKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl Default for EventMask {
    fn default() -> Self {
        EventMask::ALL
    }
}

/// A row change on a watched table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// The row after the change, if the producer had it
    pub new: Option<serde_json::Value>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row: &impl Serialize) -> Self {
        let new = match serde_json::to_value(row) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Change event row not serializable");
                None
            }
        };
        Self { table, kind, new }
    }

    /// Event without a row payload
    pub fn bare(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            new: None,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving changes for tables
    Subscribe {
        /// Table names, e.g. "investment_batches"
        tables: Vec<String>,
    },
    /// Stop receiving changes for tables
    Unsubscribe { tables: Vec<String> },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { connection_id: String },
    /// Subscription confirmed
    Subscribed { tables: Vec<Table> },
    /// Unsubscription confirmed
    Unsubscribed { tables: Vec<Table> },
    /// A watched table changed
    Change {
        table: Table,
        kind: ChangeKind,
        new: Option<serde_json::Value>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
}

impl From<ChangeEvent> for ServerMessage {
    fn from(event: ChangeEvent) -> Self {
        ServerMessage::Change {
            table: event.table,
            kind: event.kind,
            new: event.new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_mask() {
        assert!(EventMask::ALL.matches(ChangeKind::Insert));
        assert!(EventMask::ALL.matches(ChangeKind::Delete));

        let mask = EventMask::only(ChangeKind::Update);
        assert!(mask.matches(ChangeKind::Update));
        assert!(!mask.matches(ChangeKind::Insert));

        let mask = mask.with(ChangeKind::Insert);
        assert!(mask.matches(ChangeKind::Insert));
        assert!(!mask.matches(ChangeKind::Delete));
    }

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "tables": ["documents", "investment_batches"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { tables } => {
                assert_eq!(tables, vec!["documents", "investment_batches"]);
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_server_message_serialize_change() {
        let event = ChangeEvent::new(
            Table::Documents,
            ChangeKind::Update,
            &serde_json::json!({"id": 4, "display_order": 1}),
        );
        let json = serde_json::to_string(&ServerMessage::from(event)).unwrap();
        assert!(json.contains("\"type\":\"change\""));
        assert!(json.contains("\"table\":\"documents\""));
        assert!(json.contains("\"kind\":\"update\""));
        assert!(json.contains("\"display_order\":1"));
    }

    #[test]
    fn test_bare_event_has_null_row() {
        let event = ChangeEvent::bare(Table::InvestmentDetails, ChangeKind::Delete);
        let json = serde_json::to_string(&ServerMessage::from(event)).unwrap();
        assert!(json.contains("\"new\":null"));
    }
}
