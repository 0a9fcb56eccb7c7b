//! WebSocket Handler
//!
//! Exposes the change feed to browsers. Each table a connection subscribes
//! to gets a forwarding task that owns the feed [`Subscription`]; aborting
//! the task drops the subscription.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::hub::{ChangeFeed, FeedError};
use super::messages::{ClientMessage, EventMask, ServerMessage};
use crate::api::AppState;
use crate::store::Table;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let feed = Arc::clone(&state.feed);
    ws.on_upgrade(move |socket| handle_socket(socket, feed))
}

/// Per-connection forwarding tasks, keyed by table
struct Forwarders {
    connection_id: String,
    tasks: HashMap<Table, JoinHandle<()>>,
}

impl Forwarders {
    fn subscribe(
        &mut self,
        feed: &ChangeFeed,
        table: Table,
        out: &mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), FeedError> {
        if self.tasks.contains_key(&table) {
            return Ok(());
        }

        let mut subscription = feed.subscribe(table, EventMask::ALL)?;
        let out = out.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if out.send(ServerMessage::from(event)).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(table, task);
        Ok(())
    }

    fn unsubscribe(&mut self, table: Table) -> bool {
        match self.tasks.remove(&table) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Forwarders {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
        tracing::debug!(connection_id = %self.connection_id, "Released feed subscriptions");
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, feed: Arc<ChangeFeed>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = Uuid::new_v4().to_string();
    tracing::info!(connection_id = %connection_id, "WebSocket connected");

    let _ = tx.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });

    let conn_id_for_send = connection_id.clone();

    // Forward queued messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    let conn_id_for_recv = connection_id.clone();

    let mut recv_task = tokio::spawn(async move {
        let mut forwarders = Forwarders {
            connection_id: conn_id_for_recv.clone(),
            tasks: HashMap::new(),
        };

        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&feed, &mut forwarders, &tx, msg) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::info!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
fn handle_ws_message(
    feed: &ChangeFeed,
    forwarders: &mut Forwarders,
    out: &mpsc::UnboundedSender<ServerMessage>,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_client_message(feed, forwarders, out, client_msg),
                Err(e) => {
                    tracing::debug!(
                        connection_id = %forwarders.connection_id,
                        error = %e,
                        "Invalid client message"
                    );
                    let _ = out.send(ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    });
                }
            }
            true
        }
        Message::Binary(_) => {
            let _ = out.send(ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            });
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %forwarders.connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
fn handle_client_message(
    feed: &ChangeFeed,
    forwarders: &mut Forwarders,
    out: &mpsc::UnboundedSender<ServerMessage>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Subscribe { tables } => {
            let mut subscribed = Vec::new();
            for name in tables {
                let result = name
                    .parse::<Table>()
                    .map_err(|_| FeedError::UnknownTable(name.clone()))
                    .and_then(|table| {
                        forwarders.subscribe(feed, table, out)?;
                        Ok(table)
                    });
                match result {
                    Ok(table) => subscribed.push(table),
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %forwarders.connection_id,
                            error = %e,
                            "Subscribe error"
                        );
                        let _ = out.send(ServerMessage::Error {
                            message: e.to_string(),
                        });
                    }
                }
            }
            let _ = out.send(ServerMessage::Subscribed { tables: subscribed });
        }
        ClientMessage::Unsubscribe { tables } => {
            let unsubscribed: Vec<Table> = tables
                .iter()
                .filter_map(|name| name.parse::<Table>().ok())
                .filter(|table| forwarders.unsubscribe(*table))
                .collect();
            let _ = out.send(ServerMessage::Unsubscribed {
                tables: unsubscribed,
            });
        }
        ClientMessage::Ping => {
            let _ = out.send(ServerMessage::Pong);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::messages::{ChangeEvent, ChangeKind};

    fn forwarders() -> Forwarders {
        Forwarders {
            connection_id: "test".to_string(),
            tasks: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_forwards_changes() {
        let feed = ChangeFeed::default();
        let mut fw = forwarders();
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_client_message(
            &feed,
            &mut fw,
            &tx,
            ClientMessage::Subscribe {
                tables: vec!["documents".to_string(), "bogus".to_string()],
            },
        );

        assert!(matches!(rx.recv().await, Some(ServerMessage::Error { .. })));
        match rx.recv().await {
            Some(ServerMessage::Subscribed { tables }) => {
                assert_eq!(tables, vec![Table::Documents])
            }
            other => panic!("Expected Subscribed, got {:?}", other),
        }

        feed.publish(ChangeEvent::bare(Table::Documents, ChangeKind::Insert));
        match rx.recv().await {
            Some(ServerMessage::Change { table, kind, .. }) => {
                assert_eq!(table, Table::Documents);
                assert_eq!(kind, ChangeKind::Insert);
            }
            other => panic!("Expected Change, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_feed_subscription() {
        let feed = ChangeFeed::default();
        let mut fw = forwarders();
        let (tx, mut rx) = mpsc::unbounded_channel();

        fw.subscribe(&feed, Table::InvestmentBatches, &tx).unwrap();
        assert_eq!(feed.subscriber_count(), 1);

        handle_client_message(
            &feed,
            &mut fw,
            &tx,
            ClientMessage::Unsubscribe {
                tables: vec!["investment_batches".to_string()],
            },
        );
        match rx.recv().await {
            Some(ServerMessage::Unsubscribed { tables }) => {
                assert_eq!(tables, vec![Table::InvestmentBatches])
            }
            other => panic!("Expected Unsubscribed, got {:?}", other),
        }

        // Aborted task drops its subscription once the runtime reaps it
        tokio::task::yield_now().await;
        for _ in 0..10 {
            if feed.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let feed = ChangeFeed::default();
        let mut fw = forwarders();
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_client_message(&feed, &mut fw, &tx, ClientMessage::Ping);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Pong)));
    }
}
