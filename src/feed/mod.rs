//! Real-Time Change Feed
//!
//! Notifies listeners when a watched table changes so every open view can
//! refetch.
//!
//! ## Architecture
//!
//! - **ChangeFeed**: In-process hub; `subscribe(table, mask)` returns a
//!   `Subscription` that is released when dropped
//! - **Handler**: WebSocket endpoint bridging the hub to browsers
//! - **Messages**: Change events and the websocket wire format
//!
//! ## Usage
//!
//! Clients connect to `/api/v1/ws` and subscribe to table names:
//! - `investment_batches`
//! - `investment_details`
//! - `documents`
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8082/api/v1/ws');
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', tables: ['investment_batches']}));
//! };
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'change') refetch(msg.table);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ChangeFeed, FeedConfig, FeedError, Subscription, SubscriptionId};
pub use messages::{ChangeEvent, ChangeKind, ClientMessage, EventMask, ServerMessage};
