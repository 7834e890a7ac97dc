//! Realtime event routing for browser and service clients.
//!
//! Clients open a persistent bidirectional connection, join named rooms,
//! subscribe to named event types, and exchange validated JSON payloads
//! with the other subscribed members. Server-side code emits events into
//! any room through the [`Dialogue`] façade. Everything a deployment needs
//! to customize (authentication, join permission, message transformation,
//! history persistence) is a hook.
//!
//! ## Example Usage
//! ```no_run
//! use dialogue::{Dialogue, DialogueServer, EventDefinition, RoomConfig, SyncHistory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Dialogue::builder()
//!         .room(
//!             "lobby",
//!             RoomConfig::new("Lobby")
//!                 .with_max_size(64)
//!                 .event(EventDefinition::new("message").with_history(100))
//!                 .default_subscription("message")
//!                 .sync_history_on_join(SyncHistory::Limit(50)),
//!         )
//!         .before_each(|_ctx, _room_id, msg, _from| Ok(msg))
//!         .build()?;
//!
//!     DialogueServer::new(engine).listen("0.0.0.0:8080").await
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod dialogue;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod history;
pub mod hooks;
pub mod protocol;
pub mod rate_limit;
pub mod registry;
pub mod room;
pub mod server;
pub mod transport;

pub use auth::{AuthData, JwtAuthenticator, JwtClaims};
pub use client::{ConnectedClient, ConnectionState, JoinOutcome};
pub use config::DialogueConfig;
pub use dialogue::{Dialogue, DialogueBuilder};
pub use dispatch::{Dispatcher, Session};
pub use error::{ConfigError, DialogueError};
pub use event::{
  is_event_allowed, validate_event_data, EventDefinition, HistoryPolicy, SchemaValidator,
  ValidationIssue, Validator, WILDCARD,
};
pub use history::HistoryStore;
pub use hooks::{DialogueContext, HistoryLoader, Hooks};
pub use protocol::{ErrorCode, EventMessage, ServerFrame, SYSTEM_SENDER};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use registry::{ClientRegistry, RoomRegistry};
pub use room::{HandlerId, Room, RoomConfig, RoomInfo, SyncHistory};
pub use server::DialogueServer;
pub use transport::{ChannelTransport, ClientTransport};
