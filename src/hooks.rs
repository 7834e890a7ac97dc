//! User-supplied lifecycle hooks and the context view they receive.
//!
//! Each hook group is a struct of optional callbacks. Synchronous hooks
//! (`authenticate`, `before_join`, `before_each`, `after_each`) run on the
//! calling path and their `Err` values abort the operation. Fire-and-forget
//! hooks also report failures as `Err`, but those are only logged and never
//! reach the caller. External history loading is the one suspension point,
//! expressed as the [`HistoryLoader`] capability.

use crate::auth::AuthData;
use crate::client::ConnectedClient;
use crate::protocol::EventMessage;
use crate::registry::{ClientRegistry, RoomRegistry};
use crate::room::{Room, RoomInfo};
use crate::transport::ClientTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Read-only view of the server state handed to every hook.
///
/// The view is a cheap handle, not a copy: lookups observe the live
/// registries at call time.
#[derive(Clone)]
pub struct DialogueContext {
  pub(crate) rooms: Arc<RoomRegistry>,
  pub(crate) clients: Arc<ClientRegistry>,
}

impl DialogueContext {
  pub fn room(&self, room_id: &str) -> Option<Arc<Room>> {
    self.rooms.get(room_id)
  }

  pub fn rooms(&self) -> Vec<Arc<Room>> {
    self.rooms.all()
  }

  pub fn client(&self, connection_id: &str) -> Option<Arc<ConnectedClient>> {
    self.clients.get(connection_id)
  }

  pub fn clients(&self) -> Vec<Arc<ConnectedClient>> {
    self.clients.all()
  }
}

/// Authenticates a handshake. `Ok` attaches the returned auth data to the
/// client; `Err` closes the connection.
pub type AuthenticateHook = Arc<
  dyn Fn(&DialogueContext, &Arc<dyn ClientTransport>, &Value) -> Result<AuthData, String>
    + Send
    + Sync,
>;

/// Fire-and-forget socket lifecycle callback.
pub type SocketHook =
  Arc<dyn Fn(&DialogueContext, &Arc<dyn ClientTransport>) -> Result<(), String> + Send + Sync>;

/// Gate run after the target room resolves and before the client joins.
pub type BeforeJoinHook = Arc<
  dyn Fn(&DialogueContext, &ConnectedClient, &str, &Room) -> Result<(), String> + Send + Sync,
>;

/// Fire-and-forget client lifecycle callback.
pub type ClientHook =
  Arc<dyn Fn(&DialogueContext, &ConnectedClient) -> Result<(), String> + Send + Sync>;

/// Fire-and-forget client/room lifecycle callback (joined, left).
pub type ClientRoomHook =
  Arc<dyn Fn(&DialogueContext, &ConnectedClient, &str) -> Result<(), String> + Send + Sync>;

/// Synchronous message gate on the trigger path. Receives the constructed
/// envelope and either returns the (possibly transformed) replacement or an
/// error string that aborts the trigger. Only `data` and `meta` of the
/// returned message are honored.
pub type BeforeEachHook = Arc<
  dyn Fn(&DialogueContext, &str, EventMessage, &str) -> Result<EventMessage, String>
    + Send
    + Sync,
>;

/// Synchronous observer run after fan-out with the final message and the
/// number of recipients.
pub type AfterEachHook = Arc<dyn Fn(&DialogueContext, &str, &EventMessage, usize) + Send + Sync>;

/// Fire-and-forget notification that a message was broadcast.
pub type TriggeredHook = Arc<dyn Fn(&str, &EventMessage) -> Result<(), String> + Send + Sync>;

/// Fire-and-forget notification of history eviction: `(room, event, evicted)`
/// in push order. Typically persists the batch to external storage.
pub type CleanupHook =
  Arc<dyn Fn(&str, &str, Vec<EventMessage>) -> Result<(), String> + Send + Sync>;

/// Fire-and-forget room lifecycle callback.
pub type RoomLifecycleHook = Arc<dyn Fn(&RoomInfo) -> Result<(), String> + Send + Sync>;

/// External history storage read, used when a paginated request reaches past
/// the in-memory buffer. May suspend; never called under a room lock.
#[async_trait]
pub trait HistoryLoader: Send + Sync {
  async fn load(
    &self,
    room_id: &str,
    event_name: &str,
    start: usize,
    end: usize,
  ) -> Result<Vec<EventMessage>, String>;
}

#[derive(Clone, Default)]
pub struct SocketHooks {
  pub on_connect: Option<SocketHook>,
  pub on_disconnect: Option<SocketHook>,
}

#[derive(Clone, Default)]
pub struct ClientHooks {
  pub before_join: Option<BeforeJoinHook>,
  pub on_connected: Option<ClientHook>,
  pub on_disconnected: Option<ClientHook>,
  pub on_joined: Option<ClientRoomHook>,
  pub on_left: Option<ClientRoomHook>,
}

#[derive(Clone, Default)]
pub struct EventHooks {
  pub before_each: Option<BeforeEachHook>,
  pub after_each: Option<AfterEachHook>,
  pub on_triggered: Option<TriggeredHook>,
  pub on_cleanup: Option<CleanupHook>,
  pub on_load: Option<Arc<dyn HistoryLoader>>,
}

#[derive(Clone, Default)]
pub struct RoomHooks {
  pub on_created: Option<RoomLifecycleHook>,
  pub on_deleted: Option<RoomLifecycleHook>,
}

/// All hook groups. Every field defaults to "not configured".
#[derive(Clone, Default)]
pub struct Hooks {
  pub authenticate: Option<AuthenticateHook>,
  pub socket: SocketHooks,
  pub clients: ClientHooks,
  pub events: EventHooks,
  pub rooms: RoomHooks,
}

/// Log a fire-and-forget hook failure without propagating it.
pub(crate) fn log_hook_failure(at_function: &str, result: Result<(), String>) {
  if let Err(message) = result {
    tracing::error!("Hook failed at {}: {}", at_function, message);
  }
}
