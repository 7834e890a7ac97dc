//! The `Dialogue` façade: one value owning the registries, history,
//! limiter, and hooks, with a builder for configuration.
//!
//! Server-side code triggers events and manages rooms through this type;
//! the protocol dispatcher drives it on behalf of connected clients.

use crate::auth::JwtAuthenticator;
use crate::client::ConnectedClient;
use crate::config::DialogueConfig;
use crate::error::{ConfigError, DialogueError};
use crate::history::HistoryStore;
use crate::hooks::{
  AuthenticateHook, DialogueContext, HistoryLoader, Hooks,
};
use crate::protocol::{EventMessage, ServerFrame};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::registry::{ClientRegistry, RoomRegistry};
use crate::room::{Room, RoomConfig, RoomInfo};
use crate::transport::ClientTransport;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The routing engine. Cheap to clone handles are available through
/// [`Dialogue::context`]; the value itself is typically kept in an `Arc`.
pub struct Dialogue {
  rooms: Arc<RoomRegistry>,
  clients: Arc<ClientRegistry>,
  store: Arc<HistoryStore>,
  hooks: Arc<Hooks>,
  limiter: RateLimiter,
  forbid_wildcard_rooms: bool,
}

impl Dialogue {
  pub fn builder() -> DialogueBuilder {
    DialogueBuilder::new()
  }

  pub fn rooms(&self) -> &Arc<RoomRegistry> {
    &self.rooms
  }

  pub fn clients(&self) -> &Arc<ClientRegistry> {
    &self.clients
  }

  pub fn history(&self) -> &Arc<HistoryStore> {
    &self.store
  }

  pub(crate) fn hooks(&self) -> &Arc<Hooks> {
    &self.hooks
  }

  pub(crate) fn limiter(&self) -> &RateLimiter {
    &self.limiter
  }

  /// The snapshot view hooks receive.
  pub fn context(&self) -> DialogueContext {
    DialogueContext {
      rooms: self.rooms.clone(),
      clients: self.clients.clone(),
    }
  }

  /// Emit a server-originated event into a room (`from = "system"`).
  pub fn trigger(
    &self,
    room_id: &str,
    event: &str,
    data: Value,
  ) -> Result<usize, DialogueError> {
    self.trigger_as(room_id, event, data, None, None)
  }

  /// Emit an event into a room with an explicit sender and metadata.
  pub fn trigger_as(
    &self,
    room_id: &str,
    event: &str,
    data: Value,
    from: Option<&str>,
    meta: Option<Map<String, Value>>,
  ) -> Result<usize, DialogueError> {
    let room = self
      .rooms
      .get(room_id)
      .ok_or_else(|| DialogueError::RoomNotFound(room_id.to_string()))?;
    room.trigger(&self.context(), event, data, from, meta)
  }

  /// Register a room from server-side code.
  pub fn register_room(
    &self,
    id: impl Into<String>,
    config: RoomConfig,
  ) -> Result<Arc<Room>, DialogueError> {
    self.rooms.register(id, config)
  }

  /// Create a room on behalf of a user (the dynamic `createRoom` path).
  ///
  /// Dynamic rooms carry an empty allow-list, i.e. wildcard semantics; the
  /// `forbid_wildcard_rooms` flag turns that into a PermissionDenied. Every
  /// connected client is notified with `dialogue:roomCreated`.
  pub fn create_room(
    &self,
    id: &str,
    name: &str,
    description: Option<String>,
    max_size: Option<usize>,
    created_by: &str,
  ) -> Result<Arc<Room>, DialogueError> {
    if self.forbid_wildcard_rooms {
      return Err(DialogueError::PermissionDenied(
        "Dynamic room creation is disabled".to_string(),
      ));
    }
    if self.rooms.get(id).is_some() {
      return Err(DialogueError::RoomExists(id.to_string()));
    }
    if max_size == Some(0) {
      return Err(DialogueError::InvalidRequest(
        "maxSize must be at least 1".to_string(),
      ));
    }

    let mut config = RoomConfig::new(name).created_by(created_by);
    config.description = description;
    config.max_size = max_size;

    let room = self.rooms.register(id, config)?;

    let frame = ServerFrame::room_created(&room.info());
    for client in self.clients.all() {
      client.emit(frame.clone());
    }
    Ok(room)
  }

  /// Delete a room.
  ///
  /// With a requester set, only the room's creator may delete it; rooms
  /// from static configuration have no creator and are never deletable by
  /// clients. Server-side calls pass `None` and always succeed.
  pub fn delete_room(
    &self,
    room_id: &str,
    requester: Option<&str>,
  ) -> Result<(), DialogueError> {
    let room = self
      .rooms
      .get(room_id)
      .ok_or_else(|| DialogueError::RoomNotFound(room_id.to_string()))?;

    if let Some(requester) = requester {
      if room.created_by() != Some(requester) {
        return Err(DialogueError::PermissionDenied(format!(
          "Only the creator may delete room '{}'",
          room_id
        )));
      }
    }

    self.rooms.unregister(room_id);
    Ok(())
  }

  /// Room snapshots for `dialogue:rooms`.
  pub fn room_infos(&self) -> Vec<RoomInfo> {
    self.rooms.infos()
  }

  /// Every connection of a user, via the reverse index.
  pub fn clients_by_user_id(&self, user_id: &str) -> Vec<Arc<ConnectedClient>> {
    self.clients.clients_by_user_id(user_id)
  }

  /// Force a user out of every joined room across all their connections.
  /// The callback observes each room id before the mutation.
  pub fn leave_all(&self, user_id: &str, callback: Option<&mut dyn FnMut(&str)>) {
    self.clients.leave_all(&self.rooms, user_id, callback);
  }
}

/// Builder for [`Dialogue`]. Chain hook setters and room registrations,
/// then `build()`.
pub struct DialogueBuilder {
  config: DialogueConfig,
  hooks: Hooks,
}

impl DialogueBuilder {
  pub fn new() -> Self {
    Self {
      config: DialogueConfig::default(),
      hooks: Hooks::default(),
    }
  }

  pub fn with_config(mut self, config: DialogueConfig) -> Self {
    self.config = config;
    self
  }

  /// Declare a static room. Static rooms have no creator and cannot be
  /// deleted by clients.
  pub fn room(mut self, id: impl Into<String>, config: RoomConfig) -> Self {
    self.config.rooms.push((id.into(), config));
    self
  }

  pub fn forbid_wildcard_rooms(mut self, forbid: bool) -> Self {
    self.config.forbid_wildcard_rooms = forbid;
    self
  }

  pub fn history_rate_limit(mut self, config: RateLimitConfig) -> Self {
    self.config.history_rate_limit = config;
    self
  }

  /// Install all hooks at once. Individual setters below override fields
  /// set here.
  pub fn with_hooks(mut self, hooks: Hooks) -> Self {
    self.hooks = hooks;
    self
  }

  pub fn authenticate<F>(mut self, f: F) -> Self
  where
    F: Fn(
        &DialogueContext,
        &Arc<dyn ClientTransport>,
        &Value,
      ) -> Result<crate::auth::AuthData, String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.authenticate = Some(Arc::new(f) as AuthenticateHook);
    self
  }

  /// Authenticate handshakes with an HS256 token in the `token` field.
  pub fn authenticate_with_jwt(self, authenticator: JwtAuthenticator) -> Self {
    self.authenticate(move |_ctx, _socket, auth| authenticator.authenticate(auth))
  }

  pub fn on_socket_connect<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &Arc<dyn ClientTransport>) -> Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.socket.on_connect = Some(Arc::new(f));
    self
  }

  pub fn on_socket_disconnect<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &Arc<dyn ClientTransport>) -> Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.socket.on_disconnect = Some(Arc::new(f));
    self
  }

  pub fn before_join<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &ConnectedClient, &str, &Room) -> Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.clients.before_join = Some(Arc::new(f));
    self
  }

  pub fn on_client_connected<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &ConnectedClient) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.clients.on_connected = Some(Arc::new(f));
    self
  }

  pub fn on_client_disconnected<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &ConnectedClient) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.clients.on_disconnected = Some(Arc::new(f));
    self
  }

  pub fn on_joined<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &ConnectedClient, &str) -> Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.clients.on_joined = Some(Arc::new(f));
    self
  }

  pub fn on_left<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &ConnectedClient, &str) -> Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.clients.on_left = Some(Arc::new(f));
    self
  }

  pub fn before_each<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &str, EventMessage, &str) -> Result<EventMessage, String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.events.before_each = Some(Arc::new(f));
    self
  }

  pub fn after_each<F>(mut self, f: F) -> Self
  where
    F: Fn(&DialogueContext, &str, &EventMessage, usize) + Send + Sync + 'static,
  {
    self.hooks.events.after_each = Some(Arc::new(f));
    self
  }

  pub fn on_triggered<F>(mut self, f: F) -> Self
  where
    F: Fn(&str, &EventMessage) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.events.on_triggered = Some(Arc::new(f));
    self
  }

  pub fn on_cleanup<F>(mut self, f: F) -> Self
  where
    F: Fn(&str, &str, Vec<EventMessage>) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.events.on_cleanup = Some(Arc::new(f));
    self
  }

  pub fn on_load(mut self, loader: impl HistoryLoader + 'static) -> Self {
    self.hooks.events.on_load = Some(Arc::new(loader));
    self
  }

  pub fn on_room_created<F>(mut self, f: F) -> Self
  where
    F: Fn(&RoomInfo) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.rooms.on_created = Some(Arc::new(f));
    self
  }

  pub fn on_room_deleted<F>(mut self, f: F) -> Self
  where
    F: Fn(&RoomInfo) -> Result<(), String> + Send + Sync + 'static,
  {
    self.hooks.rooms.on_deleted = Some(Arc::new(f));
    self
  }

  /// Validate the configuration and assemble the engine, registering every
  /// static room.
  pub fn build(self) -> Result<Dialogue, ConfigError> {
    self.config.validate()?;

    let hooks = Arc::new(self.hooks);
    let store = Arc::new(HistoryStore::new(hooks.clone()));
    let rooms = Arc::new(RoomRegistry::new(store.clone(), hooks.clone()));
    let clients = Arc::new(ClientRegistry::new());

    for (id, room_config) in self.config.rooms {
      // Uniqueness was validated above; a failure here is a programmer
      // error in the registry itself.
      rooms
        .register(id, room_config)
        .expect("static room registration cannot collide after validation");
    }

    Ok(Dialogue {
      rooms,
      clients,
      store,
      hooks,
      limiter: RateLimiter::new(self.config.history_rate_limit),
      forbid_wildcard_rooms: self.config.forbid_wildcard_rooms,
    })
  }
}

impl Default for DialogueBuilder {
  fn default() -> Self {
    Self::new()
  }
}
