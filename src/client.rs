//! One connected client: identity, auth, joined rooms, and the per-room
//! subscription sets that drive fan-out.

use crate::auth::AuthData;
use crate::event::WILDCARD;
use crate::hooks::{log_hook_failure, DialogueContext, Hooks};
use crate::protocol::{ErrorCode, ServerFrame};
use crate::transport::ClientTransport;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Lifecycle of one connection through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Handshaking,
  Authenticating,
  Connected,
  /// Terminal.
  Disconnected,
}

/// Outcome of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
  /// Fresh join; room state recorded and the ack emitted.
  Joined,
  /// Idempotent re-join; only the ack was re-emitted.
  AlreadyJoined,
  /// Capacity reached; a ROOM_FULL error went to this socket only.
  Full,
  /// No such room; logged, nothing emitted.
  MissingRoom,
}

struct ClientState {
  joined_rooms: HashSet<String>,
  subscriptions: HashMap<String, HashSet<String>>,
}

/// A single transport connection with an authenticated identity.
///
/// Clients hold room *ids* only; rooms hold the strong reference back to
/// the client, and the client registry owns the client itself.
pub struct ConnectedClient {
  transport: Arc<dyn ClientTransport>,
  user_id: String,
  auth: Option<AuthData>,
  meta: Mutex<Map<String, Value>>,
  state: Mutex<ClientState>,
  connection_state: Mutex<ConnectionState>,
}

impl ConnectedClient {
  pub fn new(
    transport: Arc<dyn ClientTransport>,
    user_id: impl Into<String>,
    auth: Option<AuthData>,
  ) -> Self {
    Self {
      transport,
      user_id: user_id.into(),
      auth,
      meta: Mutex::new(Map::new()),
      state: Mutex::new(ClientState {
        joined_rooms: HashSet::new(),
        subscriptions: HashMap::new(),
      }),
      connection_state: Mutex::new(ConnectionState::Connected),
    }
  }

  pub fn connection_id(&self) -> &str {
    self.transport.connection_id()
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn auth(&self) -> Option<&AuthData> {
    self.auth.as_ref()
  }

  pub fn transport(&self) -> &Arc<dyn ClientTransport> {
    &self.transport
  }

  pub fn emit(&self, frame: ServerFrame) {
    self.transport.emit(frame);
  }

  /// Opaque key-value metadata attached by server-side code.
  pub fn meta(&self) -> Map<String, Value> {
    self.meta.lock().expect("client meta lock poisoned").clone()
  }

  pub fn set_meta(&self, key: impl Into<String>, value: Value) {
    self
      .meta
      .lock()
      .expect("client meta lock poisoned")
      .insert(key.into(), value);
  }

  pub fn connection_state(&self) -> ConnectionState {
    *self
      .connection_state
      .lock()
      .expect("client state lock poisoned")
  }

  pub(crate) fn set_connection_state(&self, state: ConnectionState) {
    *self
      .connection_state
      .lock()
      .expect("client state lock poisoned") = state;
  }

  pub fn joined_rooms(&self) -> Vec<String> {
    self
      .state
      .lock()
      .expect("client state lock poisoned")
      .joined_rooms
      .iter()
      .cloned()
      .collect()
  }

  pub fn has_joined(&self, room_id: &str) -> bool {
    self
      .state
      .lock()
      .expect("client state lock poisoned")
      .joined_rooms
      .contains(room_id)
  }

  /// Event names this client subscribed to in a room.
  pub fn subscriptions(&self, room_id: &str) -> Vec<String> {
    self
      .state
      .lock()
      .expect("client state lock poisoned")
      .subscriptions
      .get(room_id)
      .map(|set| set.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// The fan-out predicate: subscribed to the name or to the wildcard.
  pub fn is_subscribed(&self, room_id: &str, event_name: &str) -> bool {
    let state = self.state.lock().expect("client state lock poisoned");
    state
      .subscriptions
      .get(room_id)
      .is_some_and(|set| set.contains(WILDCARD) || set.contains(event_name))
  }

  /// Join a room.
  ///
  /// Missing rooms are logged and ignored. Re-joining an already joined
  /// room only re-emits the ack so reconnecting UIs converge. A full room
  /// answers ROOM_FULL to this socket alone. On a fresh join the room's
  /// default subscriptions are applied before the ack is emitted.
  ///
  /// The client must be indexed in the client registry (the dispatcher does
  /// this at the handshake); the registry holds the owning handle the room
  /// keeps while this client participates.
  pub fn join(&self, ctx: &DialogueContext, hooks: &Hooks, room_id: &str) -> JoinOutcome {
    let Some(room) = ctx.rooms.get(room_id) else {
      tracing::warn!(
        "Client {} tried to join unknown room '{}'",
        self.connection_id(),
        room_id
      );
      return JoinOutcome::MissingRoom;
    };

    if self.has_joined(room_id) {
      self.emit(ServerFrame::joined(room_id, room.name()));
      return JoinOutcome::AlreadyJoined;
    }

    let Some(me) = ctx.clients.get(self.connection_id()) else {
      tracing::error!(
        "Client {} is not indexed in the client registry",
        self.connection_id()
      );
      return JoinOutcome::MissingRoom;
    };

    if !ctx.rooms.add_participant(room_id, me) {
      self.emit(ServerFrame::error(
        ErrorCode::RoomFull,
        &format!("Room '{}' is full", room_id),
      ));
      return JoinOutcome::Full;
    }

    {
      let mut state = self.state.lock().expect("client state lock poisoned");
      state.joined_rooms.insert(room_id.to_string());
      state.subscriptions.entry(room_id.to_string()).or_default();
    }

    for event_name in &room.config().default_subscriptions {
      self.subscribe(room_id, event_name);
    }

    self.emit(ServerFrame::joined(room_id, room.name()));
    tracing::debug!("Client {} joined room '{}'", self.connection_id(), room_id);

    if let Some(on_joined) = &hooks.clients.on_joined {
      log_hook_failure("clients.onJoined", on_joined(ctx, self, room_id));
    }
    JoinOutcome::Joined
  }

  /// Leave a room and ack with `dialogue:left`.
  pub fn leave(&self, ctx: &DialogueContext, hooks: &Hooks, room_id: &str) {
    ctx.rooms.remove_participant(room_id, self.connection_id());
    self.clear_room_state(room_id);
    self.emit(ServerFrame::left(room_id));
    tracing::debug!("Client {} left room '{}'", self.connection_id(), room_id);

    if let Some(on_left) = &hooks.clients.on_left {
      log_hook_failure("clients.onLeft", on_left(ctx, self, room_id));
    }
  }

  /// Add an event name (or the `"*"` wildcard) to the subscription set for
  /// a joined room. A warning-level no-op otherwise.
  pub fn subscribe(&self, room_id: &str, event_name: &str) {
    let mut state = self.state.lock().expect("client state lock poisoned");
    if !state.joined_rooms.contains(room_id) {
      tracing::warn!(
        "Client {} subscribed to '{}' in room '{}' without joining it",
        self.connection_id(),
        event_name,
        room_id
      );
      return;
    }
    state
      .subscriptions
      .entry(room_id.to_string())
      .or_default()
      .insert(event_name.to_string());
  }

  /// Subscribe to every event in the room.
  pub fn subscribe_all(&self, room_id: &str) {
    self.subscribe(room_id, WILDCARD);
  }

  pub fn unsubscribe(&self, room_id: &str, event_name: &str) {
    let mut state = self.state.lock().expect("client state lock poisoned");
    if let Some(set) = state.subscriptions.get_mut(room_id) {
      set.remove(event_name);
    }
  }

  /// Drop local membership state for one room. Does not touch the
  /// registry; used when the registry already evicted this client.
  pub(crate) fn clear_room_state(&self, room_id: &str) {
    let mut state = self.state.lock().expect("client state lock poisoned");
    state.joined_rooms.remove(room_id);
    state.subscriptions.remove(room_id);
  }

  /// Remove this client from every room, clear local state, and close the
  /// transport. Registry purging and hook ordering are the dispatcher's
  /// responsibility.
  pub fn disconnect(&self, ctx: &DialogueContext) {
    ctx.rooms.remove_from_all_rooms(self.connection_id());
    {
      let mut state = self.state.lock().expect("client state lock poisoned");
      state.joined_rooms.clear();
      state.subscriptions.clear();
    }
    self.set_connection_state(ConnectionState::Disconnected);
    self.transport.close();
  }
}

impl std::fmt::Debug for ConnectedClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConnectedClient")
      .field("connection_id", &self.connection_id())
      .field("user_id", &self.user_id)
      .field("joined_rooms", &self.joined_rooms())
      .finish()
  }
}
