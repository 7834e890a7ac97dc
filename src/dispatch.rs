//! Protocol dispatcher: one state machine per connection, decoding inbound
//! `dialogue:*` verbs and driving the engine.
//!
//! States run `Handshaking → Authenticating → Connected → Disconnected`.
//! Malformed payloads are dropped with a warning, except `getHistory` and
//! `createRoom` which answer with INVALID_REQUEST.

use crate::client::{ConnectedClient, ConnectionState, JoinOutcome};
use crate::dialogue::Dialogue;
use crate::hooks::log_hook_failure;
use crate::protocol::{
  frames, CreateRoomPayload, DeleteRoomPayload, ErrorCode, GetHistoryPayload, JoinPayload,
  LeavePayload, RawFrame, ServerFrame, SubscribeAllPayload, SubscribePayload, TriggerPayload,
};
use crate::transport::ClientTransport;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Default paging window for `getHistory` when the client sends no range.
const DEFAULT_HISTORY_START: usize = 0;
const DEFAULT_HISTORY_END: usize = 50;

/// One connection as the dispatcher sees it.
pub struct Session {
  transport: Arc<dyn ClientTransport>,
  state: Mutex<ConnectionState>,
  client: Mutex<Option<Arc<ConnectedClient>>>,
}

impl Session {
  fn new(transport: Arc<dyn ClientTransport>) -> Self {
    Self {
      transport,
      state: Mutex::new(ConnectionState::Handshaking),
      client: Mutex::new(None),
    }
  }

  pub fn connection_id(&self) -> &str {
    self.transport.connection_id()
  }

  pub fn state(&self) -> ConnectionState {
    *self.state.lock().expect("session state lock poisoned")
  }

  fn set_state(&self, state: ConnectionState) {
    *self.state.lock().expect("session state lock poisoned") = state;
  }

  /// The authenticated client, once the handshake has succeeded.
  pub fn client(&self) -> Option<Arc<ConnectedClient>> {
    self.client.lock().expect("session client lock poisoned").clone()
  }

  fn set_client(&self, client: Arc<ConnectedClient>) {
    *self.client.lock().expect("session client lock poisoned") = Some(client);
  }

  fn take_client(&self) -> Option<Arc<ConnectedClient>> {
    self.client.lock().expect("session client lock poisoned").take()
  }
}

/// Decodes wire verbs and invokes the engine on behalf of a connection.
pub struct Dispatcher {
  dialogue: Arc<Dialogue>,
}

impl Dispatcher {
  pub fn new(dialogue: Arc<Dialogue>) -> Self {
    Self { dialogue }
  }

  pub fn dialogue(&self) -> &Arc<Dialogue> {
    &self.dialogue
  }

  /// Run the handshake for a freshly accepted transport.
  ///
  /// With an `authenticate` hook configured, its `Err` sends a
  /// transport-level error and terminates the connection. Without one, the
  /// legacy extraction applies: `auth.userId`, else `auth.token`, else the
  /// transport's connection id.
  pub fn connect(&self, transport: Arc<dyn ClientTransport>, auth: Value) -> Arc<Session> {
    let session = Arc::new(Session::new(transport.clone()));
    let ctx = self.dialogue.context();
    let hooks = self.dialogue.hooks();

    session.set_state(ConnectionState::Authenticating);

    let (user_id, auth_data) = match &hooks.authenticate {
      Some(authenticate) => match authenticate(&ctx, &transport, &auth) {
        Ok(data) => (data.jwt.sub.clone(), Some(data)),
        Err(message) => {
          tracing::warn!(
            "Authentication failed for connection {}: {}",
            transport.connection_id(),
            message
          );
          transport.emit(ServerFrame::error(ErrorCode::PermissionDenied, &message));
          transport.close();
          session.set_state(ConnectionState::Disconnected);
          return session;
        }
      },
      None => {
        let user_id = auth
          .get("userId")
          .and_then(Value::as_str)
          .or_else(|| auth.get("token").and_then(Value::as_str))
          .map(str::to_string)
          .unwrap_or_else(|| transport.connection_id().to_string());
        (user_id, None)
      }
    };

    let client = Arc::new(ConnectedClient::new(transport.clone(), user_id, auth_data));
    self.dialogue.clients().add(client.clone());
    session.set_client(client.clone());
    session.set_state(ConnectionState::Connected);

    tracing::info!(
      "Client {} connected as user '{}'",
      client.connection_id(),
      client.user_id()
    );

    if let Some(on_connect) = &hooks.socket.on_connect {
      log_hook_failure("socket.onConnect", on_connect(&ctx, &transport));
    }
    if let Some(on_connected) = &hooks.clients.on_connected {
      log_hook_failure("clients.onConnected", on_connected(&ctx, &client));
    }

    client.emit(ServerFrame::connected(client.connection_id(), client.user_id()));
    session
  }

  /// Handle one inbound text frame. Verbs arrive and are applied in order
  /// for each connection; callers must not interleave frames of one
  /// session.
  pub async fn handle(&self, session: &Session, text: &str) {
    if session.state() != ConnectionState::Connected {
      tracing::debug!(
        "Dropping frame from connection {} in state {:?}",
        session.connection_id(),
        session.state()
      );
      return;
    }
    let Some(client) = session.client() else {
      return;
    };

    let raw = match RawFrame::from_json(text) {
      Ok(raw) => raw,
      Err(e) => {
        tracing::warn!(
          "Unparseable frame from {}: {}",
          session.connection_id(),
          e
        );
        return;
      }
    };

    match raw.event.as_str() {
      frames::JOIN => self.on_join(&client, raw.data),
      frames::LEAVE => self.on_leave(&client, raw.data),
      frames::SUBSCRIBE => self.on_subscribe(&client, raw.data),
      frames::SUBSCRIBE_ALL => self.on_subscribe_all(&client, raw.data),
      frames::UNSUBSCRIBE => self.on_unsubscribe(&client, raw.data),
      frames::TRIGGER => self.on_trigger(&client, raw.data),
      frames::GET_HISTORY => self.on_get_history(&client, raw.data).await,
      frames::LIST_ROOMS => self.on_list_rooms(&client),
      frames::CREATE_ROOM => self.on_create_room(&client, raw.data),
      frames::DELETE_ROOM => self.on_delete_room(&client, raw.data),
      other => {
        tracing::warn!(
          "Unknown verb '{}' from connection {}",
          other,
          session.connection_id()
        );
      }
    }
  }

  /// Tear a connection down, in the fixed order: `clients.onDisconnected`,
  /// `socket.onDisconnect`, room eviction, registry purge.
  pub fn disconnect(&self, session: &Session) {
    if session.state() == ConnectionState::Disconnected {
      return;
    }
    session.set_state(ConnectionState::Disconnected);

    let ctx = self.dialogue.context();
    let hooks = self.dialogue.hooks();

    let Some(client) = session.take_client() else {
      return;
    };

    if let Some(on_disconnected) = &hooks.clients.on_disconnected {
      log_hook_failure("clients.onDisconnected", on_disconnected(&ctx, &client));
    }
    if let Some(on_disconnect) = &hooks.socket.on_disconnect {
      log_hook_failure("socket.onDisconnect", on_disconnect(&ctx, &session.transport));
    }

    client.disconnect(&ctx);
    self.dialogue.clients().remove(client.connection_id());

    tracing::info!("Client {} disconnected", client.connection_id());
  }

  fn on_join(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<JoinPayload>(data) else {
      tracing::warn!("Malformed join payload from {}", client.connection_id());
      return;
    };
    let ctx = self.dialogue.context();
    let hooks = self.dialogue.hooks();

    if let Some(room) = ctx.rooms.get(&payload.room_id) {
      if let Some(before_join) = &hooks.clients.before_join {
        if let Err(message) = before_join(&ctx, client, &payload.room_id, &room) {
          client.emit(ServerFrame::error(ErrorCode::JoinDenied, &message));
          return;
        }
      }
    }

    let outcome = client.join(&ctx, hooks, &payload.room_id);
    if outcome != JoinOutcome::Joined {
      return;
    }

    // Fresh joins may sync recent room history to this socket only.
    let Some(room) = ctx.rooms.get(&payload.room_id) else {
      return;
    };
    let sync = room.config().sync_history_on_join;
    if sync.is_enabled() {
      let events = room.history_snapshot(sync.limit());
      client.emit(ServerFrame::history(&payload.room_id, &events));
    }
  }

  fn on_leave(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<LeavePayload>(data) else {
      tracing::warn!("Malformed leave payload from {}", client.connection_id());
      return;
    };
    client.leave(&self.dialogue.context(), self.dialogue.hooks(), &payload.room_id);
  }

  fn on_subscribe(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<SubscribePayload>(data) else {
      tracing::warn!("Malformed subscribe payload from {}", client.connection_id());
      return;
    };
    client.subscribe(&payload.room_id, &payload.event_name);
  }

  fn on_subscribe_all(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<SubscribeAllPayload>(data) else {
      tracing::warn!("Malformed subscribeAll payload from {}", client.connection_id());
      return;
    };
    client.subscribe_all(&payload.room_id);
  }

  fn on_unsubscribe(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<SubscribePayload>(data) else {
      tracing::warn!("Malformed unsubscribe payload from {}", client.connection_id());
      return;
    };
    client.unsubscribe(&payload.room_id, &payload.event_name);
  }

  fn on_trigger(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<TriggerPayload>(data) else {
      tracing::warn!("Malformed trigger payload from {}", client.connection_id());
      return;
    };
    let ctx = self.dialogue.context();

    let Some(room) = ctx.rooms.get(&payload.room_id) else {
      client.emit(ServerFrame::error(
        ErrorCode::RoomNotFound,
        &format!("Room '{}' not found", payload.room_id),
      ));
      return;
    };

    if let Err(err) = room.trigger(
      &ctx,
      &payload.event,
      payload.data,
      Some(client.user_id()),
      None,
    ) {
      client.emit(ServerFrame::error(err.error_code(), &err.to_string()));
    }
  }

  async fn on_get_history(&self, client: &Arc<ConnectedClient>, data: Value) {
    if !self
      .dialogue
      .limiter()
      .is_allowed(client.connection_id())
      .await
    {
      client.emit(ServerFrame::error(
        ErrorCode::RateLimited,
        "Too many history requests",
      ));
      return;
    }

    let payload = match serde_json::from_value::<GetHistoryPayload>(data) {
      Ok(payload) => payload,
      Err(e) => {
        client.emit(ServerFrame::error(
          ErrorCode::InvalidRequest,
          &format!("Malformed getHistory payload: {}", e),
        ));
        return;
      }
    };

    let Some(room) = self.dialogue.rooms().get(&payload.room_id) else {
      client.emit(ServerFrame::error(
        ErrorCode::RoomNotFound,
        &format!("Room '{}' not found", payload.room_id),
      ));
      return;
    };

    let start = payload.start.unwrap_or(DEFAULT_HISTORY_START);
    let end = payload.end.unwrap_or(DEFAULT_HISTORY_END);

    let events = match &payload.event_name {
      Some(event_name) => room.history(event_name, start, end).await,
      // No event name: window into the merged room history.
      None => {
        let merged = room.history_snapshot(Some(end));
        merged.into_iter().skip(start).collect()
      }
    };

    client.emit(ServerFrame::history_response(
      &payload.room_id,
      payload.event_name.as_deref(),
      &events,
      start,
      end,
    ));
  }

  fn on_list_rooms(&self, client: &Arc<ConnectedClient>) {
    client.emit(ServerFrame::rooms(&self.dialogue.room_infos()));
  }

  fn on_create_room(&self, client: &Arc<ConnectedClient>, data: Value) {
    let payload = match serde_json::from_value::<CreateRoomPayload>(data) {
      Ok(payload) => payload,
      Err(e) => {
        client.emit(ServerFrame::error(
          ErrorCode::InvalidRequest,
          &format!("Malformed createRoom payload: {}", e),
        ));
        return;
      }
    };

    match self.dialogue.create_room(
      &payload.id,
      &payload.name,
      payload.description,
      payload.max_size,
      client.user_id(),
    ) {
      Ok(room) => {
        // The creator hears it directly as well as via the broadcast.
        client.emit(ServerFrame::room_created(&room.info()));
      }
      Err(err) => {
        client.emit(ServerFrame::error(err.error_code(), &err.to_string()));
      }
    }
  }

  fn on_delete_room(&self, client: &Arc<ConnectedClient>, data: Value) {
    let Ok(payload) = serde_json::from_value::<DeleteRoomPayload>(data) else {
      tracing::warn!("Malformed deleteRoom payload from {}", client.connection_id());
      return;
    };

    if let Err(err) = self
      .dialogue
      .delete_room(&payload.room_id, Some(client.user_id()))
    {
      client.emit(ServerFrame::error(err.error_code(), &err.to_string()));
    }
  }
}
