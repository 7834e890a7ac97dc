//! Rooms: per-room configuration, participants, server-side handlers, and
//! the trigger pipeline that fans validated events out to subscribers.

use crate::client::ConnectedClient;
use crate::error::DialogueError;
use crate::event::{is_event_allowed, validate_event_data, EventDefinition, WILDCARD};
use crate::history::HistoryStore;
use crate::hooks::{log_hook_failure, DialogueContext, Hooks};
use crate::protocol::{EventMessage, ServerFrame, SYSTEM_SENDER};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// How much history a freshly joined socket receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncHistory {
  #[default]
  None,
  All,
  Limit(usize),
}

impl SyncHistory {
  pub fn is_enabled(&self) -> bool {
    !matches!(self, Self::None)
  }

  pub fn limit(&self) -> Option<usize> {
    match self {
      Self::Limit(n) => Some(*n),
      _ => None,
    }
  }
}

/// Configuration for one room. An empty `events` list means every event
/// name is allowed (wildcard room).
#[derive(Clone, Default)]
pub struct RoomConfig {
  pub name: String,
  pub description: Option<String>,
  /// Maximum participant count; `None` is unbounded.
  pub max_size: Option<usize>,
  pub events: Vec<EventDefinition>,
  /// Event names a joiner is auto-subscribed to; `"*"` subscribes to all.
  pub default_subscriptions: Vec<String>,
  /// User id of the creator. Only the creator may delete the room; rooms
  /// from static configuration have no creator and cannot be deleted by
  /// clients.
  pub created_by: Option<String>,
  pub sync_history_on_join: SyncHistory,
}

impl RoomConfig {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn with_max_size(mut self, max_size: usize) -> Self {
    self.max_size = Some(max_size);
    self
  }

  pub fn event(mut self, def: EventDefinition) -> Self {
    self.events.push(def);
    self
  }

  pub fn default_subscription(mut self, event_name: impl Into<String>) -> Self {
    self.default_subscriptions.push(event_name.into());
    self
  }

  pub fn subscribe_all_on_join(self) -> Self {
    self.default_subscription(WILDCARD)
  }

  pub fn created_by(mut self, user_id: impl Into<String>) -> Self {
    self.created_by = Some(user_id.into());
    self
  }

  pub fn sync_history_on_join(mut self, sync: SyncHistory) -> Self {
    self.sync_history_on_join = sync;
    self
  }
}

/// Snapshot of a room's publicly visible state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
  pub id: String,
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub size: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_size: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by_id: Option<String>,
}

/// Opaque token returned by [`Room::on`], used to remove the handler.
pub type HandlerId = u64;

type EventHandler =
  Arc<dyn Fn(EventMessage) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct RoomState {
  participants: HashMap<String, Arc<ConnectedClient>>,
  handlers: HashMap<String, BTreeMap<HandlerId, EventHandler>>,
  next_handler_id: HandlerId,
}

/// One room at runtime.
///
/// The trigger path is fully synchronous: validation, the `before_each`
/// gate, fan-out, and the history push all complete without awaiting
/// anything. Server-side handlers registered through [`Room::on`] run
/// fire-and-forget on the Tokio runtime afterwards.
pub struct Room {
  id: String,
  config: RoomConfig,
  state: Mutex<RoomState>,
  store: Arc<HistoryStore>,
  hooks: Arc<Hooks>,
}

impl std::fmt::Debug for Room {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Room").field("id", &self.id).finish_non_exhaustive()
  }
}

impl Room {
  pub(crate) fn new(
    id: impl Into<String>,
    config: RoomConfig,
    store: Arc<HistoryStore>,
    hooks: Arc<Hooks>,
  ) -> Self {
    Self {
      id: id.into(),
      config,
      state: Mutex::new(RoomState {
        participants: HashMap::new(),
        handlers: HashMap::new(),
        next_handler_id: 0,
      }),
      store,
      hooks,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn name(&self) -> &str {
    &self.config.name
  }

  pub fn config(&self) -> &RoomConfig {
    &self.config
  }

  pub fn created_by(&self) -> Option<&str> {
    self.config.created_by.as_deref()
  }

  pub fn size(&self) -> usize {
    self.state.lock().expect("room lock poisoned").participants.len()
  }

  pub fn is_full(&self) -> bool {
    match self.config.max_size {
      Some(max) => self.size() >= max,
      None => false,
    }
  }

  /// Current participants, in no particular order.
  pub fn participants(&self) -> Vec<Arc<ConnectedClient>> {
    self
      .state
      .lock()
      .expect("room lock poisoned")
      .participants
      .values()
      .cloned()
      .collect()
  }

  pub fn info(&self) -> RoomInfo {
    RoomInfo {
      id: self.id.clone(),
      name: self.config.name.clone(),
      description: self.config.description.clone(),
      size: self.size(),
      max_size: self.config.max_size,
      created_by_id: self.config.created_by.clone(),
    }
  }

  /// Insert a participant, enforcing capacity under the room lock.
  pub(crate) fn insert_participant(&self, client: Arc<ConnectedClient>) -> bool {
    let mut state = self.state.lock().expect("room lock poisoned");
    if let Some(max) = self.config.max_size {
      if state.participants.len() >= max {
        return false;
      }
    }
    state
      .participants
      .insert(client.connection_id().to_string(), client);
    true
  }

  pub(crate) fn remove_participant(&self, connection_id: &str) -> Option<Arc<ConnectedClient>> {
    self
      .state
      .lock()
      .expect("room lock poisoned")
      .participants
      .remove(connection_id)
  }

  pub fn contains_participant(&self, connection_id: &str) -> bool {
    self
      .state
      .lock()
      .expect("room lock poisoned")
      .participants
      .contains_key(connection_id)
  }

  pub(crate) fn drain_participants(&self) -> Vec<Arc<ConnectedClient>> {
    self
      .state
      .lock()
      .expect("room lock poisoned")
      .participants
      .drain()
      .map(|(_, client)| client)
      .collect()
  }

  /// Register a server-local handler for an event name. Handlers run
  /// fire-and-forget after each broadcast of that event; their errors and
  /// panics never reach the trigger caller.
  pub fn on<F, Fut>(&self, event_name: impl Into<String>, handler: F) -> HandlerId
  where
    F: Fn(EventMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let mut state = self.state.lock().expect("room lock poisoned");
    let id = state.next_handler_id;
    state.next_handler_id += 1;
    state
      .handlers
      .entry(event_name.into())
      .or_default()
      .insert(id, Arc::new(move |msg| Box::pin(handler(msg))));
    id
  }

  /// Remove a handler registered with [`Room::on`]. Cleans up the per-event
  /// set when it empties.
  pub fn off(&self, event_name: &str, id: HandlerId) -> bool {
    let mut state = self.state.lock().expect("room lock poisoned");
    let Some(handlers) = state.handlers.get_mut(event_name) else {
      return false;
    };
    let removed = handlers.remove(&id).is_some();
    if handlers.is_empty() {
      state.handlers.remove(event_name);
    }
    removed
  }

  /// Broadcast an event to every subscribed participant.
  ///
  /// Returns the recipient count on success. Expected failures (allow-list,
  /// validation, `before_each` denial) come back as errors for the direct
  /// caller; nothing has been emitted or stored when they do.
  pub fn trigger(
    &self,
    ctx: &DialogueContext,
    event: &str,
    data: Value,
    from: Option<&str>,
    meta: Option<Map<String, Value>>,
  ) -> Result<usize, DialogueError> {
    if !is_event_allowed(event, &self.config.events) {
      return Err(DialogueError::EventNotAllowed {
        event: event.to_string(),
        room: self.id.clone(),
      });
    }

    // Wildcard rooms carry no definition for the name; synthesize a bare
    // one with no validator and no history.
    let def = self
      .config
      .events
      .iter()
      .find(|d| d.name() == event)
      .cloned()
      .unwrap_or_else(|| EventDefinition::new(event));

    let data = validate_event_data(&def, &data).map_err(DialogueError::Validation)?;

    let from = from.unwrap_or(SYSTEM_SENDER);
    let mut msg = EventMessage {
      event: event.to_string(),
      room_id: self.id.clone(),
      data,
      from: from.to_string(),
      timestamp: chrono::Utc::now().timestamp_millis(),
      meta,
    };

    if let Some(before_each) = &self.hooks.events.before_each {
      let replacement =
        before_each(ctx, &self.id, msg.clone(), from).map_err(DialogueError::Validation)?;
      // Only data and meta are caller-controlled; the rest of the envelope
      // is restored if the hook touched it.
      msg.data = replacement.data;
      msg.meta = replacement.meta;
    }

    // Fan-out happens under the room lock so concurrent triggers reach each
    // receiver in commit order. Emits are non-blocking channel sends.
    let (recipient_count, handlers) = {
      let state = self.state.lock().expect("room lock poisoned");
      let frame = ServerFrame::event(&msg);
      let mut count = 0;
      for client in state.participants.values() {
        if client.is_subscribed(&self.id, event) {
          client.emit(frame.clone());
          count += 1;
        }
      }
      let handlers: Vec<EventHandler> = state
        .handlers
        .get(event)
        .map(|set| set.values().cloned().collect())
        .unwrap_or_default();
      (count, handlers)
    };

    if let Some(policy) = def.history() {
      self.store.push(&self.id, event, msg.clone(), policy.limit);
    }

    for handler in handlers {
      tokio::spawn(handler(msg.clone()));
    }

    if let Some(on_triggered) = &self.hooks.events.on_triggered {
      log_hook_failure("events.onTriggered", on_triggered(&self.id, &msg));
    }

    if let Some(after_each) = &self.hooks.events.after_each {
      after_each(ctx, &self.id, &msg, recipient_count);
    }

    Ok(recipient_count)
  }

  /// Paginated history read, newest-first.
  ///
  /// Serves from memory; when the window reaches past the in-memory buffer
  /// and an `on_load` hook is configured, the remainder is fetched from
  /// external storage and appended after the in-memory portion. Load
  /// failures degrade to the in-memory result.
  pub async fn history(&self, event_name: &str, start: usize, end: usize) -> Vec<EventMessage> {
    let in_memory = self.store.get(&self.id, event_name, start, end);
    if start >= end || in_memory.len() == end - start {
      return in_memory;
    }

    let Some(loader) = &self.hooks.events.on_load else {
      return in_memory;
    };

    let in_memory_total = self.store.count(&self.id, event_name);
    if end <= in_memory_total {
      return in_memory;
    }

    let load_start = start.max(in_memory_total) - in_memory_total;
    let load_end = end - in_memory_total;

    match loader.load(&self.id, event_name, load_start, load_end).await {
      Ok(external) => {
        let mut merged = in_memory;
        merged.extend(external);
        merged
      }
      Err(message) => {
        tracing::error!(
          "Hook failed at events.onLoad for '{}'/'{}': {}",
          self.id,
          event_name,
          message
        );
        in_memory
      }
    }
  }

  /// Merged room history for join sync, newest-first.
  pub(crate) fn history_snapshot(&self, limit: Option<usize>) -> Vec<EventMessage> {
    self.store.get_all(&self.id, limit)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::{SchemaValidator, ValidationIssue};
  use crate::registry::{ClientRegistry, RoomRegistry};
  use crate::transport::{ChannelTransport, ClientTransport};
  use serde_json::json;
  use tokio::sync::mpsc::UnboundedReceiver;

  fn context(hooks: Arc<Hooks>) -> (DialogueContext, Arc<HistoryStore>) {
    let store = Arc::new(HistoryStore::new(hooks.clone()));
    let rooms = Arc::new(RoomRegistry::new(store.clone(), hooks.clone()));
    let clients = Arc::new(ClientRegistry::new());
    (DialogueContext { rooms, clients }, store)
  }

  fn connected(
    ctx: &DialogueContext,
    hooks: &Hooks,
    user: &str,
    room: &str,
  ) -> (Arc<ConnectedClient>, UnboundedReceiver<crate::protocol::ServerFrame>) {
    let (transport, rx) = ChannelTransport::new(format!("conn-{user}"));
    let client = Arc::new(ConnectedClient::new(
      Arc::new(transport) as Arc<dyn ClientTransport>,
      user,
      None,
    ));
    ctx.clients.add(client.clone());
    client.join(ctx, hooks, room);
    (client, rx)
  }

  fn drain(rx: &mut UnboundedReceiver<crate::protocol::ServerFrame>) -> Vec<crate::protocol::ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
      frames.push(frame);
    }
    frames
  }

  #[test]
  fn trigger_rejects_disallowed_events() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    let room = ctx
      .rooms
      .register("chat", RoomConfig::new("Chat").event(EventDefinition::new("message")))
      .unwrap();

    let err = room
      .trigger(&ctx, "typing", json!({}), None, None)
      .unwrap_err();
    assert!(matches!(err, DialogueError::EventNotAllowed { .. }));
  }

  #[test]
  fn trigger_runs_the_validator() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    let def = EventDefinition::new("message").with_validator(SchemaValidator::new(|v: &Value| {
      match v.get("text").and_then(Value::as_str) {
        Some(_) => Ok(v.clone()),
        None => Err(vec![ValidationIssue::new("text", "expected a string")]),
      }
    }));
    let room = ctx
      .rooms
      .register("chat", RoomConfig::new("Chat").event(def))
      .unwrap();

    let err = room
      .trigger(&ctx, "message", json!({ "text": 7 }), None, None)
      .unwrap_err();
    assert!(matches!(err, DialogueError::Validation(_)));
    assert!(err.to_string().contains("validation failed"));
  }

  #[test]
  fn fan_out_respects_subscriptions_and_counts_recipients() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    ctx
      .rooms
      .register(
        "chat",
        RoomConfig::new("Chat")
          .event(EventDefinition::new("message"))
          .event(EventDefinition::new("typing")),
      )
      .unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "chat");
    let (b, mut rx_b) = connected(&ctx, &hooks, "bob", "chat");
    a.subscribe("chat", "message");
    b.subscribe("chat", "typing");
    drain(&mut rx_a);
    drain(&mut rx_b);

    let room = ctx.rooms.get("chat").unwrap();
    let count = room
      .trigger(&ctx, "message", json!({ "text": "hi" }), Some("alice"), None)
      .unwrap();

    assert_eq!(count, 1);
    let frames_a = drain(&mut rx_a);
    assert_eq!(frames_a.len(), 1);
    assert_eq!(frames_a[0].event, "dialogue:event");
    assert_eq!(frames_a[0].data["data"]["text"], "hi");
    assert_eq!(frames_a[0].data["from"], "alice");
    assert!(drain(&mut rx_b).is_empty());
  }

  #[test]
  fn wildcard_subscription_receives_everything() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    ctx.rooms.register("open", RoomConfig::new("Open")).unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "open");
    a.subscribe_all("open");
    drain(&mut rx_a);

    let room = ctx.rooms.get("open").unwrap();
    room.trigger(&ctx, "anything", json!(1), None, None).unwrap();
    room.trigger(&ctx, "else", json!(2), None, None).unwrap();

    let frames = drain(&mut rx_a);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].data["from"], "system");
  }

  #[test]
  fn before_each_transforms_data_for_recipients_and_history() {
    let mut hooks = Hooks::default();
    hooks.events.before_each = Some(Arc::new(|_ctx, _room, mut msg, _from| {
      if msg.data["text"].as_str().is_some_and(|t| t.contains("bad")) {
        msg.data["text"] = json!("[censored]");
      }
      Ok(msg)
    }));
    let hooks = Arc::new(hooks);
    let (ctx, store) = context(hooks.clone());
    ctx
      .rooms
      .register(
        "chat",
        RoomConfig::new("Chat").event(EventDefinition::new("message").with_history(10)),
      )
      .unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "chat");
    a.subscribe("chat", "message");
    drain(&mut rx_a);

    let room = ctx.rooms.get("chat").unwrap();
    room
      .trigger(&ctx, "message", json!({ "text": "bad word" }), Some("alice"), None)
      .unwrap();

    let frames = drain(&mut rx_a);
    assert_eq!(frames[0].data["data"]["text"], "[censored]");

    let stored = store.get("chat", "message", 0, 1);
    assert_eq!(stored[0].data["text"], "[censored]");
  }

  #[test]
  fn before_each_error_aborts_the_trigger() {
    let mut hooks = Hooks::default();
    hooks.events.before_each = Some(Arc::new(|_, _, _, _| Err("blocked".into())));
    let hooks = Arc::new(hooks);
    let (ctx, store) = context(hooks.clone());
    ctx.rooms.register("chat", RoomConfig::new("Chat")).unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "chat");
    a.subscribe_all("chat");
    drain(&mut rx_a);

    let room = ctx.rooms.get("chat").unwrap();
    let err = room.trigger(&ctx, "message", json!({}), None, None).unwrap_err();
    assert!(matches!(err, DialogueError::Validation(_)));
    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(store.count("chat", "message"), 0);
  }

  #[test]
  fn before_each_cannot_reroute_the_envelope() {
    let mut hooks = Hooks::default();
    hooks.events.before_each = Some(Arc::new(|_ctx, _room, mut msg, _from| {
      msg.event = "hijacked".into();
      msg.room_id = "elsewhere".into();
      msg.from = "mallory".into();
      msg.data = json!({ "ok": true });
      Ok(msg)
    }));
    let hooks = Arc::new(hooks);
    let (ctx, _) = context(hooks.clone());
    ctx.rooms.register("chat", RoomConfig::new("Chat")).unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "chat");
    a.subscribe("chat", "message");
    drain(&mut rx_a);

    let room = ctx.rooms.get("chat").unwrap();
    room
      .trigger(&ctx, "message", json!({}), Some("alice"), None)
      .unwrap();

    let frames = drain(&mut rx_a);
    assert_eq!(frames[0].data["event"], "message");
    assert_eq!(frames[0].data["roomId"], "chat");
    assert_eq!(frames[0].data["from"], "alice");
    assert_eq!(frames[0].data["data"]["ok"], true);
  }

  #[test]
  fn after_each_sees_final_message_and_recipient_count() {
    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut hooks = Hooks::default();
    hooks.events.after_each = Some(Arc::new(move |_ctx, _room, _msg, count| {
      sink.lock().unwrap().push(count);
    }));
    let hooks = Arc::new(hooks);
    let (ctx, _) = context(hooks.clone());
    ctx.rooms.register("chat", RoomConfig::new("Chat")).unwrap();

    let (a, mut rx_a) = connected(&ctx, &hooks, "alice", "chat");
    let (_b, _rx_b) = connected(&ctx, &hooks, "bob", "chat");
    a.subscribe("chat", "message");
    drain(&mut rx_a);

    let room = ctx.rooms.get("chat").unwrap();
    room
      .trigger(&ctx, "message", json!({ "text": "hi" }), Some("alice"), None)
      .unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &[1]);
  }

  #[tokio::test]
  async fn server_side_handlers_run_after_broadcast() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    let room = ctx.rooms.register("chat", RoomConfig::new("Chat")).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let id = room.on("message", move |msg: EventMessage| {
      let tx = tx.clone();
      async move {
        let _ = tx.send(msg.data["n"].as_i64().unwrap_or(0));
      }
    });

    room.trigger(&ctx, "message", json!({ "n": 7 }), None, None).unwrap();
    assert_eq!(rx.recv().await, Some(7));

    assert!(room.off("message", id));
    assert!(!room.off("message", id));
  }

  #[test]
  fn info_reports_capacity() {
    let hooks = Arc::new(Hooks::default());
    let (ctx, _) = context(hooks.clone());
    let room = ctx
      .rooms
      .register("lobby", RoomConfig::new("Lobby").with_max_size(2))
      .unwrap();

    let info = room.info();
    assert_eq!(info.id, "lobby");
    assert_eq!(info.size, 0);
    assert_eq!(info.max_size, Some(2));
    assert!(!room.is_full());
  }

  #[tokio::test]
  async fn history_read_falls_back_to_loader() {
    struct FixedLoader;

    #[async_trait::async_trait]
    impl crate::hooks::HistoryLoader for FixedLoader {
      async fn load(
        &self,
        _room: &str,
        _event: &str,
        start: usize,
        end: usize,
      ) -> Result<Vec<EventMessage>, String> {
        assert_eq!((start, end), (0, 2));
        Ok(vec![
          EventMessage {
            event: "message".into(),
            room_id: "chat".into(),
            data: json!({ "n": -1 }),
            from: "u".into(),
            timestamp: -1,
            meta: None,
          },
          EventMessage {
            event: "message".into(),
            room_id: "chat".into(),
            data: json!({ "n": -2 }),
            from: "u".into(),
            timestamp: -2,
            meta: None,
          },
        ])
      }
    }

    let mut hooks = Hooks::default();
    hooks.events.on_load = Some(Arc::new(FixedLoader));
    let hooks = Arc::new(hooks);
    let (ctx, store) = context(hooks.clone());
    let room = ctx
      .rooms
      .register(
        "chat",
        RoomConfig::new("Chat").event(EventDefinition::new("message").with_history(5)),
      )
      .unwrap();

    for n in 1..=5 {
      store.push(
        "chat",
        "message",
        EventMessage {
          event: "message".into(),
          room_id: "chat".into(),
          data: json!({ "n": n }),
          from: "u".into(),
          timestamp: n,
          meta: None,
        },
        5,
      );
    }

    let got = room.history("message", 0, 7).await;
    let stamps: Vec<i64> = got.iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec![5, 4, 3, 2, 1, -1, -2]);
  }

  #[tokio::test]
  async fn history_load_failure_returns_memory_only() {
    struct FailingLoader;

    #[async_trait::async_trait]
    impl crate::hooks::HistoryLoader for FailingLoader {
      async fn load(
        &self,
        _room: &str,
        _event: &str,
        _start: usize,
        _end: usize,
      ) -> Result<Vec<EventMessage>, String> {
        Err("storage offline".into())
      }
    }

    let mut hooks = Hooks::default();
    hooks.events.on_load = Some(Arc::new(FailingLoader));
    let hooks = Arc::new(hooks);
    let (ctx, store) = context(hooks.clone());
    let room = ctx.rooms.register("chat", RoomConfig::new("Chat")).unwrap();

    store.push(
      "chat",
      "message",
      EventMessage {
        event: "message".into(),
        room_id: "chat".into(),
        data: json!({}),
        from: "u".into(),
        timestamp: 1,
        meta: None,
      },
      5,
    );

    let got = room.history("message", 0, 10).await;
    assert_eq!(got.len(), 1);
  }
}
