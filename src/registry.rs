//! Registries: rooms by id, clients by connection id, and the
//! user-id → connection-ids reverse index for multi-connection users.

use crate::client::ConnectedClient;
use crate::error::DialogueError;
use crate::history::HistoryStore;
use crate::hooks::{log_hook_failure, Hooks};
use crate::protocol::ServerFrame;
use crate::room::{Room, RoomConfig, RoomInfo};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Owns every room and mediates participant membership.
pub struct RoomRegistry {
  rooms: RwLock<HashMap<String, Arc<Room>>>,
  store: Arc<HistoryStore>,
  hooks: Arc<Hooks>,
}

impl RoomRegistry {
  pub(crate) fn new(store: Arc<HistoryStore>, hooks: Arc<Hooks>) -> Self {
    Self {
      rooms: RwLock::new(HashMap::new()),
      store,
      hooks,
    }
  }

  /// Create a room. Fails when the id is taken.
  pub fn register(
    &self,
    id: impl Into<String>,
    config: RoomConfig,
  ) -> Result<Arc<Room>, DialogueError> {
    let id = id.into();
    let room = {
      let mut rooms = self.rooms.write().expect("room registry lock poisoned");
      if rooms.contains_key(&id) {
        return Err(DialogueError::RoomExists(id));
      }
      let room = Arc::new(Room::new(
        id.clone(),
        config,
        self.store.clone(),
        self.hooks.clone(),
      ));
      rooms.insert(id.clone(), room.clone());
      room
    };

    tracing::info!("Room '{}' registered", id);
    if let Some(on_created) = &self.hooks.rooms.on_created {
      log_hook_failure("rooms.onCreated", on_created(&room.info()));
    }
    Ok(room)
  }

  pub fn get(&self, id: &str) -> Option<Arc<Room>> {
    self
      .rooms
      .read()
      .expect("room registry lock poisoned")
      .get(id)
      .cloned()
  }

  pub fn all(&self) -> Vec<Arc<Room>> {
    self
      .rooms
      .read()
      .expect("room registry lock poisoned")
      .values()
      .cloned()
      .collect()
  }

  pub fn infos(&self) -> Vec<RoomInfo> {
    self.all().iter().map(|room| room.info()).collect()
  }

  /// Add a client to a room's participant map. Returns false when the room
  /// is absent or full. On success the client's transport joins the
  /// room-keyed group used for bulk notifications.
  pub fn add_participant(&self, room_id: &str, client: Arc<ConnectedClient>) -> bool {
    let Some(room) = self.get(room_id) else {
      return false;
    };
    if !room.insert_participant(client.clone()) {
      return false;
    }
    client.transport().join_group(room_id);
    true
  }

  pub fn remove_participant(&self, room_id: &str, connection_id: &str) {
    let Some(room) = self.get(room_id) else {
      return;
    };
    if let Some(client) = room.remove_participant(connection_id) {
      client.transport().leave_group(room_id);
    }
  }

  /// Remove a connection from every room it participates in.
  pub fn remove_from_all_rooms(&self, connection_id: &str) {
    for room in self.all() {
      if let Some(client) = room.remove_participant(connection_id) {
        client.transport().leave_group(room.id());
      }
    }
  }

  /// Delete a room: evict every participant, clear its history, notify the
  /// former participants, and fire `rooms.onDeleted`. Returns false when
  /// the room did not exist.
  pub fn unregister(&self, id: &str) -> bool {
    let room = {
      let mut rooms = self.rooms.write().expect("room registry lock poisoned");
      rooms.remove(id)
    };
    let Some(room) = room else {
      return false;
    };

    let info = room.info();
    let evicted = room.drain_participants();
    for client in &evicted {
      client.transport().leave_group(id);
      client.clear_room_state(id);
    }

    self.store.clear_room(id);

    let frame = ServerFrame::room_deleted(id);
    for client in &evicted {
      client.emit(frame.clone());
    }

    tracing::info!("Room '{}' deleted, {} participant(s) evicted", id, evicted.len());
    if let Some(on_deleted) = &self.hooks.rooms.on_deleted {
      log_hook_failure("rooms.onDeleted", on_deleted(&info));
    }
    true
  }
}

/// Connection-id → client map plus the user-id reverse index.
///
/// A user with several tabs or devices holds several connections; the
/// reverse index aggregates them. Both maps are mutated together on connect
/// and disconnect and stale reverse entries are skipped on read.
pub struct ClientRegistry {
  clients: RwLock<HashMap<String, Arc<ConnectedClient>>>,
  by_user: RwLock<HashMap<String, HashSet<String>>>,
}

impl ClientRegistry {
  pub(crate) fn new() -> Self {
    Self {
      clients: RwLock::new(HashMap::new()),
      by_user: RwLock::new(HashMap::new()),
    }
  }

  pub fn add(&self, client: Arc<ConnectedClient>) {
    let connection_id = client.connection_id().to_string();
    let user_id = client.user_id().to_string();

    self
      .clients
      .write()
      .expect("client registry lock poisoned")
      .insert(connection_id.clone(), client);
    self
      .by_user
      .write()
      .expect("client registry lock poisoned")
      .entry(user_id)
      .or_default()
      .insert(connection_id);
  }

  pub fn remove(&self, connection_id: &str) -> Option<Arc<ConnectedClient>> {
    let removed = self
      .clients
      .write()
      .expect("client registry lock poisoned")
      .remove(connection_id)?;

    let mut by_user = self.by_user.write().expect("client registry lock poisoned");
    if let Some(connections) = by_user.get_mut(removed.user_id()) {
      connections.remove(connection_id);
      if connections.is_empty() {
        by_user.remove(removed.user_id());
      }
    }
    Some(removed)
  }

  pub fn get(&self, connection_id: &str) -> Option<Arc<ConnectedClient>> {
    self
      .clients
      .read()
      .expect("client registry lock poisoned")
      .get(connection_id)
      .cloned()
  }

  pub fn all(&self) -> Vec<Arc<ConnectedClient>> {
    self
      .clients
      .read()
      .expect("client registry lock poisoned")
      .values()
      .cloned()
      .collect()
  }

  pub fn count(&self) -> usize {
    self
      .clients
      .read()
      .expect("client registry lock poisoned")
      .len()
  }

  /// Every live connection of a user. Reverse-index entries with no
  /// matching forward entry are skipped.
  pub fn clients_by_user_id(&self, user_id: &str) -> Vec<Arc<ConnectedClient>> {
    let ids: Vec<String> = {
      let by_user = self.by_user.read().expect("client registry lock poisoned");
      by_user
        .get(user_id)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
    };

    let clients = self.clients.read().expect("client registry lock poisoned");
    ids
      .iter()
      .filter_map(|id| clients.get(id).cloned())
      .collect()
  }

  /// Union of joined rooms across every connection of a user.
  pub fn client_rooms(&self, user_id: &str) -> Vec<String> {
    let mut rooms: HashSet<String> = HashSet::new();
    for client in self.clients_by_user_id(user_id) {
      rooms.extend(client.joined_rooms());
    }
    rooms.into_iter().collect()
  }

  /// True when any connection of this user has joined the room.
  pub fn is_in_room(&self, user_id: &str, room_id: &str) -> bool {
    self
      .clients_by_user_id(user_id)
      .iter()
      .any(|client| client.has_joined(room_id))
  }

  /// Force every connection of a user out of every room it joined. The
  /// callback, when given, observes each room id before the mutation.
  pub fn leave_all(
    &self,
    rooms: &RoomRegistry,
    user_id: &str,
    mut callback: Option<&mut dyn FnMut(&str)>,
  ) {
    for client in self.clients_by_user_id(user_id) {
      for room_id in client.joined_rooms() {
        if let Some(cb) = callback.as_mut() {
          cb(&room_id);
        }
        rooms.remove_participant(&room_id, client.connection_id());
        client.clear_room_state(&room_id);
        client.emit(ServerFrame::left(&room_id));
      }
    }
  }
}
