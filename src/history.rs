//! Bounded in-memory event history, keyed by `(room, event name)`.
//!
//! Buffers store oldest-first; reads are windowed newest-first. Eviction is
//! FIFO and batches into a single `on_cleanup` call per push, invoked after
//! the store lock is released so external persistence can never stall a
//! broadcast.

use crate::hooks::{log_hook_failure, Hooks};
use crate::protocol::EventMessage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type RoomBuffers = HashMap<String, VecDeque<EventMessage>>;

pub struct HistoryStore {
  rooms: Mutex<HashMap<String, RoomBuffers>>,
  hooks: Arc<Hooks>,
}

impl HistoryStore {
  pub fn new(hooks: Arc<Hooks>) -> Self {
    Self {
      rooms: Mutex::new(HashMap::new()),
      hooks,
    }
  }

  /// Append a message, evicting from the front down to `limit`.
  ///
  /// Evicted messages are handed to `events.on_cleanup` in push order, in
  /// one batch, after the mutation commits.
  pub fn push(&self, room_id: &str, event_name: &str, msg: EventMessage, limit: usize) {
    let evicted = {
      let mut rooms = self.rooms.lock().expect("history lock poisoned");
      let buffer = rooms
        .entry(room_id.to_string())
        .or_default()
        .entry(event_name.to_string())
        .or_default();

      buffer.push_back(msg);

      let mut evicted = Vec::new();
      while buffer.len() > limit {
        if let Some(old) = buffer.pop_front() {
          evicted.push(old);
        }
      }
      evicted
    };

    if !evicted.is_empty() {
      tracing::debug!(
        "Evicted {} message(s) from history of '{}'/'{}'",
        evicted.len(),
        room_id,
        event_name
      );
      if let Some(on_cleanup) = &self.hooks.events.on_cleanup {
        log_hook_failure(
          "events.onCleanup",
          on_cleanup(room_id, event_name, evicted),
        );
      }
    }
  }

  /// Read the window `[start, end)` counted from the newest entry.
  ///
  /// Position 0 is the most recent message. Out-of-range or empty windows
  /// yield an empty vector. Never blocks on anything but the store lock.
  pub fn get(&self, room_id: &str, event_name: &str, start: usize, end: usize) -> Vec<EventMessage> {
    let rooms = self.rooms.lock().expect("history lock poisoned");
    let Some(buffer) = rooms.get(room_id).and_then(|room| room.get(event_name)) else {
      return Vec::new();
    };

    let len = buffer.len();
    if start >= end || start >= len {
      return Vec::new();
    }

    // Newest-first window positions map onto the oldest-first buffer as
    // [len - end, len - start), then reverse.
    let lo = len.saturating_sub(end);
    let hi = len - start;
    buffer
      .iter()
      .skip(lo)
      .take(hi - lo)
      .rev()
      .cloned()
      .collect()
  }

  /// Merge every event-type buffer of a room, newest-first, truncated to
  /// `limit`. Used only to sync history to a freshly joined socket.
  pub fn get_all(&self, room_id: &str, limit: Option<usize>) -> Vec<EventMessage> {
    let rooms = self.rooms.lock().expect("history lock poisoned");
    let Some(room) = rooms.get(room_id) else {
      return Vec::new();
    };

    // Per-buffer reverse order feeds the stable sort newest-first, so
    // equal timestamps within one event type keep their push order.
    let mut merged: Vec<EventMessage> = room
      .values()
      .flat_map(|buffer| buffer.iter().rev().cloned())
      .collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
      merged.truncate(limit);
    }
    merged
  }

  /// In-memory message count for one `(room, event)` buffer.
  pub fn count(&self, room_id: &str, event_name: &str) -> usize {
    let rooms = self.rooms.lock().expect("history lock poisoned");
    rooms
      .get(room_id)
      .and_then(|room| room.get(event_name))
      .map_or(0, VecDeque::len)
  }

  /// Drop every buffer of a room, emitting a final `on_cleanup` per
  /// non-empty event type.
  pub fn clear_room(&self, room_id: &str) {
    let removed = {
      let mut rooms = self.rooms.lock().expect("history lock poisoned");
      rooms.remove(room_id)
    };

    let Some(removed) = removed else { return };

    if let Some(on_cleanup) = &self.hooks.events.on_cleanup {
      for (event_name, buffer) in removed {
        if buffer.is_empty() {
          continue;
        }
        log_hook_failure(
          "events.onCleanup",
          on_cleanup(room_id, &event_name, buffer.into_iter().collect()),
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Mutex as StdMutex;

  fn msg(event: &str, n: i64) -> EventMessage {
    EventMessage {
      event: event.into(),
      room_id: "room".into(),
      data: json!({ "n": n }),
      from: "u1".into(),
      timestamp: n,
      meta: None,
    }
  }

  fn store() -> HistoryStore {
    HistoryStore::new(Arc::new(Hooks::default()))
  }

  #[test]
  fn push_then_get_returns_the_message() {
    let store = store();
    store.push("room", "message", msg("message", 1), 5);
    let got = store.get("room", "message", 0, 1);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].timestamp, 1);
  }

  #[test]
  fn get_is_newest_first() {
    let store = store();
    for n in 1..=4 {
      store.push("room", "message", msg("message", n), 10);
    }
    let got = store.get("room", "message", 0, 10);
    let stamps: Vec<i64> = got.iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec![4, 3, 2, 1]);
  }

  #[test]
  fn get_windows_from_the_newest_end() {
    let store = store();
    for n in 1..=5 {
      store.push("room", "message", msg("message", n), 10);
    }
    // Positions 1..3 newest-first skip the newest and take the next two.
    let got = store.get("room", "message", 1, 3);
    let stamps: Vec<i64> = got.iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec![4, 3]);
  }

  #[test]
  fn out_of_range_windows_are_empty() {
    let store = store();
    store.push("room", "message", msg("message", 1), 10);
    assert!(store.get("room", "message", 5, 10).is_empty());
    assert!(store.get("room", "message", 2, 2).is_empty());
    assert!(store.get("room", "missing", 0, 10).is_empty());
    assert!(store.get("nowhere", "message", 0, 10).is_empty());
  }

  #[test]
  fn eviction_keeps_limit_and_reports_batch_in_push_order() {
    let evicted: Arc<StdMutex<Vec<(String, String, Vec<EventMessage>)>>> =
      Arc::new(StdMutex::new(Vec::new()));
    let sink = evicted.clone();

    let mut hooks = Hooks::default();
    hooks.events.on_cleanup = Some(Arc::new(move |room: &str, event: &str, batch| {
      sink
        .lock()
        .unwrap()
        .push((room.to_string(), event.to_string(), batch));
      Ok(())
    }));

    let store = HistoryStore::new(Arc::new(hooks));
    for n in 1..=4 {
      store.push("room", "message", msg("message", n), 3);
    }

    let got = store.get("room", "message", 0, 10);
    let stamps: Vec<i64> = got.iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec![4, 3, 2]);

    let calls = evicted.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (room, event, batch) = &calls[0];
    assert_eq!(room, "room");
    assert_eq!(event, "message");
    assert_eq!(batch.iter().map(|m| m.timestamp).collect::<Vec<_>>(), vec![1]);
  }

  #[test]
  fn cleanup_failures_are_swallowed() {
    let mut hooks = Hooks::default();
    hooks.events.on_cleanup = Some(Arc::new(|_, _, _| Err("storage offline".into())));

    let store = HistoryStore::new(Arc::new(hooks));
    for n in 1..=3 {
      store.push("room", "message", msg("message", n), 1);
    }
    assert_eq!(store.count("room", "message"), 1);
  }

  #[test]
  fn get_all_merges_buffers_newest_first() {
    let store = store();
    store.push("room", "message", msg("message", 1), 10);
    store.push("room", "typing", msg("typing", 2), 10);
    store.push("room", "message", msg("message", 3), 10);

    let got = store.get_all("room", None);
    let stamps: Vec<i64> = got.iter().map(|m| m.timestamp).collect();
    assert_eq!(stamps, vec![3, 2, 1]);

    let limited = store.get_all("room", Some(2));
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].timestamp, 3);
  }

  #[test]
  fn clear_room_flushes_remaining_buffers() {
    let evicted: Arc<StdMutex<Vec<(String, usize)>>> = Arc::new(StdMutex::new(Vec::new()));
    let sink = evicted.clone();

    let mut hooks = Hooks::default();
    hooks.events.on_cleanup = Some(Arc::new(move |_room: &str, event: &str, batch| {
      sink.lock().unwrap().push((event.to_string(), batch.len()));
      Ok(())
    }));

    let store = HistoryStore::new(Arc::new(hooks));
    store.push("room", "message", msg("message", 1), 10);
    store.push("room", "message", msg("message", 2), 10);
    store.clear_room("room");

    assert_eq!(store.count("room", "message"), 0);
    let calls = evicted.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("message".to_string(), 2)]);
  }
}
