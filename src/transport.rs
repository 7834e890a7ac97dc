//! Transport obligations: the seam between the routing core and whatever
//! socket layer carries the frames.
//!
//! The core requires exactly four things from a connection: a stable id,
//! a non-blocking `emit`, room-group membership for bulk notifications, and
//! `close`. [`ChannelTransport`] is the canonical implementation, backed by
//! an unbounded Tokio channel whose receiving half is pumped into the real
//! socket (or into a test harness).

use crate::protocol::ServerFrame;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Obligations of one bidirectional connection.
///
/// `emit` must never block and must silently discard frames once the peer
/// is gone; in-flight fan-out to a disconnecting client is allowed to land
/// on a dead transport.
pub trait ClientTransport: Send + Sync {
  /// Process-unique connection id.
  fn connection_id(&self) -> &str;

  /// Queue a frame for delivery. Best-effort, non-blocking.
  fn emit(&self, frame: ServerFrame);

  /// Enter the transport-level group for a room. Used by the registry for
  /// bulk notifications only.
  fn join_group(&self, room_id: &str);

  fn leave_group(&self, room_id: &str);

  /// Tear the connection down. Idempotent.
  fn close(&self);
}

/// Channel-backed [`ClientTransport`].
///
/// Frames go into an unbounded sender. `close` drops the sender, which ends
/// the receiving pump; a dropped receiver makes every later emit a silent
/// no-op, which is exactly the dead-socket behavior the core expects.
pub struct ChannelTransport {
  connection_id: String,
  tx: Mutex<Option<mpsc::UnboundedSender<ServerFrame>>>,
  groups: Mutex<HashSet<String>>,
}

impl ChannelTransport {
  /// Create a transport and the receiving half a socket pump (or a test)
  /// should drain. The pump ends when the transport is closed.
  pub fn new(connection_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ServerFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
      Self {
        connection_id: connection_id.into(),
        tx: Mutex::new(Some(tx)),
        groups: Mutex::new(HashSet::new()),
      },
      rx,
    )
  }

  /// Room groups this connection currently belongs to.
  pub fn groups(&self) -> Vec<String> {
    self
      .groups
      .lock()
      .expect("transport group lock poisoned")
      .iter()
      .cloned()
      .collect()
  }
}

impl ClientTransport for ChannelTransport {
  fn connection_id(&self) -> &str {
    &self.connection_id
  }

  fn emit(&self, frame: ServerFrame) {
    // Dead or closed receivers drop the frame; delivery is best-effort.
    if let Some(tx) = self.tx.lock().expect("transport sender lock poisoned").as_ref() {
      let _ = tx.send(frame);
    }
  }

  fn join_group(&self, room_id: &str) {
    self
      .groups
      .lock()
      .expect("transport group lock poisoned")
      .insert(room_id.to_string());
  }

  fn leave_group(&self, room_id: &str) {
    self
      .groups
      .lock()
      .expect("transport group lock poisoned")
      .remove(room_id);
  }

  fn close(&self) {
    self.tx.lock().expect("transport sender lock poisoned").take();
  }
}
