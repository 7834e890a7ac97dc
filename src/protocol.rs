//! Wire protocol: the `dialogue:*` frame envelope exchanged with clients.
//!
//! Every frame is a JSON object `{ "event": <name>, "data": <payload> }`
//! carried over a bidirectional transport. Server-to-client frames are built
//! through the [`ServerFrame`] constructors; client-to-server verbs decode
//! into the payload structs below.

use crate::room::RoomInfo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Frame names used on the wire.
pub mod frames {
  pub const CONNECTED: &str = "dialogue:connected";
  pub const JOINED: &str = "dialogue:joined";
  pub const LEFT: &str = "dialogue:left";
  pub const EVENT: &str = "dialogue:event";
  pub const HISTORY: &str = "dialogue:history";
  pub const HISTORY_RESPONSE: &str = "dialogue:historyResponse";
  pub const ROOMS: &str = "dialogue:rooms";
  pub const ROOM_CREATED: &str = "dialogue:roomCreated";
  pub const ROOM_DELETED: &str = "dialogue:roomDeleted";
  pub const ERROR: &str = "dialogue:error";

  pub const JOIN: &str = "dialogue:join";
  pub const LEAVE: &str = "dialogue:leave";
  pub const SUBSCRIBE: &str = "dialogue:subscribe";
  pub const SUBSCRIBE_ALL: &str = "dialogue:subscribeAll";
  pub const UNSUBSCRIBE: &str = "dialogue:unsubscribe";
  pub const TRIGGER: &str = "dialogue:trigger";
  pub const GET_HISTORY: &str = "dialogue:getHistory";
  pub const LIST_ROOMS: &str = "dialogue:listRooms";
  pub const CREATE_ROOM: &str = "dialogue:createRoom";
  pub const DELETE_ROOM: &str = "dialogue:deleteRoom";
}

/// The event envelope broadcast to room participants and stored in history.
///
/// The five required fields are a fixed contract; only `data` and `meta` are
/// caller-defined. `from` is `"system"` for server-originated events and
/// `timestamp` is the server wall clock in milliseconds at broadcast time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
  pub event: String,
  pub room_id: String,
  pub data: Value,
  pub from: String,
  pub timestamp: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub meta: Option<Map<String, Value>>,
}

/// Sender used for events emitted by the server itself.
pub const SYSTEM_SENDER: &str = "system";

/// Wire error codes surfaced through `dialogue:error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  RoomNotFound,
  RoomExists,
  RoomFull,
  JoinDenied,
  EventNotAllowed,
  ValidationFailed,
  PermissionDenied,
  InvalidRequest,
  RateLimited,
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::RoomNotFound => "ROOM_NOT_FOUND",
      Self::RoomExists => "ROOM_EXISTS",
      Self::RoomFull => "ROOM_FULL",
      Self::JoinDenied => "JOIN_DENIED",
      Self::EventNotAllowed => "EVENT_NOT_ALLOWED",
      Self::ValidationFailed => "VALIDATION_FAILED",
      Self::PermissionDenied => "PERMISSION_DENIED",
      Self::InvalidRequest => "INVALID_REQUEST",
      Self::RateLimited => "RATE_LIMITED",
    }
  }
}

impl std::fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A server-to-client frame, ready for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
  pub event: String,
  pub data: Value,
}

impl ServerFrame {
  pub fn connected(client_id: &str, user_id: &str) -> Self {
    Self {
      event: frames::CONNECTED.into(),
      data: json!({ "clientId": client_id, "userId": user_id }),
    }
  }

  pub fn joined(room_id: &str, room_name: &str) -> Self {
    Self {
      event: frames::JOINED.into(),
      data: json!({ "roomId": room_id, "roomName": room_name }),
    }
  }

  pub fn left(room_id: &str) -> Self {
    Self {
      event: frames::LEFT.into(),
      data: json!({ "roomId": room_id }),
    }
  }

  pub fn event(message: &EventMessage) -> Self {
    Self {
      event: frames::EVENT.into(),
      data: serde_json::to_value(message).unwrap_or(Value::Null),
    }
  }

  /// History pushed to a socket right after it joins a room, newest-first.
  pub fn history(room_id: &str, events: &[EventMessage]) -> Self {
    Self {
      event: frames::HISTORY.into(),
      data: json!({ "roomId": room_id, "events": events }),
    }
  }

  pub fn history_response(
    room_id: &str,
    event_name: Option<&str>,
    events: &[EventMessage],
    start: usize,
    end: usize,
  ) -> Self {
    Self {
      event: frames::HISTORY_RESPONSE.into(),
      data: json!({
        "roomId": room_id,
        "eventName": event_name,
        "events": events,
        "start": start,
        "end": end,
      }),
    }
  }

  pub fn rooms(rooms: &[RoomInfo]) -> Self {
    Self {
      event: frames::ROOMS.into(),
      data: serde_json::to_value(rooms).unwrap_or(Value::Null),
    }
  }

  pub fn room_created(info: &RoomInfo) -> Self {
    Self {
      event: frames::ROOM_CREATED.into(),
      data: serde_json::to_value(info).unwrap_or(Value::Null),
    }
  }

  pub fn room_deleted(room_id: &str) -> Self {
    Self {
      event: frames::ROOM_DELETED.into(),
      data: json!({ "roomId": room_id }),
    }
  }

  pub fn error(code: ErrorCode, message: &str) -> Self {
    Self {
      event: frames::ERROR.into(),
      data: json!({ "code": code, "message": message }),
    }
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

/// An inbound frame before its payload has been matched to a verb.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
  pub event: String,
  #[serde(default)]
  pub data: Value,
}

impl RawFrame {
  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }
}

// Client verb payloads. Unknown or malformed payloads are dropped by the
// dispatcher, except `getHistory` and `createRoom` which answer with
// INVALID_REQUEST.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
  pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavePayload {
  pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
  pub room_id: String,
  pub event_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeAllPayload {
  pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
  pub room_id: String,
  pub event: String,
  #[serde(default)]
  pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryPayload {
  pub room_id: String,
  #[serde(default)]
  pub event_name: Option<String>,
  #[serde(default)]
  pub start: Option<usize>,
  #[serde(default)]
  pub end: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub max_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoomPayload {
  pub room_id: String,
}
