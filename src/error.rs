use crate::protocol::ErrorCode;
use thiserror::Error;

/// Fatal configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Duplicate room id '{0}' in static configuration")]
  DuplicateRoomId(String),

  #[error("Room '{room}' declares an invalid maxSize of {value}; must be at least 1")]
  InvalidMaxSize { room: String, value: usize },

  #[error("Event '{event}' in room '{room}' declares an invalid history limit of {value}; must be at least 1")]
  InvalidHistoryLimit {
    room: String,
    event: String,
    value: usize,
  },
}

/// Expected-failure paths of the routing core.
///
/// Every variant maps onto a wire [`ErrorCode`]; errors raised synchronously
/// by a trigger are returned to the direct caller, while failures inside
/// fire-and-forget hooks are logged and never surface here.
#[derive(Debug, Error)]
pub enum DialogueError {
  #[error("Room '{0}' not found")]
  RoomNotFound(String),

  #[error("Room '{0}' already exists")]
  RoomExists(String),

  #[error("Room '{0}' is full")]
  RoomFull(String),

  #[error("{0}")]
  JoinDenied(String),

  #[error("Event '{event}' is not allowed in room '{room}'")]
  EventNotAllowed { event: String, room: String },

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  PermissionDenied(String),

  #[error("{0}")]
  InvalidRequest(String),

  #[error("Rate limit exceeded for history requests")]
  RateLimited,
}

impl DialogueError {
  /// The wire code sent back to the offending client.
  pub fn error_code(&self) -> ErrorCode {
    match self {
      Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
      Self::RoomExists(_) => ErrorCode::RoomExists,
      Self::RoomFull(_) => ErrorCode::RoomFull,
      Self::JoinDenied(_) => ErrorCode::JoinDenied,
      Self::EventNotAllowed { .. } => ErrorCode::EventNotAllowed,
      Self::Validation(_) => ErrorCode::ValidationFailed,
      Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
      Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
      Self::RateLimited => ErrorCode::RateLimited,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_error_maps_to_a_wire_code() {
    assert_eq!(
      DialogueError::RoomNotFound("x".into()).error_code(),
      ErrorCode::RoomNotFound
    );
    assert_eq!(
      DialogueError::EventNotAllowed {
        event: "e".into(),
        room: "r".into()
      }
      .error_code(),
      ErrorCode::EventNotAllowed
    );
    assert_eq!(DialogueError::RateLimited.error_code(), ErrorCode::RateLimited);
  }

  #[test]
  fn not_allowed_message_names_event_and_room() {
    let err = DialogueError::EventNotAllowed {
      event: "typing".into(),
      room: "lobby".into(),
    };
    assert_eq!(err.to_string(), "Event 'typing' is not allowed in room 'lobby'");
  }
}
