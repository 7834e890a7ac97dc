//! Server-level configuration: statically declared rooms and tuning knobs.

use crate::error::ConfigError;
use crate::rate_limit::RateLimitConfig;
use crate::room::RoomConfig;

/// Configuration validated once at startup.
#[derive(Clone, Default)]
pub struct DialogueConfig {
  /// Rooms that exist from startup, keyed by id. They have no creator and
  /// cannot be deleted by clients.
  pub rooms: Vec<(String, RoomConfig)>,
  /// Reject dynamically created rooms, which always carry an empty
  /// (wildcard) allow-list. Off by default.
  pub forbid_wildcard_rooms: bool,
  /// Limiter applied to `getHistory` requests, per connection.
  pub history_rate_limit: RateLimitConfig,
}

impl DialogueConfig {
  /// Check the static room set for fatal mistakes: duplicate ids, zero
  /// capacities, zero history limits.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for (id, config) in &self.rooms {
      if !seen.insert(id.as_str()) {
        return Err(ConfigError::DuplicateRoomId(id.clone()));
      }
      if config.max_size == Some(0) {
        return Err(ConfigError::InvalidMaxSize {
          room: id.clone(),
          value: 0,
        });
      }
      for def in &config.events {
        if let Some(policy) = def.history() {
          if policy.limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit {
              room: id.clone(),
              event: def.name().to_string(),
              value: 0,
            });
          }
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::EventDefinition;

  #[test]
  fn empty_config_is_valid() {
    assert!(DialogueConfig::default().validate().is_ok());
  }

  #[test]
  fn duplicate_room_ids_are_fatal() {
    let config = DialogueConfig {
      rooms: vec![
        ("lobby".into(), RoomConfig::new("Lobby")),
        ("lobby".into(), RoomConfig::new("Other")),
      ],
      ..Default::default()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::DuplicateRoomId(_))
    ));
  }

  #[test]
  fn zero_max_size_is_fatal() {
    let config = DialogueConfig {
      rooms: vec![("lobby".into(), RoomConfig::new("Lobby").with_max_size(0))],
      ..Default::default()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::InvalidMaxSize { .. })
    ));
  }

  #[test]
  fn zero_history_limit_is_fatal() {
    let config = DialogueConfig {
      rooms: vec![(
        "chat".into(),
        RoomConfig::new("Chat").event(EventDefinition::new("message").with_history(0)),
      )],
      ..Default::default()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::InvalidHistoryLimit { .. })
    ));
  }
}
