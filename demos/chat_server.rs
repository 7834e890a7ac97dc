//! Chat server demo: JWT-authenticated rooms with validated, censored,
//! history-backed messages.
//!
//! Run with `cargo run --example chat_server`, then connect a WebSocket
//! client to the printed URL and send frames like:
//!
//! ```json
//! {"event":"dialogue:join","data":{"roomId":"lobby"}}
//! {"event":"dialogue:trigger","data":{"roomId":"lobby","event":"message","data":{"text":"hi"}}}
//! ```

use dialogue::{
  Dialogue, DialogueServer, EventDefinition, JwtAuthenticator, RoomConfig, SchemaValidator,
  SyncHistory, ValidationIssue,
};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,dialogue=debug".into()),
    )
    .init();

  let auth = JwtAuthenticator::new("chat-demo-secret");
  let token = auth.sign("demo-user".into(), 3600)?;
  tracing::info!("Connect with: ws://localhost:8080/ws?token={}", token);

  let message_validator = SchemaValidator::new(|value: &Value| {
    match value.get("text").and_then(Value::as_str) {
      Some(text) if !text.trim().is_empty() => Ok(value.clone()),
      Some(_) => Err(vec![ValidationIssue::new("text", "must not be empty")]),
      None => Err(vec![ValidationIssue::new("text", "expected a string")]),
    }
  });

  let engine = Dialogue::builder()
    .room(
      "lobby",
      RoomConfig::new("Lobby")
        .with_description("Open chat for everyone")
        .with_max_size(64)
        .event(
          EventDefinition::new("message")
            .with_validator(message_validator)
            .with_history(100),
        )
        .event(EventDefinition::new("typing"))
        .default_subscription("message")
        .sync_history_on_join(SyncHistory::Limit(50)),
    )
    .authenticate_with_jwt(auth)
    .before_each(|_ctx, _room_id, mut msg, _from| {
      if let Some(text) = msg.data.get("text").and_then(Value::as_str) {
        if text.contains("bad") {
          msg.data["text"] = json!("[censored]");
        }
      }
      Ok(msg)
    })
    .on_joined(|_ctx, client, room_id| {
      tracing::info!("{} joined {}", client.user_id(), room_id);
      Ok(())
    })
    .on_cleanup(|room_id, event_name, evicted| {
      tracing::info!(
        "{} old '{}' message(s) rotated out of {}",
        evicted.len(),
        event_name,
        room_id
      );
      Ok(())
    })
    .build()?;

  // Server-side observer for moderation tooling.
  let lobby = engine.rooms().get("lobby").expect("lobby is statically configured");
  lobby.on("message", |msg| async move {
    tracing::debug!("message from {}: {}", msg.from, msg.data);
  });

  DialogueServer::new(engine).listen("0.0.0.0:8080").await
}
