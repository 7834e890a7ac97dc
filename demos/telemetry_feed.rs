//! Server-originated events: a background sampler publishes into a room
//! that browser dashboards join and watch.
//!
//! Run with `cargo run --example telemetry_feed`, then connect to
//! `ws://localhost:8081/ws?userId=dashboard` and join the `metrics` room.

use dialogue::{Dialogue, DialogueServer, EventDefinition, RoomConfig, SyncHistory};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into()),
    )
    .init();

  let engine = Dialogue::builder()
    .room(
      "metrics",
      RoomConfig::new("Metrics")
        .with_description("One sample per second, last minute synced on join")
        .event(EventDefinition::new("sample").with_history(300))
        .subscribe_all_on_join()
        .sync_history_on_join(SyncHistory::Limit(60)),
    )
    .build()?;

  let server = DialogueServer::new(engine);

  let publisher = server.dispatcher().dialogue().clone();
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut seq = 0u64;
    loop {
      ticker.tick().await;
      seq += 1;
      let sample = json!({
        "seq": seq,
        "connections": publisher.clients().count(),
        "rooms": publisher.room_infos().len(),
      });
      if let Err(e) = publisher.trigger("metrics", "sample", sample) {
        tracing::error!("Failed to publish sample: {}", e);
      }
    }
  });

  server.listen("0.0.0.0:8081").await
}
