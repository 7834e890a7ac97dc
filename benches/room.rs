use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dialogue::{ChannelTransport, ClientTransport, Dialogue, Dispatcher, EventDefinition, RoomConfig};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// A dispatcher with `subscribers` clients joined to "chat" and subscribed
/// to everything. Receivers are dropped so emits hit the dead-transport
/// path instead of accumulating frames.
fn setup(subscribers: usize) -> Dispatcher {
  let rt = Runtime::new().unwrap();
  let dialogue = Dialogue::builder()
    .room(
      "chat",
      RoomConfig::new("Chat")
        .event(EventDefinition::new("message"))
        .subscribe_all_on_join(),
    )
    .build()
    .unwrap();
  let dispatcher = Dispatcher::new(Arc::new(dialogue));

  rt.block_on(async {
    for i in 0..subscribers {
      let (transport, _rx) = ChannelTransport::new(format!("conn-{i}"));
      let session = dispatcher.connect(
        Arc::new(transport) as Arc<dyn ClientTransport>,
        json!({ "userId": format!("user-{i}") }),
      );
      dispatcher
        .handle(&session, r#"{"event":"dialogue:join","data":{"roomId":"chat"}}"#)
        .await;
    }
  });
  dispatcher
}

fn trigger_fanout(c: &mut Criterion) {
  let mut group = c.benchmark_group("room_trigger");

  for subscribers in [1usize, 10, 100] {
    let dispatcher = setup(subscribers);
    group.bench_function(BenchmarkId::new("fan_out", subscribers), |b| {
      b.iter(|| {
        black_box(
          dispatcher
            .dialogue()
            .trigger("chat", "message", json!({ "text": "hello" }))
            .unwrap(),
        );
      });
    });
  }

  group.finish();
}

fn trigger_rejections(c: &mut Criterion) {
  let mut group = c.benchmark_group("room_trigger_rejections");
  let dispatcher = setup(10);

  group.bench_function("disallowed_event", |b| {
    b.iter(|| {
      black_box(
        dispatcher
          .dialogue()
          .trigger("chat", "forbidden", json!({}))
          .unwrap_err(),
      );
    });
  });

  group.bench_function("missing_room", |b| {
    b.iter(|| {
      black_box(
        dispatcher
          .dialogue()
          .trigger("nowhere", "message", json!({}))
          .unwrap_err(),
      );
    });
  });

  group.finish();
}

fn join_churn(c: &mut Criterion) {
  let mut group = c.benchmark_group("room_join_churn");
  let rt = Runtime::new().unwrap();
  let dispatcher = setup(0);

  group.bench_function("join_then_leave", |b| {
    b.to_async(&rt).iter(|| async {
      let (transport, _rx) = ChannelTransport::new("bench-conn");
      let session = dispatcher.connect(
        Arc::new(transport) as Arc<dyn ClientTransport>,
        json!({ "userId": "bench-user" }),
      );
      dispatcher
        .handle(&session, r#"{"event":"dialogue:join","data":{"roomId":"chat"}}"#)
        .await;
      dispatcher
        .handle(&session, r#"{"event":"dialogue:leave","data":{"roomId":"chat"}}"#)
        .await;
      dispatcher.disconnect(&session);
    });
  });

  group.finish();
}

criterion_group!(benches, trigger_fanout, trigger_rejections, join_churn);
criterion_main!(benches);
