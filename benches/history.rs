use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dialogue::{EventMessage, HistoryStore, Hooks};
use serde_json::json;
use std::sync::Arc;

fn message(n: i64) -> EventMessage {
  EventMessage {
    event: "message".into(),
    room_id: "chat".into(),
    data: json!({ "n": n }),
    from: "bench".into(),
    timestamp: n,
    meta: None,
  }
}

fn filled_store(len: i64, limit: usize) -> HistoryStore {
  let store = HistoryStore::new(Arc::new(Hooks::default()));
  for n in 0..len {
    store.push("chat", "message", message(n), limit);
  }
  store
}

fn push_with_eviction(c: &mut Criterion) {
  let mut group = c.benchmark_group("history_push");

  for limit in [100usize, 1000] {
    let store = filled_store(limit as i64, limit);
    group.bench_function(BenchmarkId::new("push_at_limit", limit), |b| {
      let mut n = limit as i64;
      b.iter(|| {
        n += 1;
        store.push("chat", "message", message(n), limit);
      });
    });
  }

  group.finish();
}

fn windowed_reads(c: &mut Criterion) {
  let mut group = c.benchmark_group("history_get");
  let store = filled_store(1000, 1000);

  group.bench_function("newest_50", |b| {
    b.iter(|| {
      black_box(store.get("chat", "message", 0, 50));
    });
  });

  group.bench_function("middle_50", |b| {
    b.iter(|| {
      black_box(store.get("chat", "message", 475, 525));
    });
  });

  group.bench_function("get_all_capped", |b| {
    b.iter(|| {
      black_box(store.get_all("chat", Some(50)));
    });
  });

  group.finish();
}

criterion_group!(benches, push_with_eviction, windowed_reads);
criterion_main!(benches);
