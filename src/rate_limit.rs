//! Fixed-window rate limiting for history requests.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Limiter tuning. The defaults cover history reads: 20 requests per
/// connection per minute.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
  /// Maximum requests per window.
  pub max_requests: u32,
  /// Window length.
  pub window: Duration,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      max_requests: 20,
      window: Duration::from_secs(60),
    }
  }
}

#[derive(Debug)]
struct WindowState {
  count: u32,
  reset_at: Instant,
}

/// Keyed fixed-window counter.
///
/// Each key holds a count and a reset deadline; expired entries behave as
/// fresh ones and are additionally swept in the background so idle keys do
/// not accumulate.
pub struct RateLimiter {
  config: RateLimitConfig,
  states: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl RateLimiter {
  pub fn new(config: RateLimitConfig) -> Self {
    Self {
      config,
      states: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  /// Count one request against `key`. Returns false once the window's
  /// budget is spent.
  pub async fn is_allowed(&self, key: &str) -> bool {
    let now = Instant::now();
    let mut states = self.states.write().await;

    match states.get_mut(key) {
      None => {
        states.insert(
          key.to_string(),
          WindowState {
            count: 1,
            reset_at: now + self.config.window,
          },
        );
        true
      }
      Some(state) if now >= state.reset_at => {
        state.count = 1;
        state.reset_at = now + self.config.window;
        true
      }
      Some(state) if state.count >= self.config.max_requests => {
        tracing::warn!("Rate limit exceeded for {}", key);
        false
      }
      Some(state) => {
        state.count += 1;
        true
      }
    }
  }

  /// Requests left in the current window, without consuming one.
  pub async fn remaining(&self, key: &str) -> u32 {
    let now = Instant::now();
    let mut states = self.states.write().await;

    match states.get_mut(key) {
      None => self.config.max_requests,
      Some(state) if now >= state.reset_at => {
        state.count = 0;
        state.reset_at = now + self.config.window;
        self.config.max_requests
      }
      Some(state) => self.config.max_requests.saturating_sub(state.count),
    }
  }

  /// Drop a key's window, e.g. when its connection goes away.
  pub async fn forget(&self, key: &str) {
    self.states.write().await.remove(key);
  }

  /// Spawn the background sweep that purges expired windows. The task is
  /// detached and never blocks normal operation; abort the returned handle
  /// to stop it early.
  pub fn start_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
    let states = self.states.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      loop {
        ticker.tick().await;
        let now = Instant::now();
        let mut states = states.write().await;
        let before = states.len();
        states.retain(|_, state| now < state.reset_at);
        let swept = before - states.len();
        if swept > 0 {
          tracing::debug!("Swept {} expired rate-limit window(s)", swept);
        }
      }
    })
  }
}

impl Clone for RateLimiter {
  fn clone(&self) -> Self {
    Self {
      config: self.config.clone(),
      states: self.states.clone(),
    }
  }
}
