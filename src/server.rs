//! WebSocket entry point: wires the dispatcher to an axum `/ws` route.
//!
//! The handshake's auth object is taken from the upgrade request's query
//! parameters, so `ws://host/ws?token=...` or `ws://host/ws?userId=...`
//! both work with the default extraction rules.

use crate::client::ConnectionState;
use crate::dialogue::Dialogue;
use crate::dispatch::{Dispatcher, Session};
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, WebSocketUpgrade,
  },
  response::IntoResponse,
  routing::get,
  Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};
use crate::transport::{ChannelTransport, ClientTransport};

/// How often expired rate-limit windows are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Serves a [`Dialogue`] engine over WebSocket.
pub struct DialogueServer {
  dispatcher: Arc<Dispatcher>,
}

impl DialogueServer {
  pub fn new(dialogue: Dialogue) -> Self {
    Self {
      dispatcher: Arc::new(Dispatcher::new(Arc::new(dialogue))),
    }
  }

  pub fn dispatcher(&self) -> &Arc<Dispatcher> {
    &self.dispatcher
  }

  /// The `/ws` router, for embedding into a larger axum app.
  pub fn router(&self) -> Router {
    let dispatcher = self.dispatcher.clone();
    Router::new().route(
      "/ws",
      get(
        move |ws: WebSocketUpgrade, Query(params): Query<HashMap<String, String>>| {
          let dispatcher = dispatcher.clone();
          async move { ws.on_upgrade(move |socket| handle_ws(dispatcher, socket, params)).into_response() }
        },
      ),
    )
  }

  /// Bind and serve until the process exits.
  pub async fn listen(self, addr: &str) -> anyhow::Result<()> {
    let sweeper = self
      .dispatcher
      .dialogue()
      .limiter()
      .start_sweeper(SWEEP_INTERVAL);

    let app = self.router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Dialogue server listening on {}", addr);
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
  }
}

/// The handshake auth object, assembled from the upgrade query parameters.
fn auth_from_params(params: HashMap<String, String>) -> Value {
  Value::Object(
    params
      .into_iter()
      .map(|(key, value)| (key, Value::String(value)))
      .collect(),
  )
}

/// Drive one WebSocket connection through the dispatcher.
async fn handle_ws(dispatcher: Arc<Dispatcher>, ws: WebSocket, params: HashMap<String, String>) {
  let connection_id = uuid::Uuid::new_v4().to_string();
  let (transport, mut outbound) = ChannelTransport::new(connection_id);
  let transport: Arc<dyn ClientTransport> = Arc::new(transport);

  let session = dispatcher.connect(transport, auth_from_params(params));

  let (mut ws_sink, mut ws_stream) = ws.split();

  // Pump queued frames into the socket until the transport closes.
  let send_task = tokio::spawn(async move {
    while let Some(frame) = outbound.recv().await {
      match frame.to_json() {
        Ok(json) => {
          if ws_sink.send(Message::Text(json.into())).await.is_err() {
            break;
          }
        }
        Err(e) => tracing::warn!("Failed to encode outbound frame: {}", e),
      }
    }
    let _ = ws_sink.close().await;
  });

  // A rejected handshake already closed the transport; flush and stop.
  if session.state() != ConnectionState::Connected {
    let _ = send_task.await;
    return;
  }

  let recv_dispatcher = dispatcher.clone();
  let recv_session: Arc<Session> = session.clone();
  let recv_task = tokio::spawn(async move {
    while let Some(Ok(msg)) = ws_stream.next().await {
      match msg {
        Message::Text(text) => recv_dispatcher.handle(&recv_session, &text).await,
        Message::Close(_) => break,
        _ => {}
      }
    }
  });

  tokio::select! {
    _ = recv_task => {},
    _ = send_task => {},
  }

  dispatcher.disconnect(&session);
}
