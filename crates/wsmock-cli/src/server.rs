//! WebSocket server - channel ごとに `/<key>` で待ち受ける
//!
//! 接続ごとに 2 タスク:
//! - outgoing: SubscriberRegistry から来た JSON テキストをそのまま送る
//! - incoming: テキストフレームを JSON として decode し Dispatcher に渡す
//!
//! どちらかが終わったらもう片方も止めて購読を外す。

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use wsmock_core::Dispatcher;
use wsmock_core::impls::{SubscriberRegistry, Subscription};

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    subscribers: Arc<SubscriberRegistry>,
}

/// URL path a specification channel is served at.
pub fn channel_path(key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    } else {
        format!("/{key}")
    }
}

/// One WebSocket route per channel. Two channels served at the same path are rejected.
pub fn router(dispatcher: Dispatcher, subscribers: Arc<SubscriberRegistry>) -> Result<Router> {
    let state = AppState {
        dispatcher,
        subscribers,
    };
    let keys: Vec<String> = state
        .dispatcher
        .document()
        .channel_keys()
        .map(str::to_string)
        .collect();

    let mut served: HashMap<String, String> = HashMap::new();
    let mut router = Router::new();
    for key in keys {
        let path = channel_path(&key);
        if let Some(other) = served.insert(path.clone(), key.clone()) {
            bail!("channels {other:?} and {key:?} would both be served at {path}");
        }
        info!(channel = %key, %path, "serving channel");
        let state = state.clone();
        router = router.route(
            &path,
            get(move |ws: WebSocketUpgrade| {
                let state = state.clone();
                let channel = key.clone();
                async move { ws.on_upgrade(move |socket| serve_connection(socket, state, channel)) }
            }),
        );
    }
    Ok(router)
}

async fn serve_connection(socket: WebSocket, state: AppState, channel: String) {
    let Subscription { id, mut frames } = state.subscribers.subscribe(&channel);
    let (mut sink, mut stream) = socket.split();

    let mut outgoing = tokio::spawn(async move {
        while let Some(text) = frames.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let dispatcher = state.dispatcher.clone();
    let path = channel.clone();
    let mut incoming = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    let value: Value = match serde_json::from_str(text.as_str()) {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(channel = %path, error = %err, "ignoring frame that is not JSON");
                            continue;
                        }
                    };
                    if let Err(err) = dispatcher.on_payload(&path, &value) {
                        if err.is_connection_fatal() {
                            warn!(channel = %path, error = %err, "closing connection");
                            break;
                        }
                        debug!(channel = %path, error = %err, "message not dispatched");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outgoing => incoming.abort(),
        _ = &mut incoming => outgoing.abort(),
    }
    state.subscribers.unsubscribe(id);
}
