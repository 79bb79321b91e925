//! WebSocket upgrade handler

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{Sink, SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::{OutboundRx, User};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (user, outbound_rx) = User::new();
    let user = Arc::new(user);
    let user_id = user.id();
    info!(user_id = %user_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let closed = state.shutdown.child_token();

    // Writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(run_writer(user_id, ws_sink, outbound_rx, closed.clone()));

    let dispatcher = Dispatcher::new(state.store.clone(), user);
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);
    run_reader(&dispatcher, ws_stream, &rate_limiter, &closed).await;

    // Cleanup on disconnect
    dispatcher.disconnect();
    closed.cancel();
    if let Err(e) = writer_handle.await {
        error!(user_id = %user_id, error = %e, "Writer task failed");
    }

    info!(user_id = %user_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> dispatcher, until close, error or shutdown
async fn run_reader(
    dispatcher: &Dispatcher,
    mut ws_stream: SplitStream<WebSocket>,
    rate_limiter: &PlayerRateLimiter,
    closed: &CancellationToken,
) {
    let user_id = dispatcher.user().id();

    loop {
        let result = tokio::select! {
            _ = closed.cancelled() => break,
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(user_id = %user_id, "Rate limited input message");
                    continue;
                }

                match ClientMsg::decode(&text) {
                    Ok(msg) => {
                        debug!(user_id = %user_id, ?msg, "Message received");
                        dispatcher.handle(msg);
                    }
                    Err(e) => {
                        debug!(user_id = %user_id, error = %e, "Dropped client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer loop: drains the outbound queue in order. A failed write closes the
/// connection so the reader side runs cleanup.
async fn run_writer(
    user_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: OutboundRx,
    closed: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = closed.cancelled() => break,
            msg = outbound_rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(user_id = %user_id, error = %e, "WebSocket send failed");
            closed.cancel();
            break;
        }
    }

    close_sink(user_id, &mut ws_sink).await;
}

/// Close the sink, logging a failure. Returns whether the close succeeded.
async fn close_sink<S>(user_id: Uuid, sink: &mut S) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    match sink.close().await {
        Ok(()) => true,
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "WebSocket close failed");
            false
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), SendError> {
    let json = msg.encode()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

/// Outbound delivery failures
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] axum::Error),
}
