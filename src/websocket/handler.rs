use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::RoomError;
use crate::models::Frame;
use crate::state::AppState;
use crate::utils::ScopeGuard;
use crate::ws::{ConnectionManager, Session};

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// WebSocket handler for `/ws/:room_id`
///
/// The room is joined before the upgrade is accepted, so an unknown room is
/// refused at the handshake and never sees a WebSocket frame.
pub async fn websocket_handler(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt for room '{}'", room_id);

    let session = match state.manager.join(&room_id).await {
        Ok(session) => session,
        Err(RoomError::RoomNotFound(_)) => return StatusCode::FORBIDDEN.into_response(),
        Err(e) => {
            error!("Failed to join room '{}': {}", room_id, e);
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    // Deregister even if the upgrade never completes.
    let guard = {
        let manager = state.manager.clone();
        let (room_id, conn) = (session.room_id.clone(), session.conn);
        ScopeGuard::new(move || {
            tokio::spawn(async move { manager.leave(&room_id, conn).await });
        })
    };

    let manager = state.manager.clone();
    ws.on_upgrade(move |socket| async move {
        handle_socket(socket, session, manager).await;
        guard.disarm();
    })
}

/// Handle an admitted WebSocket connection until either side goes away
async fn handle_socket(socket: WebSocket, mut session: Session, manager: Arc<ConnectionManager>) {
    let (conn, room_id) = (session.conn, session.room_id.clone());
    info!("WebSocket connection established for room '{}' with connection {}", room_id, conn);

    let (mut sender, mut receiver) = socket.split();

    let init_frame = match session.activate() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to activate {} in room '{}': {}", conn, room_id, e);
            manager.leave(&room_id, conn).await;
            return;
        }
    };
    if sender.send(init_frame.into()).await.is_err() {
        warn!("Failed to send init to {} in room '{}'", conn, room_id);
        manager.leave(&room_id, conn).await;
        return;
    }

    // Forward frames relayed by the room into the socket until the room lets go of us
    let mut outbox = session.outbox;
    let writer_room = room_id.clone();
    let mut writer_task = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if outbox.is_closed() {
                debug!("Connection {} was dropped from room '{}', not draining", conn, writer_room);
                break;
            }
            if sender.send(frame.into()).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Feed every inbound frame to the room, in arrival order
    let reader_manager = manager.clone();
    let reader_room = room_id.clone();
    let mut reader_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let frame = match msg {
                Ok(Message::Text(text)) => Frame::Text(text),
                Ok(Message::Binary(bytes)) => Frame::Binary(bytes),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Read error on {} in room '{}': {}", conn, reader_room, e);
                    break;
                }
            };
            if reader_manager.broadcast(&reader_room, conn, frame).await.sender_gone {
                debug!("Connection {} is no longer in room '{}', closing reader", conn, reader_room);
                break;
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut writer_task) => reader_task.abort(),
        _ = (&mut reader_task) => writer_task.abort(),
    };

    manager.leave(&room_id, conn).await;
    info!("WebSocket connection {} terminated", conn);
}
