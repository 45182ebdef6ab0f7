use thiserror::Error;

use crate::ws::conn::ConnId;

/// Failures raised by the room synchronization engine.
///
/// None of these travel back to the client that caused them. They surface only
/// in the logs, except `RoomNotFound` which refuses the transport handshake.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room '{0}' does not exist")]
    RoomNotFound(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("send to peer {conn} in room '{room_id}' failed: {reason}")]
    PeerSendFailure {
        room_id: String,
        conn: ConnId,
        reason: String,
    },

    #[error("room '{0}' was used out of order")]
    InvariantViolation(String),

    #[error("room directory error: {0}")]
    Directory(String),

    #[error("room '{0}' is no longer accepting requests")]
    StoreClosed(String),
}

impl From<sqlx::Error> for RoomError {
    fn from(e: sqlx::Error) -> Self {
        RoomError::Directory(e.to_string())
    }
}
