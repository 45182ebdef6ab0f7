use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::conn::{ConnId, ConnState};
use super::room::RelayReport;
use super::store::RoomStore;
use crate::db::RoomDirectory;
use crate::error::RoomError;
use crate::models::{Envelope, Frame};

/// How many times a join retries when the room is evicted between creation and admission.
const JOIN_ATTEMPTS: usize = 3;

/// A connection admitted to a room.
///
/// `init` must be delivered before anything drained from `outbox`; the outbox
/// starts buffering peer traffic the moment the connection is admitted.
pub struct Session {
    pub conn: ConnId,
    pub room_id: String,
    pub init: Envelope,
    pub outbox: mpsc::Receiver<Frame>,
    state: ConnState,
}

impl Session {
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Mark the connection `Active` and encode the `init` frame that has to go out first.
    ///
    /// Only a freshly joined session can be activated, and only once.
    pub fn activate(&mut self) -> Result<Frame, RoomError> {
        if !self.state.advance(ConnState::Active) {
            debug!("Connection {} cannot become active from {:?}", self.conn, self.state);
            return Err(RoomError::InvariantViolation(self.room_id.clone()));
        }
        self.init
            .to_frame()
            .map_err(|e| RoomError::MalformedEnvelope(e.to_string()))
    }
}

/// Mediates joins, leaves and relays between connections and the room store.
pub struct ConnectionManager {
    store: Arc<RoomStore>,
    directory: Arc<dyn RoomDirectory>,
    outbox_capacity: usize,
}

impl ConnectionManager {
    pub fn new(store: Arc<RoomStore>, directory: Arc<dyn RoomDirectory>, outbox_capacity: usize) -> Self {
        Self {
            store,
            directory,
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    pub fn store(&self) -> &Arc<RoomStore> {
        &self.store
    }

    /// Admit a new connection to `room_id`.
    ///
    /// Unknown rooms fail with `RoomNotFound` before anything is created.
    pub async fn join(&self, room_id: &str) -> Result<Session, RoomError> {
        if !self.directory.exists(room_id).await? {
            info!("Refusing connection to unknown room '{}'", room_id);
            return Err(RoomError::RoomNotFound(room_id.to_string()));
        }

        let conn = ConnId::new();
        let (tx, outbox) = mpsc::channel(self.outbox_capacity);

        let mut attempt = 1;
        let snapshot = loop {
            self.store.ensure_room(room_id);
            match self.store.add_member(room_id, conn, tx.clone()).await {
                Ok(snapshot) => break snapshot,
                Err(RoomError::InvariantViolation(_)) if attempt < JOIN_ATTEMPTS => {
                    debug!("Room '{}' evicted while {} was joining, retrying", room_id, conn);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!("Connection {} joined room '{}'", conn, room_id);
        Ok(Session {
            conn,
            room_id: room_id.to_string(),
            init: Envelope::init(snapshot),
            outbox,
            state: ConnState::Joined,
        })
    }

    /// Deregister `conn`. Safe to call more than once.
    pub async fn leave(&self, room_id: &str, conn: ConnId) {
        if self.store.remove_member(room_id, conn).await {
            info!("Connection {} left room '{}'", conn, room_id);
        }
    }

    /// Relay `frame` from `sender` to the rest of the room.
    ///
    /// A `code_update` replaces the room's document first. A payload that does not
    /// parse is still relayed; it just cannot change the document.
    pub async fn broadcast(&self, room_id: &str, sender: ConnId, frame: Frame) -> RelayReport {
        let update = match Envelope::parse(frame.as_bytes()) {
            Ok(Envelope::CodeUpdate { code }) => Some(code),
            Ok(_) => None,
            Err(e) => {
                debug!("Relaying unparsed frame from {} in room '{}': {}", sender, room_id, e);
                None
            }
        };

        let report = self.store.publish(room_id, sender, frame, update).await;
        if report.sender_gone {
            debug!("Discarded frame from {}, no longer a member of room '{}'", sender, room_id);
            return report;
        }
        debug!(
            "Frame from {} in room '{}' delivered to {} peers ({} dropped)",
            sender,
            room_id,
            report.delivered,
            report.dropped.len()
        );
        report
    }
}
