use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::conn::ConnId;
use super::room::{Outbox, RelayReport, Retired, RoomActor, RoomCommand, RoomHandle};
use crate::error::RoomError;
use crate::models::Frame;

/// What happens to a room's document once its last member leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the room and its snapshot for the lifetime of the process.
    Retain,
    /// Drop the room. With a `ttl`, the snapshot is kept aside that long and
    /// restored if someone joins again in time.
    Evict { ttl: Option<Duration> },
}

impl std::fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionPolicy::Retain => write!(f, "retain"),
            RetentionPolicy::Evict { ttl: None } => write!(f, "evict"),
            RetentionPolicy::Evict { ttl: Some(ttl) } => write!(f, "evict (ttl {}s)", ttl.as_secs()),
        }
    }
}

/// Point-in-time counters for diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub rooms: usize,
    pub members: usize,
    pub parked: usize,
}

pub(crate) struct Shared {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    parked: Option<Cache<String, String>>,
    policy: RetentionPolicy,
    mailbox_capacity: usize,
    next_generation: AtomicU64,
}

impl Shared {
    /// Remove `room_id` from the registry if it still points at `generation`.
    pub(crate) fn deregister(&self, room_id: &str, generation: u64) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if rooms.get(room_id).is_some_and(|h| h.generation == generation) {
            rooms.remove(room_id);
        }
    }
}

/// Authoritative per-room state: who is connected and the current document text.
///
/// Each room is served by its own task, so requests for one room are applied
/// strictly one after another while different rooms never wait on each other.
/// The registry lock only guards the id-to-task map and is never held across
/// an await.
pub struct RoomStore {
    shared: Arc<Shared>,
}

impl RoomStore {
    pub fn new(policy: RetentionPolicy, mailbox_capacity: usize) -> Self {
        let parked = match policy {
            RetentionPolicy::Evict { ttl: Some(ttl) } => Some(
                Cache::builder()
                    .max_capacity(100_000)
                    .time_to_live(ttl)
                    .build(),
            ),
            _ => None,
        };
        info!("Room store initialized with retention policy: {}", policy);
        Self {
            shared: Arc::new(Shared {
                rooms: Mutex::new(HashMap::new()),
                parked,
                policy,
                mailbox_capacity,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.shared.policy
    }

    /// Create the room with no members and an empty document if it is not live.
    ///
    /// A snapshot parked by an earlier eviction is restored.
    pub fn ensure_room(&self, room_id: &str) {
        self.ensure_handle(room_id);
    }

    fn ensure_handle(&self, room_id: &str) -> RoomHandle {
        let mut rooms = self.shared.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let snapshot = self
            .shared
            .parked
            .as_ref()
            .and_then(|parked| parked.remove(room_id))
            .unwrap_or_default();
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        debug!("Creating room '{}' (gen {}, {} bytes restored)", room_id, generation, snapshot.len());

        let handle = RoomActor::spawn(
            room_id.to_string(),
            generation,
            snapshot,
            self.shared.policy,
            self.shared.parked.clone(),
            Arc::downgrade(&self.shared),
            self.shared.mailbox_capacity,
        );
        rooms.insert(room_id.to_string(), handle.clone());
        handle
    }

    fn lookup(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.shared.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room_id).cloned()
    }

    /// Whether the room currently has a live entry.
    pub fn contains(&self, room_id: &str) -> bool {
        self.lookup(room_id).is_some_and(|h| !h.is_closed())
    }

    /// Register `conn` and return the document as it was at the moment of admission.
    ///
    /// Frames published after admission land in `outbox`.
    pub async fn add_member(&self, room_id: &str, conn: ConnId, outbox: Outbox) -> Result<String, RoomError> {
        let mut handle = self
            .lookup(room_id)
            .ok_or_else(|| RoomError::InvariantViolation(room_id.to_string()))?;
        loop {
            let outbox = outbox.clone();
            match handle
                .request(|reply| RoomCommand::AddMember { conn, outbox, reply })
                .await
            {
                Ok(snapshot) => return Ok(snapshot),
                Err(Retired) => {
                    debug!("Room '{}' retired during join of {}, recreating", room_id, conn);
                    handle = self.ensure_handle(room_id);
                }
            }
        }
    }

    /// Deregister `conn`. Returns whether it was a member.
    pub async fn remove_member(&self, room_id: &str, conn: ConnId) -> bool {
        let Some(handle) = self.lookup(room_id) else {
            return false;
        };
        handle
            .request(|reply| RoomCommand::RemoveMember { conn, reply })
            .await
            .unwrap_or(false)
    }

    /// Current document text, `""` if the room never had one.
    pub async fn get_snapshot(&self, room_id: &str) -> String {
        if let Some(handle) = self.lookup(room_id) {
            if let Ok(snapshot) = handle.request(|reply| RoomCommand::GetSnapshot { reply }).await {
                return snapshot;
            }
        }
        self.shared
            .parked
            .as_ref()
            .and_then(|parked| parked.get(room_id))
            .unwrap_or_default()
    }

    /// Overwrite the document unconditionally.
    pub async fn set_snapshot(&self, room_id: &str, text: String) -> Result<(), RoomError> {
        let handle = self
            .lookup(room_id)
            .ok_or_else(|| RoomError::InvariantViolation(room_id.to_string()))?;
        handle
            .request(|reply| RoomCommand::SetSnapshot { text, reply })
            .await
            .map_err(|_| RoomError::StoreClosed(room_id.to_string()))
    }

    /// Apply `update` (if any) and queue `frame` for every member except `sender`,
    /// as a single step of the room.
    pub async fn publish(&self, room_id: &str, sender: ConnId, frame: Frame, update: Option<String>) -> RelayReport {
        let Some(handle) = self.lookup(room_id) else {
            debug!("Dropping frame for unknown room '{}'", room_id);
            return RelayReport::sender_gone();
        };
        handle
            .request(|reply| RoomCommand::Publish { sender, frame, update, reply })
            .await
            .unwrap_or_else(|Retired| RelayReport::sender_gone())
    }

    pub async fn stats(&self) -> StoreStats {
        let handles: Vec<RoomHandle> = {
            let rooms = self.shared.rooms.lock().unwrap_or_else(PoisonError::into_inner);
            rooms.values().cloned().collect()
        };

        let mut stats = StoreStats::default();
        for handle in handles {
            if let Ok(count) = handle.request(|reply| RoomCommand::MemberCount { reply }).await {
                stats.rooms += 1;
                stats.members += count;
            }
        }
        if let Some(parked) = &self.shared.parked {
            parked.run_pending_tasks();
            stats.parked = parked.entry_count() as usize;
        }
        stats
    }
}
