use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::conn::ConnId;
use super::store::{RetentionPolicy, Shared};
use crate::error::RoomError;
use crate::models::Frame;

/// Outbound queue of one connection. The room only ever `try_send`s into it.
pub type Outbox = mpsc::Sender<Frame>;

/// The room stopped accepting requests because it emptied and was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Retired;

type Reply<T> = oneshot::Sender<Result<T, Retired>>;

pub(crate) enum RoomCommand {
    AddMember { conn: ConnId, outbox: Outbox, reply: Reply<String> },
    RemoveMember { conn: ConnId, reply: Reply<bool> },
    GetSnapshot { reply: Reply<String> },
    SetSnapshot { text: String, reply: Reply<()> },
    Publish { sender: ConnId, frame: Frame, update: Option<String>, reply: Reply<RelayReport> },
    MemberCount { reply: Reply<usize> },
}

/// Outcome of relaying one frame to a room.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelayReport {
    /// Peers whose outbox accepted the frame
    pub delivered: usize,
    /// Peers whose outbox was closed or full; they are no longer members
    pub dropped: Vec<ConnId>,
    /// The sender is not a member, so nothing was applied or relayed
    pub sender_gone: bool,
}

impl RelayReport {
    pub(crate) fn sender_gone() -> Self {
        Self {
            sender_gone: true,
            ..Self::default()
        }
    }
}

/// Cheap, clonable address of a running room task.
#[derive(Clone)]
pub(crate) struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
    pub(crate) generation: u64,
}

impl RoomHandle {
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, Retired> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| Retired)?;
        rx.await.unwrap_or(Err(Retired))
    }
}

/// Owns `(members, snapshot)` of a single room and applies requests one at a time.
pub(crate) struct RoomActor {
    room_id: String,
    generation: u64,
    members: HashMap<ConnId, Outbox>,
    snapshot: String,
    policy: RetentionPolicy,
    parked: Option<Cache<String, String>>,
    shared: Weak<Shared>,
    retired: bool,
    rx: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Spawn the task for `room_id`, starting from `snapshot`.
    pub(crate) fn spawn(
        room_id: String,
        generation: u64,
        snapshot: String,
        policy: RetentionPolicy,
        parked: Option<Cache<String, String>>,
        shared: Weak<Shared>,
        mailbox_capacity: usize,
    ) -> RoomHandle {
        let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
        let actor = RoomActor {
            room_id,
            generation,
            members: HashMap::new(),
            snapshot,
            policy,
            parked,
            shared,
            retired: false,
            rx,
        };
        tokio::spawn(actor.run());
        RoomHandle { tx, generation }
    }

    async fn run(mut self) {
        debug!("Room '{}' (gen {}) started", self.room_id, self.generation);
        while let Some(cmd) = self.rx.recv().await {
            if self.retired {
                self.refuse(cmd);
                continue;
            }
            self.handle(cmd);
        }
        debug!("Room '{}' (gen {}) stopped", self.room_id, self.generation);
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::AddMember { conn, outbox, reply } => {
                self.members.insert(conn, outbox);
                debug!("Connection {} joined room '{}' ({} members)", conn, self.room_id, self.members.len());
                let _ = reply.send(Ok(self.snapshot.clone()));
            }
            RoomCommand::RemoveMember { conn, reply } => {
                let removed = self.members.remove(&conn).is_some();
                if removed {
                    debug!("Connection {} left room '{}' ({} members)", conn, self.room_id, self.members.len());
                }
                self.retire_if_empty();
                let _ = reply.send(Ok(removed));
            }
            RoomCommand::GetSnapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot.clone()));
            }
            RoomCommand::SetSnapshot { text, reply } => {
                self.snapshot = text;
                let _ = reply.send(Ok(()));
            }
            RoomCommand::Publish { sender, frame, update, reply } => {
                let report = self.publish(sender, frame, update);
                self.retire_if_empty();
                let _ = reply.send(Ok(report));
            }
            RoomCommand::MemberCount { reply } => {
                let _ = reply.send(Ok(self.members.len()));
            }
        }
    }

    fn refuse(&self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::AddMember { reply, .. } => {
                let _ = reply.send(Err(Retired));
            }
            RoomCommand::RemoveMember { reply, .. } => {
                let _ = reply.send(Err(Retired));
            }
            RoomCommand::GetSnapshot { reply } => {
                let _ = reply.send(Err(Retired));
            }
            RoomCommand::SetSnapshot { reply, .. } => {
                let _ = reply.send(Err(Retired));
            }
            RoomCommand::Publish { reply, .. } => {
                let _ = reply.send(Err(Retired));
            }
            RoomCommand::MemberCount { reply } => {
                let _ = reply.send(Err(Retired));
            }
        }
    }

    fn publish(&mut self, sender: ConnId, frame: Frame, update: Option<String>) -> RelayReport {
        // A deregistered connection no longer sees the room, so it must not change it either.
        if !self.members.contains_key(&sender) {
            debug!("Ignoring frame from non-member {} in room '{}'", sender, self.room_id);
            return RelayReport::sender_gone();
        }
        if let Some(code) = update {
            self.snapshot = code;
        }

        let mut report = RelayReport::default();
        for (conn, outbox) in &self.members {
            if *conn == sender {
                continue;
            }
            match outbox.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    let failure = RoomError::PeerSendFailure {
                        room_id: self.room_id.clone(),
                        conn: *conn,
                        reason: e.to_string(),
                    };
                    warn!("{}; deregistering peer", failure);
                    report.dropped.push(*conn);
                }
            }
        }
        for conn in &report.dropped {
            self.members.remove(conn);
        }
        report
    }

    /// Apply the eviction policy once the room has no members left.
    fn retire_if_empty(&mut self) {
        if !self.members.is_empty() {
            return;
        }
        let RetentionPolicy::Evict { ttl } = self.policy else {
            return;
        };

        // Park first so a replacement room started after deregistration finds it.
        if let (Some(_), Some(parked)) = (ttl, &self.parked) {
            parked.insert(self.room_id.clone(), std::mem::take(&mut self.snapshot));
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.deregister(&self.room_id, self.generation);
        }
        self.retired = true;
        self.rx.close();
        info!("Room '{}' emptied and was evicted", self.room_id);
    }
}
