use std::fmt;
use uuid::Uuid;

/// Identifies one transport connection for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a room connection. `Disconnected` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Joined,
    Active,
    Disconnected,
}

impl ConnState {
    /// Move to `next` if the lifecycle allows it, returning whether it moved.
    pub fn advance(&mut self, next: ConnState) -> bool {
        let allowed = matches!(
            (*self, next),
            (ConnState::Connecting, ConnState::Joined)
                | (ConnState::Joined, ConnState::Active)
                | (ConnState::Connecting | ConnState::Joined | ConnState::Active, ConnState::Disconnected)
        );
        if allowed {
            *self = next;
        }
        allowed
    }
}
