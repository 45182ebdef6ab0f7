pub mod conn;
pub mod manager;
pub mod room;
pub mod store;

pub use conn::{ConnId, ConnState};
pub use manager::{ConnectionManager, Session};
pub use room::{Outbox, RelayReport};
pub use store::{RetentionPolicy, RoomStore, StoreStats};
