pub mod messages;
pub mod room;
pub mod autocomplete;
pub mod health;
pub mod diagnostics;
pub mod error;

pub use messages::*;
pub use room::*;
pub use autocomplete::*;
pub use health::*;
pub use diagnostics::*;
pub use error::*;
