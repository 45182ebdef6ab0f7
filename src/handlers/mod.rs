pub mod health;
pub mod rooms;
pub mod autocomplete;
pub mod diagnostics;

pub use health::*;
pub use rooms::*;
pub use autocomplete::*;
pub use diagnostics::*;
