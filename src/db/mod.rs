pub mod dbrooms;

pub use dbrooms::*;
