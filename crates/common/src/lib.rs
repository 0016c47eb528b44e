//! Helpers shared by all herald crates: error context plumbing, IRC target
//! names and log previews of relayed text.

pub mod error;
pub mod names;
pub mod text;

pub use error::FromMessage;
