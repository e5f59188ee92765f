//! Client runtime for chat conversations
//!
//! Drives the per-conversation state machine: executes its effects against a
//! chat backend and a conversation store, and runs the typing timers.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ChatClient, ClientError, ClientUpdate};
pub use traits::*;
