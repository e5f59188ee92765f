//! Chat controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions,
//! one machine per conversation.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{welcome_message, ConvContext, ConvState, TaskContext};
pub use transition::{transition, TransitionError, TransitionResult, APOLOGY_MESSAGE, ERROR_NOTE};
