//! Reply generation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! session runtime feeds events in and executes the effects that come out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, ReplyOutcome};
pub use event::Event;
pub use state::{GenState, RequestId};
pub use transition::{transition, TransitionError, TransitionResult};
