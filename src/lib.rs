//! geochat - chat session core for a geospatial question-answering front end
//!
//! A conversation store and a reply state machine wired to a replaceable
//! responder. The bundled responder is a timer-based placeholder.

pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod responder;
pub mod runtime;
pub mod state_machine;
pub mod store;

pub use error::SessionError;
pub use model::{Conversation, Message, Role, Source};
pub use responder::{LoggingResponder, Responder, ResponderError, SimulatedResponder};
pub use runtime::{SessionEvent, SessionRuntime, SimulatedRuntime};
