//! Message handling - parsing inbound text and routing commands

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{Dispatch, MessageDispatcher};
pub use parser::MessageParser;
