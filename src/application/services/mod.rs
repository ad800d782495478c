//! Application services - Business logic orchestration

pub mod disabled_commands;
pub mod message_service;

pub use disabled_commands::DisabledCommands;
pub use message_service::MessageService;
