//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;
pub mod module_id;

pub use user::User;
pub use message::{Content, Message};
pub use command::{Command, CommandContext, CommandRegistry};
pub use module_id::ModuleId;
