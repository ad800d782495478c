//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod cog;
pub mod store;

pub use bot::{Bot, BotInfo};
pub use cog::{Cog, CogSetup, ModulePrompt, ModuleResolver, SetupContext};
pub use store::DocumentStore;
