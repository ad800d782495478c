//! Module resolution and operator prompts for the cog manager

pub mod prompt;
pub mod resolver;

pub use prompt::StdinPrompt;
pub use resolver::StaticResolver;
