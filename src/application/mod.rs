//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Cogs: The cog lifecycle (loader, unloader, manager)
//! - Session: The process-wide bot state
//! - Services: Disabled commands, the message loop
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing and dispatching

pub mod cogs;
pub mod errors;
pub mod messaging;
pub mod services;
pub mod session;
