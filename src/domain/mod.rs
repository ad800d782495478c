//! Domain layer - Core objects and the seams to infrastructure
//! 
//! This layer contains:
//! - Entities: Messages, users, command descriptors, module identifiers
//! - Traits: Abstractions for infrastructure (Bot, DocumentStore, Cog, ModuleResolver)

pub mod entities;
pub mod traits;
