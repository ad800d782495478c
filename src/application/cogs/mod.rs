//! Cog lifecycle - loading, unloading and reloading command modules at runtime
//!
//! - Loader: resolve, construct and register a cog atomically
//! - Unloader: deregister and tear down, refusing the core module
//! - Manager: per-module serialization, startup batch, persisted registry entries

pub mod entries;
pub mod loader;
pub mod locks;
pub mod manager;
pub mod unloader;

#[cfg(test)]
pub(crate) mod testing;

pub use entries::{CogRegistryStore, RegistryEntries};
pub use loader::{CogLoader, LoadedCog};
pub use manager::{CogManager, CogStatus, LoadAllOptions, LoadAllReport, UnloadAllReport};
pub use unloader::CogUnloader;
