//! Cog manager - orchestrates load/unload/reload and persists registry entries

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::entries::{CogRegistryStore, RegistryEntries};
use super::loader::{CogLoader, LoadedCogs};
use super::locks::ModuleLocks;
use super::unloader::CogUnloader;
use crate::application::errors::{CogError, StartupError};
use crate::domain::entities::{CommandRegistry, ModuleId};
use crate::domain::traits::{ModulePrompt, ModuleResolver};
use crate::infrastructure::config::{Config, DefaultPolicy};

/// Startup options for `load_all`
#[derive(Debug, Clone)]
pub struct LoadAllOptions {
    /// Load only the core module
    pub no_cogs: bool,
    /// Enabled when the registry is empty
    pub defaults: Vec<ModuleId>,
    /// Applied to discovered modules without an entry
    pub policy: DefaultPolicy,
}

impl LoadAllOptions {
    pub fn from_config(config: &Config) -> Result<Self, crate::application::errors::ConfigError> {
        Ok(Self {
            no_cogs: false,
            defaults: config.default_modules()?,
            policy: config.cogs.default_policy,
        })
    }
}

#[derive(Debug, Default)]
pub struct LoadAllReport {
    pub loaded: Vec<ModuleId>,
    pub failed: Vec<(ModuleId, CogError)>,
}

impl LoadAllReport {
    pub fn failed_ids(&self) -> Vec<ModuleId> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct UnloadAllReport {
    pub unloaded: Vec<ModuleId>,
    /// Modules whose teardown failed
    pub still_loaded: Vec<(ModuleId, CogError)>,
}

/// One row of `status()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CogStatus {
    pub id: ModuleId,
    pub loaded: bool,
    /// Registry entry, if any
    pub enabled: Option<bool>,
    pub commands: usize,
}

pub struct CogManager {
    loader: CogLoader,
    unloader: CogUnloader,
    registry: Arc<RwLock<CommandRegistry>>,
    loaded: LoadedCogs,
    entries: Mutex<RegistryEntries>,
    entry_store: CogRegistryStore,
    locks: ModuleLocks,
    prompt: Option<Arc<dyn ModulePrompt>>,
}

impl CogManager {
    /// Create a manager, reading the persisted registry entries once.
    pub async fn new(
        core: ModuleId,
        resolver: Arc<dyn ModuleResolver>,
        config: Arc<Config>,
        registry: Arc<RwLock<CommandRegistry>>,
        entry_store: CogRegistryStore,
    ) -> Self {
        let entries = entry_store.load().await;
        debug!("Read {} registry entries", entries.len());

        Self {
            loader: CogLoader::new(resolver, config),
            unloader: CogUnloader::new(core),
            registry,
            loaded: LoadedCogs::default(),
            entries: Mutex::new(entries),
            entry_store,
            locks: ModuleLocks::new(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn ModulePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn core(&self) -> &ModuleId {
        self.unloader.core()
    }

    /// Every module the resolver knows about
    pub fn discover(&self) -> Vec<ModuleId> {
        self.loader.resolver().discover()
    }

    pub async fn is_loaded(&self, id: &ModuleId) -> bool {
        self.loaded.lock().await.contains_key(id)
    }

    pub async fn loaded_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.loaded.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn entries(&self) -> RegistryEntries {
        self.entries.lock().await.clone()
    }

    /// Load a module and mark it enabled. The core module gets no entry.
    pub async fn load(&self, id: &ModuleId) -> Result<(), CogError> {
        let _guard = self.locks.acquire(id).await;
        match self.loader.load(id, &self.loaded, &self.registry).await {
            Ok(()) => {
                if id != self.core() {
                    self.set_entry(id, true).await;
                }
                Ok(())
            }
            Err(e) => {
                log_failure("load", id, &e);
                Err(e)
            }
        }
    }

    /// Unload a module and mark it disabled. The core module is refused.
    pub async fn unload(&self, id: &ModuleId) -> Result<(), CogError> {
        let _guard = self.locks.acquire(id).await;
        let result = self.unloader.unload(id, false, &self.loaded, &self.registry).await;
        match &result {
            Ok(()) | Err(CogError::Unload { .. }) => self.set_entry(id, false).await,
            Err(e) => log_failure("unload", id, e),
        }
        result
    }

    /// Unload then load again.
    ///
    /// Not atomic: if the load step fails the old instance is already gone and
    /// the module stays unloaded. Its registry entry is left as it was.
    pub async fn reload(&self, id: &ModuleId) -> Result<(), CogError> {
        let _guard = self.locks.acquire(id).await;

        match self.unloader.unload(id, true, &self.loaded, &self.registry).await {
            Ok(()) => {}
            Err(CogError::NotLoaded(_)) => debug!("{} was not loaded, loading fresh", id),
            Err(e) => warn!("Continuing reload of {} after unload failure: {}", id, e),
        }

        match self.loader.load(id, &self.loaded, &self.registry).await {
            Ok(()) => {
                if id != self.core() {
                    self.set_entry(id, true).await;
                }
                info!("Reloaded cog {}", id);
                Ok(())
            }
            Err(e) => {
                log_failure("reload", id, &e);
                Err(e)
            }
        }
    }

    /// Startup sequence: core module first, then every enabled module.
    ///
    /// Only a core module failure is returned as an error; every other failure
    /// lands in the report and flips that module's entry to disabled.
    pub async fn load_all(
        &self,
        discovered: &[ModuleId],
        options: &LoadAllOptions,
    ) -> Result<LoadAllReport, StartupError> {
        let core = self.core().clone();
        let mut report = LoadAllReport::default();

        {
            let _guard = self.locks.acquire(&core).await;
            match self.loader.load(&core, &self.loaded, &self.registry).await {
                Ok(()) | Err(CogError::AlreadyLoaded(_)) => report.loaded.push(core.clone()),
                Err(source) => {
                    error!("Core module {} failed to load: {}", core, source);
                    return Err(StartupError::CoreModule { id: core, source });
                }
            }
        }

        if options.no_cogs {
            debug!("Skipping initial cogs loading (--no-cogs)");
            if !self.entry_store.exists().await {
                self.entry_store.save(&RegistryEntries::new()).await?;
            }
            return Ok(report);
        }

        let to_load: Vec<ModuleId> = {
            let mut entries = self.entries.lock().await;
            if entries.is_empty() {
                for id in &options.defaults {
                    entries.insert(id.clone(), true);
                }
            }

            for id in discovered.iter().filter(|id| **id != core) {
                if entries.contains_key(id) {
                    continue;
                }
                let enabled = self.decide(id, options.policy);
                info!("New module {} {}", id, if enabled { "enabled" } else { "disabled" });
                entries.insert(id.clone(), enabled);
                self.entry_store.save(&entries).await?;
            }

            entries
                .iter()
                .filter(|(id, enabled)| **enabled && **id != core)
                .map(|(id, _)| id.clone())
                .collect()
        };

        for id in to_load {
            let _guard = self.locks.acquire(&id).await;
            match self.loader.load(&id, &self.loaded, &self.registry).await {
                Ok(()) | Err(CogError::AlreadyLoaded(_)) => report.loaded.push(id),
                Err(e) => {
                    log_failure("load", &id, &e);
                    report.failed.push((id, e));
                }
            }
        }

        let mut entries = self.entries.lock().await;
        for (id, _) in &report.failed {
            entries.insert(id.clone(), false);
        }
        self.entry_store.save(&entries).await?;

        if !report.failed.is_empty() {
            let names: Vec<String> = report.failed.iter().map(|(id, _)| id.to_string()).collect();
            warn!("Failed to load: {}", names.join(" "));
        }
        Ok(report)
    }

    /// Unload every module except the core one, marking each disabled.
    pub async fn unload_all(&self) -> UnloadAllReport {
        let core = self.core().clone();
        let mut report = UnloadAllReport::default();

        let ids: Vec<ModuleId> = self
            .loaded_ids()
            .await
            .into_iter()
            .filter(|id| *id != core)
            .collect();

        for id in ids {
            let _guard = self.locks.acquire(&id).await;
            self.entries.lock().await.insert(id.clone(), false);
            match self.unloader.unload(&id, false, &self.loaded, &self.registry).await {
                Ok(()) => report.unloaded.push(id),
                Err(CogError::NotLoaded(_)) => debug!("{} was unloaded concurrently", id),
                Err(e) => {
                    log_failure("unload", &id, &e);
                    report.still_loaded.push((id, e));
                }
            }
        }

        self.persist().await;
        report
    }

    /// Tear every cog down at process exit, core last. Entries are untouched.
    pub async fn shutdown(&self) {
        let core = self.core().clone();
        let mut ids = self.loaded_ids().await;
        ids.sort_by_key(|id| *id == core);

        for id in ids {
            let _guard = self.locks.acquire(&id).await;
            if let Err(e) = self.unloader.unload(&id, true, &self.loaded, &self.registry).await {
                warn!("Shutdown of {} failed: {}", id, e);
            }
        }
    }

    /// Discovered and loaded modules with their registry entries
    pub async fn status(&self) -> Vec<CogStatus> {
        let mut ids = self.discover();
        ids.extend(self.loaded_ids().await);
        ids.sort();
        ids.dedup();

        let entries = self.entries.lock().await.clone();
        let loaded = self.loaded.lock().await;
        ids.into_iter()
            .map(|id| {
                let cog = loaded.get(&id);
                CogStatus {
                    loaded: cog.is_some(),
                    commands: cog.map(|c| c.commands.len()).unwrap_or(0),
                    enabled: entries.get(&id).copied(),
                    id,
                }
            })
            .collect()
    }

    fn decide(&self, id: &ModuleId, policy: DefaultPolicy) -> bool {
        match policy {
            DefaultPolicy::Enable => true,
            DefaultPolicy::Disable => false,
            DefaultPolicy::Ask => match &self.prompt {
                Some(prompt) => prompt.confirm(id),
                None => false,
            },
        }
    }

    async fn set_entry(&self, id: &ModuleId, enabled: bool) {
        let mut entries = self.entries.lock().await;
        entries.insert(id.clone(), enabled);
        if let Err(e) = self.entry_store.save(&entries).await {
            error!("Failed to persist registry entry for {}: {}", id, e);
        }
    }

    async fn persist(&self) {
        let entries = self.entries.lock().await;
        if let Err(e) = self.entry_store.save(&entries).await {
            error!("Failed to persist registry entries: {}", e);
        }
    }
}

fn log_failure(operation: &str, id: &ModuleId, e: &CogError) {
    match e {
        CogError::Load { .. } | CogError::Unload { .. } | CogError::DuplicateCommand { .. } => {
            error!("Failed to {} {}: {:?}", operation, id, e)
        }
        _ => warn!("Failed to {} {}: {}", operation, id, e),
    }
}
