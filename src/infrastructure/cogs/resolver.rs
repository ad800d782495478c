//! Static module resolver - a compiled-in table of cog entry points

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::errors::CogError;
use crate::domain::entities::ModuleId;
use crate::domain::traits::{CogSetup, ModuleResolver};

/// Resolves module identifiers against a fixed table.
///
/// A module registered without an entry point is discoverable but fails to
/// load with `NoEntryPoint`.
#[derive(Default, Clone)]
pub struct StaticResolver {
    modules: BTreeMap<ModuleId, Option<Arc<dyn CogSetup>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ModuleId, setup: Arc<dyn CogSetup>) {
        self.modules.insert(id, Some(setup));
    }

    pub fn with_module(mut self, id: ModuleId, setup: impl CogSetup + 'static) -> Self {
        self.register(id, Arc::new(setup));
        self
    }

    pub fn with_missing_entry_point(mut self, id: ModuleId) -> Self {
        self.modules.insert(id, None);
        self
    }
}

impl ModuleResolver for StaticResolver {
    fn discover(&self) -> Vec<ModuleId> {
        self.modules.keys().cloned().collect()
    }

    fn resolve(&self, id: &ModuleId) -> Result<Arc<dyn CogSetup>, CogError> {
        match self.modules.get(id) {
            Some(Some(setup)) => Ok(setup.clone()),
            Some(None) => Err(CogError::NoEntryPoint(id.clone())),
            None => Err(CogError::NotFound(id.clone())),
        }
    }
}
