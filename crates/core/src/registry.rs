//! Per-run registry of loaded deployment modules

use crate::error::CoreError;
use caravel_module::{Action, BuiltModule, ModuleDefinition};
use std::collections::BTreeMap;
use tracing::info;

/// The set of modules loaded for one deployment run.
///
/// Each run constructs a fresh registry and loads definitions into it; there
/// is no ambient global state. Module names are unique within a registry. A
/// submodule reached through several parents is stored once, keyed by name,
/// provided every occurrence built to the same value.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, BuiltModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a definition and register it together with its submodules.
    pub fn load(&mut self, definition: &ModuleDefinition) -> Result<&BuiltModule, CoreError> {
        let built = definition.build()?;
        let name = built.name.clone();
        self.insert(built)?;
        Ok(&self.modules[&name])
    }

    /// Register an already-built module and, recursively, its submodules.
    ///
    /// The whole batch is validated before anything is committed: a
    /// duplicate name anywhere in the module tree leaves the registry
    /// exactly as it was.
    pub fn insert(&mut self, module: BuiltModule) -> Result<(), CoreError> {
        let mut staged = BTreeMap::new();
        Self::stage(&mut staged, module)?;

        for (name, staged_module) in &staged {
            match self.modules.get(name) {
                // The same submodule reached through two parents: keep one copy.
                Some(existing) if existing == staged_module => {}
                Some(_) => return Err(CoreError::DuplicateModuleName(name.clone())),
                None => {}
            }
        }

        for (name, module) in staged {
            if self.modules.contains_key(&name) {
                continue;
            }
            info!(
                module = %name,
                actions = module.actions.len(),
                "registered deployment module"
            );
            self.modules.insert(name, module);
        }
        Ok(())
    }

    /// Flatten a module tree into a name-keyed batch, submodules first.
    fn stage(
        staged: &mut BTreeMap<String, BuiltModule>,
        module: BuiltModule,
    ) -> Result<(), CoreError> {
        for submodule in &module.submodules {
            Self::stage(staged, submodule.clone())?;
        }

        match staged.get(&module.name) {
            Some(existing) if *existing == module => Ok(()),
            Some(_) => Err(CoreError::DuplicateModuleName(module.name.clone())),
            None => {
                staged.insert(module.name.clone(), module);
                Ok(())
            }
        }
    }

    /// Look up a loaded module by name
    pub fn get(&self, name: &str) -> Option<&BuiltModule> {
        self.modules.get(name)
    }

    /// Iterate over all loaded modules, in name order
    pub fn modules(&self) -> impl Iterator<Item = &BuiltModule> {
        self.modules.values()
    }

    /// Iterate over every declared action across all loaded modules.
    ///
    /// Submodules are registered as top-level entries, so each module
    /// contributes only its own actions and nothing is visited twice.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.modules.values().flat_map(|m| m.actions.iter())
    }

    /// Number of loaded modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
