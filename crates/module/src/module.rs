//! Module definitions and the result of building them

use crate::builder::ModuleBuilder;
use crate::error::ModuleError;
use crate::types::{Action, ActionId, Future};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// The mapping a build function returns: export name to future
pub type Exports = BTreeMap<String, Future>;

/// Shape of a module's build function.
///
/// `Fn` rather than `FnOnce`: the execution engine may build the same
/// definition again in a resumed process run to reconcile against its
/// journal, so build functions must be pure and re-invocable.
pub type BuildFn = dyn Fn(&mut ModuleBuilder) -> Result<Exports, ModuleError>;

/// A named, not-yet-built deployment module.
///
/// Identity is the name; behavior is the captured build function, invoked
/// exactly once per [`build`](ModuleDefinition::build) call with a fresh
/// [`ModuleBuilder`].
pub struct ModuleDefinition {
    name: String,
    build_fn: Box<BuildFn>,
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Declare a deployment module.
///
/// The name must be non-empty, contain no `#` (reserved as the action-id
/// separator) and no whitespace. The build function receives the builder
/// API, declares actions through it, and returns the exports mapping.
///
/// # Example
///
/// ```
/// use caravel_module::{module, DeployOptions, Exports};
///
/// let definition = module("TokenModule", |m| {
///     let token = m.contract("Token", vec![], DeployOptions::default())?;
///     Ok(Exports::from([("token".to_string(), token)]))
/// })
/// .unwrap();
///
/// let built = definition.build().unwrap();
/// assert_eq!(built.actions.len(), 1);
/// ```
pub fn module<F>(name: impl Into<String>, build_fn: F) -> Result<ModuleDefinition, ModuleError>
where
    F: Fn(&mut ModuleBuilder) -> Result<Exports, ModuleError> + 'static,
{
    let name = name.into();
    validate_module_name(&name)?;

    Ok(ModuleDefinition {
        name,
        build_fn: Box::new(build_fn),
    })
}

impl ModuleDefinition {
    /// The module's unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the build function once and validate its exports.
    ///
    /// Errors from the build function propagate unchanged. There is no
    /// partial success: either a well-formed [`BuiltModule`] comes back or
    /// an error does.
    pub fn build(&self) -> Result<BuiltModule, ModuleError> {
        debug!(module = %self.name, "building module definition");
        let mut builder = ModuleBuilder::new(&self.name);
        let exports = (self.build_fn)(&mut builder)?;
        builder.finish(exports)
    }
}

fn validate_module_name(name: &str) -> Result<(), ModuleError> {
    if name.is_empty() || name.contains('#') || name.chars().any(char::is_whitespace) {
        return Err(ModuleError::InvalidModuleName(name.to_string()));
    }
    Ok(())
}

/// The result of one module build: plain data the execution engine consumes.
///
/// Serializable so the engine's journal can persist it and compare it
/// against the result of a later rebuild. `PartialEq` makes the determinism
/// contract directly checkable: building the same definition twice must
/// produce equal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltModule {
    /// Module name, unique within the deployment
    pub name: String,
    /// Actions declared by this module's own build function
    pub actions: Vec<Action>,
    /// Exported futures, by export name
    pub exports: Exports,
    /// Modules imported through `use_module`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodules: Vec<BuiltModule>,
}

impl BuiltModule {
    /// Look up one of this module's own actions by id
    pub fn action(&self, id: &ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| &a.id == id)
    }

    /// All actions declared by this module and its submodules, depth-first
    pub fn all_actions(&self) -> Vec<&Action> {
        let mut actions = Vec::new();
        for submodule in &self.submodules {
            actions.extend(submodule.all_actions());
        }
        actions.extend(self.actions.iter());
        actions
    }
}
