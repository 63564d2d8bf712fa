//! Builder API handed to a module's build function

use crate::error::ModuleError;
use crate::module::{BuiltModule, Exports, ModuleDefinition};
use crate::types::{Action, ActionId, ActionKind, Arg, DeployOptions, Future};
use std::collections::HashSet;
use tracing::debug;

/// Collects action declarations during one module build.
///
/// A fresh builder is constructed for every invocation of a module's build
/// function and discarded once the build finishes. All declaration calls are
/// synchronous: each registers an action and immediately returns a pending
/// [`Future`] for its eventual output.
pub struct ModuleBuilder {
    module_name: String,
    actions: Vec<Action>,
    /// Futures this builder has handed out, either for its own actions or
    /// imported from submodules. Anything else is foreign.
    known: HashSet<ActionId>,
    submodules: Vec<BuiltModule>,
}

impl ModuleBuilder {
    pub(crate) fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            actions: Vec::new(),
            known: HashSet::new(),
            submodules: Vec::new(),
        }
    }

    /// Name of the module being built
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Declare the deployment of a contract.
    ///
    /// `args` is the ordered constructor argument list, forwarded to the
    /// action unmodified; arity and type checking against the compiled
    /// artifact happen in the execution engine, not here. The action id
    /// defaults to the contract name and can be overridden via
    /// [`DeployOptions::id`].
    pub fn contract(
        &mut self,
        contract: &str,
        args: Vec<Arg>,
        options: DeployOptions,
    ) -> Result<Future, ModuleError> {
        self.check_contract_name(contract)?;
        let id = self.action_id(contract, &options)?;

        let mut referenced = Vec::new();
        for arg in &args {
            arg.collect_future_ids(&mut referenced);
        }
        for library in options.libraries.values() {
            referenced.push(library.id().clone());
        }
        for future in &options.after {
            referenced.push(future.id().clone());
        }
        self.check_known(&id, &referenced)?;

        self.register(Action {
            id,
            kind: ActionKind::Deploy {
                contract: contract.to_string(),
                args,
                libraries: options.libraries,
            },
            after: options.after,
        })
    }

    /// Declare the deployment of a linkable library.
    ///
    /// Libraries take no constructor arguments, so only the `id` and `after`
    /// options apply.
    pub fn library(
        &mut self,
        contract: &str,
        options: DeployOptions,
    ) -> Result<Future, ModuleError> {
        self.check_contract_name(contract)?;
        if !options.libraries.is_empty() {
            return Err(self.invalid_declaration("libraries cannot be linked into a library"));
        }
        let id = self.action_id(contract, &options)?;

        let referenced: Vec<ActionId> =
            options.after.iter().map(|f| f.id().clone()).collect();
        self.check_known(&id, &referenced)?;

        self.register(Action {
            id,
            kind: ActionKind::Library {
                contract: contract.to_string(),
            },
            after: options.after,
        })
    }

    /// Bind to a contract already deployed at a known address.
    ///
    /// Only the address shape is checked here; whether a matching contract
    /// actually lives there is resolved by the execution engine.
    pub fn contract_at(
        &mut self,
        contract: &str,
        address: &str,
        options: DeployOptions,
    ) -> Result<Future, ModuleError> {
        self.check_contract_name(contract)?;
        if !is_address(address) {
            return Err(self.invalid_declaration(format!(
                "'{address}' is not a 0x-prefixed 40-digit hex address"
            )));
        }
        if !options.libraries.is_empty() {
            return Err(
                self.invalid_declaration("libraries cannot be linked into an existing deployment")
            );
        }
        let id = self.action_id(contract, &options)?;

        let referenced: Vec<ActionId> =
            options.after.iter().map(|f| f.id().clone()).collect();
        self.check_known(&id, &referenced)?;

        self.register(Action {
            id,
            kind: ActionKind::Existing {
                contract: contract.to_string(),
                address: address.to_string(),
            },
            after: options.after,
        })
    }

    /// Build a submodule and import its exports.
    ///
    /// The returned futures can be wired into declarations of this module or
    /// re-exported. Using the same definition twice within one build yields
    /// the exports of a single shared submodule; two distinct definitions
    /// under one name are rejected.
    pub fn use_module(&mut self, definition: &ModuleDefinition) -> Result<Exports, ModuleError> {
        let built = definition.build()?;

        if let Some(existing) = self.submodules.iter().find(|m| m.name == built.name) {
            if *existing == built {
                return Ok(existing.exports.clone());
            }
            return Err(ModuleError::DuplicateSubmodule(built.name));
        }

        debug!(
            module = %self.module_name,
            submodule = %built.name,
            "imported submodule exports"
        );

        for future in built.exports.values() {
            self.known.insert(future.id().clone());
        }
        let exports = built.exports.clone();
        self.submodules.push(built);
        Ok(exports)
    }

    /// Validate the exports mapping and seal the build.
    pub(crate) fn finish(self, exports: Exports) -> Result<BuiltModule, ModuleError> {
        for (name, future) in &exports {
            if name.is_empty() {
                return Err(ModuleError::EmptyExportName {
                    module: self.module_name,
                });
            }
            // Pending futures from this builder are the only exportable
            // values; a resolved future cannot exist at definition time.
            if future.is_resolved() || !self.known.contains(future.id()) {
                return Err(ModuleError::ForeignFuture {
                    export: name.clone(),
                    id: future.id().clone(),
                });
            }
        }

        Ok(BuiltModule {
            name: self.module_name,
            actions: self.actions,
            exports,
            submodules: self.submodules,
        })
    }

    /// Derive the action id, keeping the `<module>#<key>` shape intact:
    /// the key (override or contract name) must be non-empty and free of
    /// `#` and whitespace, like module names.
    fn action_id(&self, contract: &str, options: &DeployOptions) -> Result<ActionId, ModuleError> {
        let key = options.id.as_deref().unwrap_or(contract);
        if key.is_empty() || key.contains('#') || key.chars().any(char::is_whitespace) {
            return Err(self.invalid_declaration(format!(
                "action id '{key}' must be non-empty, without '#' or whitespace"
            )));
        }
        Ok(ActionId::new(&self.module_name, key))
    }

    fn register(&mut self, action: Action) -> Result<Future, ModuleError> {
        if self.known.contains(&action.id) {
            return Err(ModuleError::DuplicateAction(action.id));
        }

        let future = Future::Pending(action.id.clone());
        self.known.insert(action.id.clone());
        self.actions.push(action);
        Ok(future)
    }

    fn check_contract_name(&self, contract: &str) -> Result<(), ModuleError> {
        if contract.is_empty() {
            return Err(self.invalid_declaration("contract name must be non-empty"));
        }
        Ok(())
    }

    fn check_known(&self, action: &ActionId, referenced: &[ActionId]) -> Result<(), ModuleError> {
        for id in referenced {
            if !self.known.contains(id) {
                return Err(ModuleError::UnknownFuture {
                    action: action.to_string(),
                    id: id.clone(),
                });
            }
        }
        Ok(())
    }

    fn invalid_declaration(&self, message: impl Into<String>) -> ModuleError {
        ModuleError::InvalidDeclaration {
            module: self.module_name.clone(),
            message: message.into(),
        }
    }
}

/// Check for a 0x-prefixed 20-byte hex address
fn is_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
