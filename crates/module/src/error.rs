//! Error types for caravel-module

use crate::types::ActionId;
use thiserror::Error;

/// Errors raised while a deployment module is defined or built.
///
/// All of these surface at definition time, before any external execution.
/// None are worth retrying: module builds are deterministic, so a retry
/// reproduces the same error.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("invalid module name '{0}': must be non-empty, without '#' or whitespace")]
    InvalidModuleName(String),

    #[error("invalid declaration in module '{module}': {message}")]
    InvalidDeclaration { module: String, message: String },

    #[error("duplicate action id '{0}'")]
    DuplicateAction(ActionId),

    #[error("declaration '{action}' references future '{id}' unknown to this module")]
    UnknownFuture { action: String, id: ActionId },

    #[error("export '{export}' references future '{id}' not created by this module")]
    ForeignFuture { export: String, id: ActionId },

    #[error("module '{module}' exports a value under an empty name")]
    EmptyExportName { module: String },

    #[error("submodule '{0}' used twice with different contents")]
    DuplicateSubmodule(String),
}
