//! Error types for caravel-core

use caravel_module::{ActionId, ModuleError};
use thiserror::Error;

/// Errors that can occur while loading modules and planning a deployment
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("module definition error: {0}")]
    Module(#[from] ModuleError),

    #[error("duplicate module name '{0}' in deployment")]
    DuplicateModuleName(String),

    #[error("action '{action}' depends on unknown action '{dependency}'")]
    UnknownAction {
        action: ActionId,
        dependency: ActionId,
    },

    #[error("dependency cycle detected in deployment graph")]
    CycleDetected,
}
