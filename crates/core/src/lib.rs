//! caravel-core: deployment loading and planning
//!
//! This crate provides what the execution engine consumes from module
//! definitions: the per-run [`ModuleRegistry`] and the [`DeploymentGraph`]
//! of declared actions. Executing the graph (scheduling, journaling,
//! transaction submission) happens outside this workspace.

mod error;
mod graph;
mod registry;

pub use error::CoreError;
pub use graph::DeploymentGraph;
pub use registry::ModuleRegistry;

// Re-export types from caravel-module for convenience
pub use caravel_module::{
    Action, ActionId, ActionKind, Arg, BuiltModule, DeployOptions, Exports, Future,
    ModuleBuilder, ModuleDefinition, ModuleError, module,
};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
