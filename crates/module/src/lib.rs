//! caravel-module: declarative deployment-module definitions
//!
//! This crate provides the module-definition frontend with:
//! - `module()`: declare a named module from a build function
//! - `ModuleBuilder`: the builder API passed to build functions for
//!   declaring contract deployments and obtaining futures
//! - `Future`: an opaque forward reference to an action's eventual output
//! - `BuiltModule`: the plain-data result the execution engine consumes
//!
//! Module builds are synchronous, pure, and deterministic; everything that
//! touches the network (scheduling, journaling, transaction submission)
//! lives in the external execution engine.

mod builder;
mod error;
mod module;
mod types;

pub use builder::ModuleBuilder;
pub use error::ModuleError;
pub use module::{BuildFn, BuiltModule, Exports, ModuleDefinition, module};
pub use types::{Action, ActionId, ActionKind, Arg, DeployOptions, Future};

/// Result type for module definition
pub type Result<T> = std::result::Result<T, ModuleError>;
