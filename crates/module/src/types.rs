//! Declaration types collected while a module builds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a declared action, scoped to its module.
///
/// Rendered as `"<module>#<key>"`, where the key defaults to the contract
/// name and can be overridden through [`DeployOptions::id`] so that re-runs
/// of a resumed deployment address the same action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    /// Build an id from a module name and an action key
    pub fn new(module: &str, key: &str) -> Self {
        Self(format!("{module}#{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque forward reference to the value an action will produce.
///
/// A module build only ever creates the `Pending` variant; `Resolved` is
/// filled in by the execution engine when it replays its journal. Carrying
/// the resolution as plain data keeps module builds synchronous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Future {
    /// Unresolved reference to the output of a declared action
    Pending(ActionId),
    /// Value produced by the execution engine during a resumed run
    Resolved {
        id: ActionId,
        value: serde_json::Value,
    },
}

impl Future {
    /// The action this future refers to
    pub fn id(&self) -> &ActionId {
        match self {
            Future::Pending(id) => id,
            Future::Resolved { id, .. } => id,
        }
    }

    /// Check whether the engine has already produced a value
    pub fn is_resolved(&self) -> bool {
        matches!(self, Future::Resolved { .. })
    }

    /// The resolved value, if any.
    ///
    /// Always `None` at definition time: pending futures carry no value.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Future::Pending(_) => None,
            Future::Resolved { value, .. } => Some(value),
        }
    }
}

/// A constructor argument for a contract deployment.
///
/// Arguments nest: a future anywhere inside an array or map creates a
/// dependency edge on the action that produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    /// Literal value, forwarded to the action unmodified
    Value(serde_json::Value),
    /// Reference to another action's eventual output
    Future(Future),
    /// Ordered sequence of arguments
    Array(Vec<Arg>),
    /// String-keyed record of arguments
    Map(BTreeMap<String, Arg>),
}

impl Arg {
    /// Collect the ids of all futures nested in this argument
    pub fn collect_future_ids(&self, out: &mut Vec<ActionId>) {
        match self {
            Arg::Value(_) => {}
            Arg::Future(future) => out.push(future.id().clone()),
            Arg::Array(items) => {
                for item in items {
                    item.collect_future_ids(out);
                }
            }
            Arg::Map(entries) => {
                for value in entries.values() {
                    value.collect_future_ids(out);
                }
            }
        }
    }
}

impl From<Future> for Arg {
    fn from(future: Future) -> Self {
        Arg::Future(future)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(serde_json::Value::from(value))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(serde_json::Value::from(value))
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::Value(serde_json::Value::from(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Value(serde_json::Value::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(serde_json::Value::from(value))
    }
}

/// Options accepted by the declaration calls on [`crate::ModuleBuilder`].
///
/// This is an open, versioned surface: the execution engine may recognize
/// more keys over time, so every field is optional and the record defaults
/// to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployOptions {
    /// Override the default action identifier (the contract name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Explicit ordering dependencies on other actions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Future>,

    /// Linked libraries, by link name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libraries: BTreeMap<String, Future>,
}

impl DeployOptions {
    /// Options carrying only an identifier override
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Options carrying only explicit ordering dependencies
    pub fn after(futures: Vec<Future>) -> Self {
        Self {
            after: futures,
            ..Self::default()
        }
    }
}

/// What a declared action does once the engine executes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Deploy a new contract instance
    Deploy {
        contract: String,
        args: Vec<Arg>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        libraries: BTreeMap<String, Future>,
    },
    /// Deploy a linkable library (libraries take no constructor arguments)
    Library { contract: String },
    /// Bind to a contract already deployed at a known address
    Existing { contract: String, address: String },
}

/// One declared deployment step.
///
/// Created once at module-build time, never mutated afterward, consumed
/// exactly once by the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Identifier, unique within the deployment
    pub id: ActionId,
    /// What the action does
    pub kind: ActionKind,
    /// Explicit ordering dependencies from the `after` option
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Future>,
}

impl Action {
    /// The contract artifact this action targets
    pub fn contract(&self) -> &str {
        match &self.kind {
            ActionKind::Deploy { contract, .. } => contract,
            ActionKind::Library { contract } => contract,
            ActionKind::Existing { contract, .. } => contract,
        }
    }

    /// Ids of all actions this action depends on.
    ///
    /// Edges come from futures nested in constructor arguments, from linked
    /// libraries, and from the `after` list. Duplicates are removed while
    /// preserving first-seen order.
    pub fn dependencies(&self) -> Vec<ActionId> {
        let mut deps = Vec::new();

        if let ActionKind::Deploy {
            args, libraries, ..
        } = &self.kind
        {
            for arg in args {
                arg.collect_future_ids(&mut deps);
            }
            for library in libraries.values() {
                deps.push(library.id().clone());
            }
        }

        for future in &self.after {
            deps.push(future.id().clone());
        }

        let mut seen = std::collections::HashSet::new();
        deps.retain(|id| seen.insert(id.clone()));
        deps
    }
}
