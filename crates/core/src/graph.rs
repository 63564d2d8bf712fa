//! Deployment dependency graph
//!
//! Collects every declared action of a registry into a directed acyclic
//! graph and computes the orderings the execution engine schedules from.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::CoreError;
use crate::registry::ModuleRegistry;
use caravel_module::ActionId;

/// A DAG over the actions of one deployment run.
///
/// Nodes are action ids; an edge runs from a dependency to its dependent.
/// Edges come from futures nested in constructor arguments, from linked
/// libraries, and from explicit `after` options. The builder API can only
/// reference actions that already exist, so cycles cannot arise from
/// well-formed modules; they are still rejected here because the engine may
/// feed the registry from a persisted journal.
#[derive(Debug)]
pub struct DeploymentGraph {
    graph: DiGraph<ActionId, ()>,
    nodes: HashMap<ActionId, NodeIndex>,
}

impl DeploymentGraph {
    /// Build the graph from every action in a registry.
    ///
    /// # Errors
    ///
    /// `UnknownAction` if a dependency refers to an action id no loaded
    /// module declares; `CycleDetected` if the edges form a cycle.
    pub fn from_registry(registry: &ModuleRegistry) -> Result<Self, CoreError> {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for action in registry.actions() {
            let idx = graph.add_node(action.id.clone());
            nodes.insert(action.id.clone(), idx);
        }

        for action in registry.actions() {
            let dependent_idx = nodes[&action.id];

            for dependency in action.dependencies() {
                let Some(&dep_idx) = nodes.get(&dependency) else {
                    return Err(CoreError::UnknownAction {
                        action: action.id.clone(),
                        dependency,
                    });
                };
                graph.add_edge(dep_idx, dependent_idx, ());
            }
        }

        debug!(
            actions = graph.node_count(),
            edges = graph.edge_count(),
            "built deployment graph"
        );

        let dag = Self { graph, nodes };
        dag.verify_acyclic()?;
        Ok(dag)
    }

    fn verify_acyclic(&self) -> Result<(), CoreError> {
        toposort(&self.graph, None).map_err(|_| CoreError::CycleDetected)?;
        Ok(())
    }

    /// Actions in an order where dependencies come before dependents
    pub fn execution_order(&self) -> Result<Vec<ActionId>, CoreError> {
        let sorted = toposort(&self.graph, None).map_err(|_| CoreError::CycleDetected)?;
        Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Actions grouped into parallel waves.
    ///
    /// Each wave contains actions whose dependencies all sit in earlier
    /// waves, so the engine may submit a wave's transactions concurrently.
    pub fn waves(&self) -> Result<Vec<Vec<ActionId>>, CoreError> {
        // Kahn's algorithm variant: peel off zero-in-degree nodes level by level
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        for idx in self.graph.node_indices() {
            in_degree.insert(
                idx,
                self.graph.neighbors_directed(idx, Direction::Incoming).count(),
            );
        }

        let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<NodeIndex> = remaining
                .iter()
                .filter(|&&idx| in_degree[&idx] == 0)
                .copied()
                .collect();

            if ready.is_empty() {
                return Err(CoreError::CycleDetected);
            }

            let mut wave: Vec<ActionId> =
                ready.iter().map(|&idx| self.graph[idx].clone()).collect();
            wave.sort();

            for &idx in &ready {
                remaining.remove(&idx);
                for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                    if let Some(degree) = in_degree.get_mut(&neighbor) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }

            waves.push(wave);
        }

        Ok(waves)
    }

    /// Direct dependencies of an action
    pub fn dependencies(&self, id: &ActionId) -> Vec<ActionId> {
        let Some(&idx) = self.nodes.get(id) else {
            return Vec::new();
        };

        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|dep_idx| self.graph[dep_idx].clone())
            .collect()
    }

    /// Check if an action has any dependencies
    pub fn has_dependencies(&self, id: &ActionId) -> bool {
        let Some(&idx) = self.nodes.get(id) else {
            return false;
        };

        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .is_some()
    }

    /// Number of actions in the graph
    pub fn action_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_module::{
        Action, ActionId, ActionKind, Arg, BuiltModule, DeployOptions, Exports, Future, module,
    };

    fn load(definitions: &[caravel_module::ModuleDefinition]) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for definition in definitions {
            registry.load(definition).unwrap();
        }
        registry
    }

    #[test]
    fn test_empty_registry() {
        let registry = ModuleRegistry::new();
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        assert_eq!(graph.action_count(), 0);
        assert!(graph.execution_order().unwrap().is_empty());
        assert!(graph.waves().unwrap().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let definition = module("M", |m| {
            let a = m.contract("A", vec![], DeployOptions::default())?;
            let b = m.contract("B", vec![Arg::Future(a)], DeployOptions::default())?;
            let c = m.contract("C", vec![Arg::Future(b)], DeployOptions::default())?;
            Ok(Exports::from([("c".to_string(), c)]))
        })
        .unwrap();

        let registry = load(&[definition]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        let a = ActionId::new("M", "A");
        let b = ActionId::new("M", "B");
        let c = ActionId::new("M", "C");

        assert!(!graph.has_dependencies(&a));
        assert_eq!(graph.dependencies(&b), vec![a.clone()]);
        assert_eq!(graph.dependencies(&c), vec![b.clone()]);

        let order = graph.execution_order().unwrap();
        let pos = |id: &ActionId| order.iter().position(|x| x == id).unwrap();
        assert!(pos(&a) < pos(&b));
        assert!(pos(&b) < pos(&c));

        let waves = graph.waves().unwrap();
        assert_eq!(waves, vec![vec![a], vec![b], vec![c]]);
    }

    #[test]
    fn test_diamond_waves() {
        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        let definition = module("M", |m| {
            let a = m.contract("A", vec![], DeployOptions::default())?;
            let b = m.contract("B", vec![Arg::Future(a.clone())], DeployOptions::default())?;
            let c = m.contract("C", vec![Arg::Future(a)], DeployOptions::default())?;
            let d = m.contract(
                "D",
                vec![Arg::Future(b), Arg::Future(c)],
                DeployOptions::default(),
            )?;
            Ok(Exports::from([("d".to_string(), d)]))
        })
        .unwrap();

        let registry = load(&[definition]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        let waves = graph.waves().unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec![ActionId::new("M", "A")]);
        assert_eq!(
            waves[1],
            vec![ActionId::new("M", "B"), ActionId::new("M", "C")]
        );
        assert_eq!(waves[2], vec![ActionId::new("M", "D")]);
    }

    #[test]
    fn test_independent_actions_share_a_wave() {
        let definition = module("M", |m| {
            m.contract("A", vec![], DeployOptions::default())?;
            m.contract("B", vec![], DeployOptions::default())?;
            m.contract("C", vec![], DeployOptions::default())?;
            Ok(Exports::new())
        })
        .unwrap();

        let registry = load(&[definition]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        let waves = graph.waves().unwrap();
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].len(), 3);
    }

    #[test]
    fn test_after_option_creates_edge() {
        let definition = module("M", |m| {
            let gate = m.contract("Gate", vec![], DeployOptions::default())?;
            let token = m.contract("Token", vec![], DeployOptions::after(vec![gate]))?;
            Ok(Exports::from([("token".to_string(), token)]))
        })
        .unwrap();

        let registry = load(&[definition]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        assert_eq!(
            graph.dependencies(&ActionId::new("M", "Token")),
            vec![ActionId::new("M", "Gate")]
        );
    }

    #[test]
    fn test_cross_module_edges() {
        let base = module("BaseModule", |m| {
            let registry_contract = m.contract("Registry", vec![], DeployOptions::default())?;
            Ok(Exports::from([("registry".to_string(), registry_contract)]))
        })
        .unwrap();

        let app = module("AppModule", move |m| {
            let base_exports = m.use_module(&base)?;
            let app = m.contract(
                "App",
                vec![Arg::Future(base_exports["registry"].clone())],
                DeployOptions::default(),
            )?;
            Ok(Exports::from([("app".to_string(), app)]))
        })
        .unwrap();

        let registry = load(&[app]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        assert_eq!(graph.action_count(), 2);
        assert_eq!(
            graph.dependencies(&ActionId::new("AppModule", "App")),
            vec![ActionId::new("BaseModule", "Registry")]
        );

        let waves = graph.waves().unwrap();
        assert_eq!(waves.len(), 2);
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        // Hand-built module data with a dependency on an action nothing
        // declares, as a corrupted journal might replay it.
        let ghost = ActionId::new("Ghost", "Thing");
        let built = BuiltModule {
            name: "M".to_string(),
            actions: vec![Action {
                id: ActionId::new("M", "Token"),
                kind: ActionKind::Deploy {
                    contract: "Token".to_string(),
                    args: vec![Arg::Future(Future::Pending(ghost.clone()))],
                    libraries: Default::default(),
                },
                after: vec![],
            }],
            exports: Exports::new(),
            submodules: vec![],
        };

        let mut registry = ModuleRegistry::new();
        registry.insert(built).unwrap();

        let err = DeploymentGraph::from_registry(&registry).unwrap_err();
        assert!(matches!(err, CoreError::UnknownAction { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let a = ActionId::new("M", "A");
        let b = ActionId::new("M", "B");

        let built = BuiltModule {
            name: "M".to_string(),
            actions: vec![
                Action {
                    id: a.clone(),
                    kind: ActionKind::Deploy {
                        contract: "A".to_string(),
                        args: vec![],
                        libraries: Default::default(),
                    },
                    after: vec![Future::Pending(b.clone())],
                },
                Action {
                    id: b.clone(),
                    kind: ActionKind::Deploy {
                        contract: "B".to_string(),
                        args: vec![],
                        libraries: Default::default(),
                    },
                    after: vec![Future::Pending(a.clone())],
                },
            ],
            exports: Exports::new(),
            submodules: vec![],
        };

        let mut registry = ModuleRegistry::new();
        registry.insert(built).unwrap();

        let err = DeploymentGraph::from_registry(&registry).unwrap_err();
        assert!(matches!(err, CoreError::CycleDetected));
    }

    #[test]
    fn test_library_link_creates_edge() {
        let definition = module("M", |m| {
            let math = m.library("SafeMath", DeployOptions::default())?;
            let token = m.contract(
                "Token",
                vec![],
                DeployOptions {
                    libraries: std::collections::BTreeMap::from([(
                        "SafeMath".to_string(),
                        math,
                    )]),
                    ..DeployOptions::default()
                },
            )?;
            Ok(Exports::from([("token".to_string(), token)]))
        })
        .unwrap();

        let registry = load(&[definition]);
        let graph = DeploymentGraph::from_registry(&registry).unwrap();

        assert_eq!(
            graph.dependencies(&ActionId::new("M", "Token")),
            vec![ActionId::new("M", "SafeMath")]
        );
    }
}
