//! Dependency graph over resource declarations.
//!
//! Edges are the union of explicit `depends_on` entries and the implicit
//! dependencies induced by cross-declaration references. The graph is
//! recomputed from the declarations on every planning pass; edges are
//! never persisted independently.
//!
//! Construction fails on a reference to an undeclared name and on cycles,
//! in both cases before any remote call can be issued. Among declarations
//! with no dependency relationship the order is unspecified but stable:
//! ready sets are kept sorted by logical name so identical inputs always
//! produce identical waves.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use stratus_core::LogicalName;

use crate::declaration::Declaration;

/// Error constructing a dependency graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The declarations form at least one dependency cycle.
    #[error("cyclic dependency between declarations: {}", names.iter().map(LogicalName::as_str).collect::<Vec<_>>().join(", "))]
    CyclicDependency {
        /// The declarations participating in a cycle, sorted by name.
        names: Vec<LogicalName>,
    },

    /// A declaration depends on a name that is not declared.
    #[error("declaration '{declaration}' depends on unknown declaration '{dependency}'")]
    UnknownDependency {
        /// The declaration carrying the dependency.
        declaration: LogicalName,
        /// The name that is not declared.
        dependency: LogicalName,
    },
}

/// A directed acyclic graph over a set of declarations.
#[derive(Debug)]
pub struct DependencyGraph {
    /// dependency → dependents ("must run before")
    dependents: BTreeMap<LogicalName, BTreeSet<LogicalName>>,
    /// dependent → dependencies ("must run after")
    dependencies: BTreeMap<LogicalName, BTreeSet<LogicalName>>,
    /// Topological waves; declarations within a wave are mutually
    /// independent.
    waves: Vec<Vec<LogicalName>>,
}

impl DependencyGraph {
    /// Build the graph for a declaration set.
    ///
    /// Fails with [`GraphError::UnknownDependency`] if any edge points
    /// outside the set and with [`GraphError::CyclicDependency`] if the
    /// edges contain a cycle.
    pub fn build(declarations: &[Declaration]) -> Result<Self, GraphError> {
        let names: BTreeSet<&LogicalName> = declarations.iter().map(Declaration::name).collect();

        let mut dependents: BTreeMap<LogicalName, BTreeSet<LogicalName>> = BTreeMap::new();
        let mut dependencies: BTreeMap<LogicalName, BTreeSet<LogicalName>> = BTreeMap::new();
        for declaration in declarations {
            dependents.entry(declaration.name().clone()).or_default();
            dependencies.entry(declaration.name().clone()).or_default();
        }

        for declaration in declarations {
            for dependency in declaration.dependencies() {
                if !names.contains(dependency) {
                    return Err(GraphError::UnknownDependency {
                        declaration: declaration.name().clone(),
                        dependency: dependency.clone(),
                    });
                }
                if let Some(set) = dependents.get_mut(dependency) {
                    set.insert(declaration.name().clone());
                }
                if let Some(set) = dependencies.get_mut(declaration.name()) {
                    set.insert(dependency.clone());
                }
            }
        }

        let waves = topological_waves(&dependents, &dependencies)?;

        Ok(Self {
            dependents,
            dependencies,
            waves,
        })
    }

    /// Number of declarations in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Topological waves; each wave's declarations are mutually
    /// independent and sorted by name.
    #[must_use]
    pub fn waves(&self) -> &[Vec<LogicalName>] {
        &self.waves
    }

    /// The direct dependencies of a declaration.
    pub fn dependencies_of(&self, name: &LogicalName) -> impl Iterator<Item = &LogicalName> {
        self.dependencies.get(name).into_iter().flatten()
    }

    /// The direct dependents of a declaration.
    pub fn dependents_of(&self, name: &LogicalName) -> impl Iterator<Item = &LogicalName> {
        self.dependents.get(name).into_iter().flatten()
    }

    /// Every declaration reachable downstream of `name`.
    #[must_use]
    pub fn transitive_dependents(&self, name: &LogicalName) -> BTreeSet<LogicalName> {
        let mut reached = BTreeSet::new();
        let mut frontier: Vec<&LogicalName> = self.dependents_of(name).collect();
        while let Some(current) = frontier.pop() {
            if reached.insert(current.clone()) {
                frontier.extend(self.dependents_of(current));
            }
        }
        reached
    }
}

/// Kahn's algorithm with wave tracking.
fn topological_waves(
    dependents: &BTreeMap<LogicalName, BTreeSet<LogicalName>>,
    dependencies: &BTreeMap<LogicalName, BTreeSet<LogicalName>>,
) -> Result<Vec<Vec<LogicalName>>, GraphError> {
    let mut in_degree: BTreeMap<&LogicalName, usize> = dependencies
        .iter()
        .map(|(name, deps)| (name, deps.len()))
        .collect();

    // BTreeMap iteration keeps every wave sorted by name.
    let mut current: Vec<&LogicalName> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut waves = Vec::new();
    let mut processed = 0;

    while !current.is_empty() {
        processed += current.len();
        let mut next = BTreeSet::new();
        for name in &current {
            for dependent in dependents.get(*name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.insert(dependent);
                    }
                }
            }
        }
        waves.push(current.iter().map(|n| (*n).clone()).collect());
        current = next.into_iter().collect();
    }

    if processed != dependencies.len() {
        let names: Vec<LogicalName> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| (*name).clone())
            .collect();
        return Err(GraphError::CyclicDependency { names });
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Declaration;
    use stratus_provider::ResourceKind;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn decl(n: &str, deps: &[&str]) -> Declaration {
        let mut builder = Declaration::builder(ResourceKind::Bucket, name(n));
        for dep in deps {
            builder = builder.depends_on(name(dep));
        }
        builder.build()
    }

    #[test]
    fn test_chain_produces_one_wave_per_node() {
        // a -> b -> c
        let declarations = vec![decl("a", &[]), decl("b", &["a"]), decl("c", &["b"])];
        let graph = DependencyGraph::build(&declarations).unwrap();

        assert_eq!(
            graph.waves(),
            &[vec![name("a")], vec![name("b")], vec![name("c")]]
        );
    }

    #[test]
    fn test_independent_nodes_share_a_wave() {
        // a, b (parallel) -> c
        let declarations = vec![decl("b", &[]), decl("a", &[]), decl("c", &["a", "b"])];
        let graph = DependencyGraph::build(&declarations).unwrap();

        assert_eq!(graph.waves().len(), 2);
        assert_eq!(graph.waves()[0], vec![name("a"), name("b")]); // sorted
        assert_eq!(graph.waves()[1], vec![name("c")]);
    }

    #[test]
    fn test_reference_induces_edge() {
        let table = decl("video", &[]);
        let binding = Declaration::builder(ResourceKind::StreamBinding, name("trigger"))
            .reference("event_source_arn", name("video"), "stream_arn")
            .build();
        let graph = DependencyGraph::build(&[table, binding]).unwrap();

        assert_eq!(
            graph.dependencies_of(&name("trigger")).collect::<Vec<_>>(),
            vec![&name("video")]
        );
        assert_eq!(graph.waves(), &[vec![name("video")], vec![name("trigger")]]);
    }

    #[test]
    fn test_cycle_detected() {
        let declarations = vec![decl("a", &["b"]), decl("b", &["a"]), decl("c", &[])];
        let err = DependencyGraph::build(&declarations).unwrap_err();

        match err {
            GraphError::CyclicDependency { names } => {
                assert_eq!(names, vec![name("a"), name("b")]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let declarations = vec![decl("a", &["a"])];
        assert!(matches!(
            DependencyGraph::build(&declarations),
            Err(GraphError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let declarations = vec![decl("a", &["ghost"])];
        assert_eq!(
            DependencyGraph::build(&declarations).unwrap_err(),
            GraphError::UnknownDependency {
                declaration: name("a"),
                dependency: name("ghost"),
            }
        );
    }

    #[test]
    fn test_waves_stable_across_input_order() {
        let forward = vec![decl("a", &[]), decl("b", &[]), decl("c", &["a", "b"])];
        let reversed = vec![decl("c", &["a", "b"]), decl("b", &[]), decl("a", &[])];

        let first = DependencyGraph::build(&forward).unwrap();
        let second = DependencyGraph::build(&reversed).unwrap();
        assert_eq!(first.waves(), second.waves());
    }

    #[test]
    fn test_transitive_dependents() {
        let declarations = vec![
            decl("a", &[]),
            decl("b", &["a"]),
            decl("c", &["b"]),
            decl("d", &["a"]),
            decl("e", &[]),
        ];
        let graph = DependencyGraph::build(&declarations).unwrap();

        let downstream = graph.transitive_dependents(&name("a"));
        assert_eq!(
            downstream,
            [name("b"), name("c"), name("d")].into_iter().collect()
        );
        assert!(graph.transitive_dependents(&name("e")).is_empty());
    }
}
