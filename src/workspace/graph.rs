// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency graph over workspace pipelines.
//!
//! Edges run from a need to the pipeline that needs it (`lib -> api` when
//! `api` needs `lib`), so a topological walk yields a valid execution order.
//!
//! # Cycle detection
//!
//! Three-colour DFS: white nodes are unexplored, gray nodes sit on the
//! current path, black nodes are finished. Reaching a gray node closes a
//! cycle; the reported path starts and ends on that node, e.g.
//! `[b, c, d, b]`. Nodes and neighbours are walked in sorted order so the
//! report is deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::errors::GraphError;
use crate::workspace::WorkspacePipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Gray,
    Black,
}

/// Adjacency list: need -> pipelines needing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph(BTreeMap<String, Vec<String>>);

impl DependencyGraph {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a WorkspacePipeline>) -> Self {
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in entries {
            graph.entry(entry.name.clone()).or_default();
            for need in &entry.needs {
                graph.entry(need.clone()).or_default().push(entry.name.clone());
            }
        }
        for dependents in graph.values_mut() {
            dependents.sort();
            dependents.dedup();
        }
        Self(graph)
    }

    pub fn dependents(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// First cycle found, with its start node repeated at the end.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colours: BTreeMap<&str, Colour> =
            self.0.keys().map(|k| (k.as_str(), Colour::White)).collect();
        let mut path = Vec::new();
        for node in self.0.keys() {
            if colours.get(node.as_str()) == Some(&Colour::White) {
                if let Some(cycle) = self.visit(node, &mut colours, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        colours: &mut BTreeMap<&'a str, Colour>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        colours.insert(node, Colour::Gray);
        path.push(node);
        for neighbour in self.dependents(node) {
            match colours.get(neighbour.as_str()).copied().unwrap_or(Colour::White) {
                Colour::White => {
                    if let Some(cycle) = self.visit(neighbour, colours, path) {
                        return Some(cycle);
                    }
                }
                Colour::Gray => {
                    let start = path.iter().position(|n| *n == neighbour.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(neighbour.clone());
                    return Some(cycle);
                }
                Colour::Black => {}
            }
        }
        path.pop();
        colours.insert(node, Colour::Black);
        None
    }

    /// Kahn's algorithm; ties broken alphabetically.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree: BTreeMap<&str, usize> = self.0.keys().map(|k| (k.as_str(), 0)).collect();
        for dependents in self.0.values() {
            for dependent in dependents {
                *in_degree.entry(dependent.as_str()).or_default() += 1;
            }
        }
        let mut ready: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(node) = ready.pop_front() {
            order.push(node.to_string());
            let mut unlocked = Vec::new();
            for dependent in self.dependents(node) {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        unlocked.push(dependent.as_str());
                    }
                }
            }
            unlocked.sort();
            ready.extend(unlocked);
        }
        if order.len() < in_degree.len() {
            let cycle = self.find_cycle().unwrap_or_default();
            return Err(GraphError::CyclicDependency { cycle });
        }
        Ok(order)
    }
}

/// Check a candidate set before anything runs.
///
/// A cycle is reported alone; otherwise every need that is neither a
/// candidate nor already completed is reported.
pub fn validate_schedule<'a>(
    candidates: impl IntoIterator<Item = &'a WorkspacePipeline> + Clone,
    completed: &BTreeSet<String>,
) -> Result<DependencyGraph, Vec<GraphError>> {
    let graph = DependencyGraph::from_entries(candidates.clone());
    if let Some(cycle) = graph.find_cycle() {
        return Err(vec![GraphError::CyclicDependency { cycle }]);
    }

    let names: BTreeSet<&str> = candidates.clone().into_iter().map(|c| c.name.as_str()).collect();
    let unmet: Vec<GraphError> = candidates
        .into_iter()
        .flat_map(|candidate| {
            candidate
                .needs
                .iter()
                .filter(|need| !names.contains(need.as_str()) && !completed.contains(*need))
                .map(|need| GraphError::UnmetDependency {
                    pipeline: candidate.name.clone(),
                    missing: need.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    if unmet.is_empty() {
        Ok(graph)
    } else {
        Err(unmet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, needs: &[&str]) -> WorkspacePipeline {
        WorkspacePipeline::new(name, "").needing(needs)
    }

    #[test]
    fn test_linear_chain_order() {
        let entries = vec![entry("c", &["b"]), entry("b", &["a"]), entry("a", &[])];
        let graph = DependencyGraph::from_entries(&entries);
        assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(graph.dependents("a"), ["b".to_string()]);
    }

    #[test]
    fn test_diamond_order() {
        let entries = vec![
            entry("app", &["api", "web"]),
            entry("api", &["lib"]),
            entry("web", &["lib"]),
            entry("lib", &[]),
        ];
        let order = DependencyGraph::from_entries(&entries).topological_order().unwrap();
        assert_eq!(order, vec!["lib", "api", "web", "app"]);
    }

    #[test]
    fn test_simple_cycle() {
        let entries = vec![entry("a", &["b"]), entry("b", &["a"])];
        let cycle = DependencyGraph::from_entries(&entries).find_cycle().unwrap();
        assert_eq!(cycle, vec!["a", "b", "a"]);
        let error = GraphError::CyclicDependency { cycle };
        assert_eq!(
            error.to_string(),
            "Workspace contains a circular dependency: a -> b -> a"
        );
    }

    #[test]
    fn test_self_dependency_cycle() {
        let entries = vec![entry("a", &["a"])];
        let cycle = DependencyGraph::from_entries(&entries).find_cycle().unwrap();
        assert_eq!(cycle, vec!["a", "a"]);
    }

    #[test]
    fn test_complex_cycle_reports_only_the_loop() {
        let entries = vec![
            entry("a", &[]),
            entry("b", &["a", "d"]),
            entry("c", &["b"]),
            entry("d", &["c"]),
        ];
        let graph = DependencyGraph::from_entries(&entries);
        assert_eq!(graph.find_cycle().unwrap(), vec!["b", "c", "d", "b"]);
        assert!(matches!(
            graph.topological_order(),
            Err(GraphError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_validate_schedule_cycle_first() {
        let entries = vec![entry("a", &["b", "ghost"]), entry("b", &["a"])];
        let errors = validate_schedule(&entries, &BTreeSet::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], GraphError::CyclicDependency { .. }));
    }

    #[test]
    fn test_validate_schedule_unmet_needs() {
        let entries = vec![entry("api", &["lib"]), entry("web", &["lib", "assets"])];
        let completed = BTreeSet::from(["assets".to_string()]);

        let errors = validate_schedule(&entries, &completed).unwrap_err();
        assert_eq!(
            errors,
            vec![
                GraphError::UnmetDependency { pipeline: "api".into(), missing: "lib".into() },
                GraphError::UnmetDependency { pipeline: "web".into(), missing: "lib".into() },
            ]
        );

        let completed = BTreeSet::from(["assets".to_string(), "lib".to_string()]);
        assert!(validate_schedule(&entries, &completed).is_ok());
    }
}
