// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet};

use crate::workspace::WorkspacePipeline;

/// Pick the entries a workspace operation applies to.
///
/// A filter matches either a group path (selecting the whole group) or a
/// pipeline name. No filters selects everything. With `recursive`, the
/// needs of every selected entry are selected too, transitively. Entries
/// that are not executable or are external are dropped last.
pub fn select_candidates(
    groups: &BTreeMap<String, Vec<WorkspacePipeline>>,
    filters: &[String],
    recursive: bool,
) -> Vec<WorkspacePipeline> {
    let mut selected: BTreeMap<&str, &WorkspacePipeline> = BTreeMap::new();

    if filters.is_empty() {
        for entry in groups.values().flatten() {
            selected.insert(&entry.name, entry);
        }
    } else {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut pending: Vec<&str> = filters.iter().map(String::as_str).collect();
        while let Some(filter) = pending.pop() {
            if !seen.insert(filter) {
                continue;
            }
            let matched: Vec<&WorkspacePipeline> = match groups.get(filter) {
                Some(group) => group.iter().collect(),
                None => groups.values().flatten().filter(|e| e.name == filter).collect(),
            };
            for entry in matched {
                selected.insert(&entry.name, entry);
                if recursive {
                    pending.extend(entry.needs.iter().map(String::as_str));
                }
            }
        }
    }

    selected
        .into_values()
        .filter(|entry| entry.is_schedulable())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> BTreeMap<String, Vec<WorkspacePipeline>> {
        let mut tools = WorkspacePipeline::new("tools", "infra");
        tools.executable = false;
        let mut vendor = WorkspacePipeline::new("vendor", "infra");
        vendor.external = true;

        BTreeMap::from([
            (
                "core".to_string(),
                vec![
                    WorkspacePipeline::new("lib", "core").needing(&["vendor"]),
                    WorkspacePipeline::new("build", "core").needing(&["lib"]),
                ],
            ),
            (
                "".to_string(),
                vec![WorkspacePipeline::new("deploy", "").needing(&["build", "tools"])],
            ),
            ("infra".to_string(), vec![tools, vendor]),
        ])
    }

    fn names(entries: &[WorkspacePipeline]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_selection_table() {
        let groups = groups();
        let cases: Vec<(Vec<&str>, bool, Vec<&str>)> = vec![
            (vec![], false, vec!["build", "deploy", "lib"]),
            (vec!["core"], false, vec!["build", "lib"]),
            (vec!["deploy"], false, vec!["deploy"]),
            (vec!["deploy"], true, vec!["build", "deploy", "lib"]),
            (vec!["infra"], false, vec![]),
            (vec!["nothing"], true, vec![]),
        ];
        for (filters, recursive, expected) in cases {
            let filters: Vec<String> = filters.iter().map(|f| f.to_string()).collect();
            let selected = select_candidates(&groups, &filters, recursive);
            assert_eq!(names(&selected), expected, "filters {:?} recursive {}", filters, recursive);
        }
    }

    #[test]
    fn test_recursive_selection_survives_cycles() {
        let groups = BTreeMap::from([(
            "".to_string(),
            vec![
                WorkspacePipeline::new("a", "").needing(&["b"]),
                WorkspacePipeline::new("b", "").needing(&["a"]),
            ],
        )]);
        let selected = select_candidates(&groups, &["a".to_string()], true);
        assert_eq!(names(&selected), vec!["a", "b"]);
    }
}
