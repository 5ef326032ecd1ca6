// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline and workspace definition loading.
//!
//! Definitions are YAML documents read with `serde_yaml` into loosely typed
//! structs, then validated into the types the runtime works with.
//!
//! # Pipeline definition
//! ```yaml
//! name: lib
//! version: 1.2.0
//! working-dir: out
//! backend-settings:
//!   command:
//!     build: make all
//! pipeline:
//!   - build:
//!       backend: command
//!       surroundings: [local, ci]
//! ```
//!
//! # Workspace definition
//! ```yaml
//! name: platform
//! scm: https://git.example.com
//! organizations: [platform, shared]
//! workspace:
//!   - core:
//!       - lib
//!       - api:
//!           needs: [lib]
//!   - tools:
//!       - executable: false
//!       - linters
//!   - deploy:
//!       needs: [api]
//!       head: main
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::actions::{ActionType, PipelineAction, Surrounding};
use crate::backends::BackendFactory;
use crate::config::consts::{
    DEFAULT_BUILD_NUMBER, DEFAULT_WORKING_DIR, PIPELINE_FILE_NAME, PIPELINE_FOLDER,
    WORKSPACE_FILE_NAME,
};
use crate::errors::ConfigError;
use crate::pipeline::PipelineContext;
use crate::workspace::WorkspacePipeline;

/// A string or a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Body of one entry in a pipeline's `pipeline` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActionDefinition {
    pub backend: Option<String>,
    #[serde(default)]
    pub backends: Vec<String>,
    #[serde(default)]
    pub surroundings: Vec<Surrounding>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDefinition {
    #[serde(skip)]
    pub path: PathBuf,
    pub name: Option<String>,
    #[serde(default)]
    pub scm: OneOrMany,
    pub version: Option<serde_yaml::Value>,
    pub head: Option<String>,
    #[serde(alias = "build_number")]
    pub build_number: Option<serde_yaml::Value>,
    #[serde(default)]
    pub maintainers: OneOrMany,
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub backend_settings: BTreeMap<String, Value>,
    pub pipeline: Option<Vec<BTreeMap<String, ActionDefinition>>>,
}

impl PipelineDefinition {
    pub fn name(&self) -> Result<&str, ConfigError> {
        self.name.as_deref().ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
            key: "name",
        })
    }

    /// Validated action list, in declared order.
    pub fn actions(&self, factory: &BackendFactory) -> Result<Vec<PipelineAction>, ConfigError> {
        let pipeline = self.name()?;
        let entries = self.pipeline.as_ref().ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
            key: "pipeline",
        })?;

        let mut actions = Vec::new();
        for (key, definition) in entries.iter().flatten() {
            let action_type: ActionType = key.parse().map_err(|_| ConfigError::UnknownActionType {
                pipeline: pipeline.to_string(),
                action: key.clone(),
            })?;

            let mut backends: Vec<String> = Vec::new();
            for backend in definition.backend.iter().chain(definition.backends.iter()) {
                if !backends.contains(backend) {
                    backends.push(backend.clone());
                }
            }
            if backends.is_empty() {
                return Err(ConfigError::NoBackends {
                    pipeline: pipeline.to_string(),
                    action: key.clone(),
                });
            }
            if let Some(unknown) = backends.iter().find(|b| !factory.is_backend_available(b)) {
                return Err(ConfigError::UnknownBackend {
                    pipeline: pipeline.to_string(),
                    backend: unknown.clone(),
                });
            }
            if definition.surroundings.is_empty() {
                return Err(ConfigError::NoSurroundings {
                    pipeline: pipeline.to_string(),
                    action: key.clone(),
                });
            }

            actions.push(PipelineAction {
                action_type,
                backends,
                surroundings: definition.surroundings.clone(),
                action_name: definition.name.clone(),
            });
        }
        Ok(actions)
    }

    /// Build the runtime context and action list for this definition.
    ///
    /// The working dir defaults to `<source>/<working-dir or "build">`. The
    /// version falls back to a `VERSION` file and then `<NAME>_VERSION`; the
    /// build number to `BUILD_NUMBER`; the head to `BRANCH_NAME`.
    pub fn resolve(
        &self,
        source_dir: &Path,
        working_dir: Option<&Path>,
        surrounding: Surrounding,
        factory: &BackendFactory,
    ) -> Result<(PipelineContext, Vec<PipelineAction>), ConfigError> {
        let actions = self.actions(factory)?;
        let name = self.name()?;

        let working_dir = match working_dir {
            Some(dir) => dir.to_path_buf(),
            None => source_dir.join(
                self.working_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_DIR)),
            ),
        };

        let mut context = PipelineContext::new(name, source_dir, working_dir, surrounding);
        context.scm = self.scm.clone().into_vec();
        context.maintainers = self.maintainers.clone().into_vec();
        context.version = self
            .version
            .as_ref()
            .and_then(scalar_to_string)
            .or_else(|| read_version_file(source_dir))
            .or_else(|| std::env::var(format!("{}_VERSION", name.to_uppercase())).ok());
        context.build_number = self
            .build_number
            .as_ref()
            .and_then(scalar_to_string)
            .or_else(|| std::env::var("BUILD_NUMBER").ok())
            .unwrap_or_else(|| DEFAULT_BUILD_NUMBER.to_string());
        context.head = self.head.clone().or_else(|| std::env::var("BRANCH_NAME").ok());
        context.user = current_user(surrounding);
        context.backend_settings = self.backend_settings.clone();

        Ok((context, actions))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EntryDefinition {
    #[serde(default)]
    needs: OneOrMany,
    head: Option<String>,
    executable: Option<bool>,
    external: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceDefinition {
    #[serde(skip)]
    pub path: PathBuf,
    pub name: Option<String>,
    pub scm: Option<String>,
    #[serde(default)]
    pub organizations: OneOrMany,
    pub organization: Option<String>,
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub backend_settings: BTreeMap<String, Value>,
    pub workspace: Option<Vec<serde_yaml::Value>>,
}

impl WorkspaceDefinition {
    pub fn name(&self) -> Result<&str, ConfigError> {
        self.name.as_deref().ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
            key: "name",
        })
    }

    /// `organizations` wins over the single `organization` key.
    pub fn organizations(&self) -> Vec<String> {
        let organizations = self.organizations.clone().into_vec();
        if organizations.is_empty() {
            self.organization.iter().cloned().collect()
        } else {
            organizations
        }
    }

    /// Entries keyed by group path; empty groups are omitted.
    pub fn groups(&self) -> Result<BTreeMap<String, Vec<WorkspacePipeline>>, ConfigError> {
        let items = self.workspace.as_ref().ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
            key: "workspace",
        })?;

        let mut groups = BTreeMap::new();
        let flags = GroupFlags {
            executable: true,
            external: false,
        };
        self.parse_group(items, "", flags, &mut groups)?;
        groups.retain(|_, entries: &mut Vec<WorkspacePipeline>| !entries.is_empty());

        let mut seen = BTreeSet::new();
        for entry in groups.values().flatten() {
            if !seen.insert(entry.name.as_str()) {
                return Err(self.invalid(format!("pipeline '{}' is declared twice", entry.name)));
            }
        }
        Ok(groups)
    }

    fn parse_group(
        &self,
        items: &[serde_yaml::Value],
        prefix: &str,
        mut flags: GroupFlags,
        groups: &mut BTreeMap<String, Vec<WorkspacePipeline>>,
    ) -> Result<(), ConfigError> {
        use serde_yaml::Value as Yaml;

        groups.entry(prefix.to_string()).or_default();
        for item in items {
            match item {
                Yaml::String(name) => {
                    let entry = flags.entry(name, prefix);
                    groups.entry(prefix.to_string()).or_default().push(entry);
                }
                Yaml::Sequence(nested) => self.parse_group(nested, prefix, flags, groups)?,
                Yaml::Mapping(mapping) => {
                    if mapping.len() == 1 {
                        if let Some(value) = mapping.get("executable").and_then(Yaml::as_bool) {
                            flags.executable = value;
                            continue;
                        }
                        if let Some(value) = mapping.get("external").and_then(Yaml::as_bool) {
                            flags.external = value;
                            continue;
                        }
                    }
                    for (key, value) in mapping {
                        let key = key
                            .as_str()
                            .ok_or_else(|| self.invalid(format!("non-string key {:?}", key)))?;
                        match value {
                            Yaml::Sequence(nested) => {
                                let path = join_group(prefix, key);
                                self.parse_group(nested, &path, flags, groups)?;
                            }
                            Yaml::Mapping(_) | Yaml::Null | Yaml::String(_) => {
                                let definition: EntryDefinition = match value {
                                    Yaml::Mapping(_) => serde_yaml::from_value(value.clone())
                                        .map_err(|e| self.invalid(format!("entry '{}': {}", key, e)))?,
                                    _ => EntryDefinition::default(),
                                };
                                let mut entry = flags.entry(key, prefix);
                                entry.needs = definition.needs.into_vec();
                                if let Some(head) = definition.head.filter(|h| !h.is_empty()) {
                                    entry.head = head;
                                }
                                entry.executable = definition.executable.unwrap_or(entry.executable);
                                entry.external = definition.external.unwrap_or(entry.external);
                                groups.entry(prefix.to_string()).or_default().push(entry);
                            }
                            other => {
                                return Err(self.invalid(format!(
                                    "entry '{}' has unsupported value {:?}",
                                    key, other
                                )))
                            }
                        }
                    }
                }
                other => return Err(self.invalid(format!("unsupported workspace item {:?}", other))),
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> ConfigError {
        ConfigError::Invalid {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Flags inherited by entries declared later in the same group.
#[derive(Debug, Clone, Copy)]
struct GroupFlags {
    executable: bool,
    external: bool,
}

impl GroupFlags {
    fn entry(&self, name: &str, path: &str) -> WorkspacePipeline {
        let mut entry = WorkspacePipeline::new(name, path);
        entry.executable = self.executable;
        entry.external = self.external;
        entry
    }
}

fn join_group(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read_version_file(source_dir: &Path) -> Option<String> {
    std::fs::read_to_string(source_dir.join("VERSION"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn current_user(surrounding: Surrounding) -> String {
    if surrounding == Surrounding::Ci {
        return "prod".to_string();
    }
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Locate `file_name` in `dir` or its `pipeline/` folder.
pub fn find_definition(dir: &Path, file_name: &str) -> Option<PathBuf> {
    [dir.join(file_name), dir.join(PIPELINE_FOLDER).join(file_name)]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_pipeline_definition(dir: &Path) -> Result<PipelineDefinition, ConfigError> {
    let path = find_definition(dir, PIPELINE_FILE_NAME)
        .ok_or_else(|| ConfigError::NotFound(dir.join(PIPELINE_FILE_NAME)))?;
    let mut definition: PipelineDefinition = read_yaml(&path)?;
    definition.path = path;
    Ok(definition)
}

pub fn load_workspace_definition(dir: &Path) -> Result<WorkspaceDefinition, ConfigError> {
    let path = find_definition(dir, WORKSPACE_FILE_NAME)
        .ok_or_else(|| ConfigError::NotFound(dir.join(WORKSPACE_FILE_NAME)))?;
    let mut definition: WorkspaceDefinition = read_yaml(&path)?;
    definition.path = path;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::command::CommandBackend;
    use crate::config::consts::DEFAULT_HEAD;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_pipeline_definition_resolves() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            PIPELINE_FILE_NAME,
            r#"
name: lib
version: 1.0
build_number: 42
head: develop
maintainers: ops@example.com
backend-settings:
  command:
    build: make
pipeline:
  - source:
      backend: command
      surroundings: [local, ci]
  - build:
      backends: [command]
      surroundings: [local]
      name: compile
"#,
        );

        let factory = BackendFactory::with_builtin();
        let definition = load_pipeline_definition(dir.path()).unwrap();
        let (context, actions) = definition
            .resolve(dir.path(), None, Surrounding::Local, &factory)
            .unwrap();

        assert_eq!(context.name, "lib");
        assert_eq!(context.version.as_deref(), Some("1.0"));
        assert_eq!(context.build_number, "42");
        assert_eq!(context.head.as_deref(), Some("develop"));
        assert_eq!(context.maintainers, vec!["ops@example.com"]);
        assert_eq!(context.working_dir, dir.path().join(DEFAULT_WORKING_DIR));
        assert!(context.backend_settings(CommandBackend::NAME).is_some());

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action_type, ActionType::Source);
        assert_eq!(actions[1].backends, vec!["command"]);
        assert_eq!(actions[1].action_name.as_deref(), Some("compile"));
    }

    #[test]
    fn test_pipeline_definition_in_pipeline_folder() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(PIPELINE_FOLDER)).unwrap();
        write(
            &dir.path().join(PIPELINE_FOLDER),
            PIPELINE_FILE_NAME,
            "name: nested\npipeline: []\n",
        );
        let definition = load_pipeline_definition(dir.path()).unwrap();
        assert_eq!(definition.name().unwrap(), "nested");
    }

    #[test]
    fn test_pipeline_definition_errors() {
        let factory = BackendFactory::with_builtin();
        let cases: Vec<(&str, fn(&ConfigError) -> bool)> = vec![
            ("pipeline: []\n", |e| matches!(e, ConfigError::MissingKey { key: "name", .. })),
            ("name: x\n", |e| matches!(e, ConfigError::MissingKey { key: "pipeline", .. })),
            (
                "name: x\npipeline:\n  - teleport:\n      backend: command\n      surroundings: [local]\n",
                |e| matches!(e, ConfigError::UnknownActionType { .. }),
            ),
            (
                "name: x\npipeline:\n  - build:\n      surroundings: [local]\n",
                |e| matches!(e, ConfigError::NoBackends { .. }),
            ),
            (
                "name: x\npipeline:\n  - build:\n      backend: nope\n      surroundings: [local]\n",
                |e| matches!(e, ConfigError::UnknownBackend { .. }),
            ),
            (
                "name: x\npipeline:\n  - build:\n      backend: command\n",
                |e| matches!(e, ConfigError::NoSurroundings { .. }),
            ),
        ];

        for (yaml, check) in cases {
            let dir = TempDir::new().unwrap();
            write(dir.path(), PIPELINE_FILE_NAME, yaml);
            let result = load_pipeline_definition(dir.path())
                .and_then(|d| d.resolve(dir.path(), None, Surrounding::Local, &factory));
            let error = result.err().unwrap_or_else(|| panic!("expected error for {}", yaml));
            assert!(check(&error), "unexpected error {:?} for {}", error, yaml);
        }
    }

    #[test]
    fn test_missing_definition() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_pipeline_definition(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_workspace_groups() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            WORKSPACE_FILE_NAME,
            r#"
name: platform
scm: https://git.example.com
organization: platform
workspace:
  - core:
      - lib
      - api:
          needs: [lib]
  - tools:
      - executable: false
      - linters
      - formatter:
          executable: true
  - vendored:
      - external: true
      - openssl
  - deploy:
      needs: api
      head: main
"#,
        );

        let definition = load_workspace_definition(dir.path()).unwrap();
        assert_eq!(definition.organizations(), vec!["platform"]);

        let groups = definition.groups().unwrap();
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["", "core", "tools", "vendored"]);

        let deploy = &groups[""][0];
        assert_eq!(deploy.needs, vec!["api"]);
        assert_eq!(deploy.head, "main");

        let api = &groups["core"][1];
        assert_eq!(api.name, "api");
        assert_eq!(api.head, DEFAULT_HEAD);
        assert_eq!(api.path, "core");

        let tools = &groups["tools"];
        assert!(!tools[0].executable);
        assert!(tools[1].executable);
        assert!(groups["vendored"][0].external);
    }

    #[test]
    fn test_workspace_nested_group_path() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            WORKSPACE_FILE_NAME,
            "name: ws\nworkspace:\n  - services:\n      - backend:\n          - auth\n",
        );
        let groups = load_workspace_definition(dir.path()).unwrap().groups().unwrap();
        assert_eq!(groups["services/backend"][0].name, "auth");
    }

    #[test]
    fn test_workspace_duplicate_entry_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            WORKSPACE_FILE_NAME,
            "name: ws\nworkspace:\n  - lib\n  - group:\n      - lib\n",
        );
        let result = load_workspace_definition(dir.path()).unwrap().groups();
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
