use crate::FragmentGeneratorError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".graphqlconfig";
pub const DEFAULT_PROJECT: &str = "default";

/// Where this tool keeps its per-project settings.
pub const FRAGMENTS_EXTENSION: &str = "generate-fragments";
/// Older key for the same settings, dropped on save.
pub const LEGACY_FRAGMENTS_EXTENSION: &str = "fragments";
pub const TIERS_EXTENSION: &str = "fragment-tiers";
pub const BUNDLE_EXTENSION: &str = "prepare-bundle";
pub const LEGACY_BUNDLE_EXTENSION: &str = "bundle";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FragmentsExtension {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub generator: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
    /// Keys this tool doesn't use; kept so a save doesn't lose them.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ProjectConfig {
    pub fn fragments_extension(
        &self,
    ) -> Result<Option<FragmentsExtension>, FragmentGeneratorError> {
        self.extensions
            .get(FRAGMENTS_EXTENSION)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|err| {
                    FragmentGeneratorError::ConfigResolution(format!(
                        "invalid '{FRAGMENTS_EXTENSION}' extension: {err}"
                    ))
                })
            })
            .transpose()
    }

    pub fn set_fragments_extension(&mut self, extension: &FragmentsExtension) {
        self.extensions.remove(LEGACY_FRAGMENTS_EXTENSION);
        let mut value = Map::new();
        if let Some(output) = &extension.output {
            value.insert("output".into(), Value::String(output.clone()));
        }
        if let Some(generator) = &extension.generator {
            value.insert("generator".into(), Value::String(generator.clone()));
        }
        self.extensions
            .insert(FRAGMENTS_EXTENSION.into(), Value::Object(value));
    }

    /// A path-valued extension, given either as a string or as
    /// `{ "output": "..." }`.
    pub fn extension_path(&self, key: &str) -> Option<&str> {
        match self.extensions.get(key)? {
            Value::String(path) => Some(path.as_str()),
            Value::Object(object) => object.get("output")?.as_str(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(flatten)]
    root: ProjectConfig,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    projects: IndexMap<String, ProjectConfig>,
}

/// A `.graphqlconfig` file. Without a `projects` map the top level is the
/// single project [`DEFAULT_PROJECT`].
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQLConfig {
    path: PathBuf,
    file: ConfigFile,
}

impl GraphQLConfig {
    pub fn load(path: &Path) -> Result<Self, FragmentGeneratorError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            FragmentGeneratorError::ConfigResolution(format!(
                "cannot read {}: {err}",
                path.display()
            ))
        })?;
        let file = serde_json::from_str(&content).map_err(|err| {
            FragmentGeneratorError::ConfigResolution(format!("{}: {err}", path.display()))
        })?;
        Ok(Self {
            path: path.into(),
            file,
        })
    }

    /// An empty config that will be written to `path` if saved.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.into(),
            file: ConfigFile::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project_names(&self) -> Vec<String> {
        if self.file.projects.is_empty() {
            vec![DEFAULT_PROJECT.into()]
        } else {
            self.file.projects.keys().cloned().collect()
        }
    }

    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        if self.file.projects.is_empty() {
            (name == DEFAULT_PROJECT).then_some(&self.file.root)
        } else {
            self.file.projects.get(name)
        }
    }

    pub fn project_mut(&mut self, name: &str) -> Option<&mut ProjectConfig> {
        if self.file.projects.is_empty() {
            (name == DEFAULT_PROJECT).then_some(&mut self.file.root)
        } else {
            self.file.projects.get_mut(name)
        }
    }

    /// Resolves a path from the config against the config file's directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match self.path.parent() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.into(),
        }
    }

    /// Turns a path relative to the working directory into one that
    /// [`resolve_path`](Self::resolve_path) maps back to the same file:
    /// relative to the config file's directory when it lies below it,
    /// absolute otherwise.
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf, FragmentGeneratorError> {
        let cwd = std::env::current_dir()?;
        let path = cwd.join(path);
        let config_dir = cwd.join(self.path.parent().unwrap_or(Path::new("")));
        Ok(match path.strip_prefix(&config_dir) {
            Ok(relative) => relative.into(),
            Err(_) => path,
        })
    }

    pub fn save(&self) -> Result<(), FragmentGeneratorError> {
        let mut content = serde_json::to_string_pretty(&self.file).map_err(|err| {
            FragmentGeneratorError::ConfigResolution(format!("cannot serialize config: {err}"))
        })?;
        content.push('\n');
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use indoc::indoc;

    #[test]
    fn single_project_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(DEFAULT_CONFIG_FILE);
        file.write_str(indoc! {r#"
            {
              "schemaPath": "schema.graphql",
              "extensions": {
                "generate-fragments": { "output": "fragments.js", "generator": "js" }
              }
            }
        "#})
        .unwrap();

        let config = GraphQLConfig::load(file.path()).unwrap();
        assert_eq!(config.project_names(), vec![DEFAULT_PROJECT.to_string()]);
        let project = config.project(DEFAULT_PROJECT).unwrap();
        assert_eq!(project.schema_path, Some(PathBuf::from("schema.graphql")));
        assert_eq!(
            project.fragments_extension().unwrap(),
            Some(FragmentsExtension {
                output: Some("fragments.js".into()),
                generator: Some("js".into()),
            })
        );
        assert_eq!(
            config.resolve_path("schema.graphql"),
            dir.path().join("schema.graphql")
        );
    }

    #[test]
    fn multi_project_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(DEFAULT_CONFIG_FILE);
        file.write_str(indoc! {r#"
            {
              "projects": {
                "app": { "schemaPath": "app.graphql" },
                "database": {
                  "schemaPath": "db.graphql",
                  "extensions": { "prepare-bundle": "build/db.graphql", "bundle": { "output": "old.graphql" } }
                }
              }
            }
        "#})
        .unwrap();

        let config = GraphQLConfig::load(file.path()).unwrap();
        assert_eq!(config.project_names(), vec!["app", "database"]);
        assert!(config.project(DEFAULT_PROJECT).is_none());
        let database = config.project("database").unwrap();
        assert_eq!(
            database.extension_path(BUNDLE_EXTENSION),
            Some("build/db.graphql")
        );
        assert_eq!(
            database.extension_path(LEGACY_BUNDLE_EXTENSION),
            Some("old.graphql")
        );
        assert_eq!(config.project("app").unwrap().fragments_extension().unwrap(), None);
    }

    #[test]
    fn save_replaces_legacy_extension_and_keeps_unknown_keys() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(DEFAULT_CONFIG_FILE);
        file.write_str(indoc! {r#"
            {
              "schemaPath": "schema.graphql",
              "includes": ["src/**/*.graphql"],
              "extensions": { "fragments": { "output": "old.js" }, "endpoints": {} }
            }
        "#})
        .unwrap();

        let mut config = GraphQLConfig::load(file.path()).unwrap();
        config
            .project_mut(DEFAULT_PROJECT)
            .unwrap()
            .set_fragments_extension(&FragmentsExtension {
                output: Some("out/default.fragments.graphql".into()),
                generator: Some("graphql".into()),
            });
        config.save().unwrap();

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(saved["includes"], serde_json::json!(["src/**/*.graphql"]));
        assert!(saved["extensions"].get(LEGACY_FRAGMENTS_EXTENSION).is_none());
        assert_eq!(saved["extensions"]["endpoints"], serde_json::json!({}));
        assert_eq!(
            saved["extensions"][FRAGMENTS_EXTENSION],
            serde_json::json!({
                "output": "out/default.fragments.graphql",
                "generator": "graphql"
            })
        );
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child(DEFAULT_CONFIG_FILE);
        file.write_str("{ \"schemaPath\": ").unwrap();
        assert!(matches!(
            GraphQLConfig::load(file.path()),
            Err(FragmentGeneratorError::ConfigResolution(_))
        ));
    }
}
