use crate::config::{
    FragmentsExtension, GraphQLConfig, ProjectConfig, BUNDLE_EXTENSION, LEGACY_BUNDLE_EXTENSION,
    TIERS_EXTENSION,
};
use crate::output::{assemble, Generator, Output};
use crate::tiers::TierConfig;
use crate::FragmentGeneratorError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings given on the command line. Each one wins over the project config.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub schema: Option<PathBuf>,
    pub generator: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub tiers: Option<PathBuf>,
}

/// Everything one project's run needs, resolved up front.
#[derive(Debug)]
pub struct ProjectContext {
    pub name: String,
    pub schema_path: PathBuf,
    pub generator_label: String,
    pub generator: Generator,
    pub output: PathBuf,
    /// `output` as it is stored back into the project config.
    pub output_setting: String,
    pub tier_config: Option<TierConfig>,
}

impl ProjectContext {
    pub fn resolve(
        config: &GraphQLConfig,
        name: &str,
        overrides: &Overrides,
    ) -> Result<Self, FragmentGeneratorError> {
        let project = find_project(config, name)?;
        let extension = project.fragments_extension()?.unwrap_or_default();

        let generator_label = overrides
            .generator
            .clone()
            .or(extension.generator)
            .ok_or_else(|| {
                FragmentGeneratorError::ConfigResolution(format!(
                    "generator cannot be determined for project {name}"
                ))
            })?;
        let generator = Generator::from_label(&generator_label);

        let (output, output_setting) = match (&overrides.output_dir, extension.output) {
            (Some(dir), _) => {
                let path = dir.join(format!("{name}.fragments.{}", generator.extension()));
                let setting = config.relative_path(&path)?.display().to_string();
                (path, setting)
            }
            (None, Some(output)) => (config.resolve_path(&output), output),
            (None, None) => {
                return Err(FragmentGeneratorError::ConfigResolution(format!(
                    "output path cannot be determined for project {name}"
                )))
            }
        };

        let schema_path = resolve_schema_path(config, project, overrides)?;

        let tiers_path = overrides.tiers.clone().or_else(|| {
            project
                .extension_path(TIERS_EXTENSION)
                .map(|path| config.resolve_path(path))
        });
        let tier_config = tiers_path
            .map(|path| TierConfig::from_path(&path))
            .transpose()?;

        Ok(Self {
            name: name.into(),
            schema_path,
            generator_label,
            generator,
            output,
            output_setting,
            tier_config,
        })
    }

    pub fn fragments_extension(&self) -> FragmentsExtension {
        FragmentsExtension {
            output: Some(self.output_setting.clone()),
            generator: Some(self.generator_label.clone()),
        }
    }
}

fn find_project<'a>(
    config: &'a GraphQLConfig,
    name: &str,
) -> Result<&'a ProjectConfig, FragmentGeneratorError> {
    config.project(name).ok_or_else(|| {
        FragmentGeneratorError::ConfigResolution(format!(
            "no project {name} in {}",
            config.path().display()
        ))
    })
}

/// A project without its own settings is only processed when asked for by
/// name or when the generator comes from the command line.
pub fn should_skip(
    config: &GraphQLConfig,
    name: &str,
    overrides: &Overrides,
    explicit: bool,
) -> Result<bool, FragmentGeneratorError> {
    if explicit || overrides.generator.is_some() {
        return Ok(false);
    }
    Ok(find_project(config, name)?.fragments_extension()?.is_none())
}

/// Picks the schema from, in order: the command line, the bundle output, the
/// legacy bundle output, the project's `schemaPath`.
pub fn resolve_schema_path(
    config: &GraphQLConfig,
    project: &ProjectConfig,
    overrides: &Overrides,
) -> Result<PathBuf, FragmentGeneratorError> {
    let path = overrides
        .schema
        .clone()
        .or_else(|| {
            [BUNDLE_EXTENSION, LEGACY_BUNDLE_EXTENSION]
                .into_iter()
                .find_map(|key| project.extension_path(key))
                .map(|path| config.resolve_path(path))
        })
        .or_else(|| {
            project
                .schema_path
                .as_ref()
                .map(|path| config.resolve_path(path))
        })
        .ok_or_else(|| {
            FragmentGeneratorError::SchemaResolution("input schema cannot be determined".into())
        })?;

    if !matches!(
        path.extension().and_then(OsStr::to_str),
        Some("graphql" | "gql")
    ) {
        return Err(FragmentGeneratorError::SchemaResolution(format!(
            "input schema {} must have a .graphql or .gql extension",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(FragmentGeneratorError::SchemaResolution(format!(
            "input schema {} does not exist",
            path.display()
        )));
    }
    Ok(path)
}

/// Generates and writes one project's fragments. Returns the written file, or
/// the directory for per-fragment output.
pub fn run(ctx: &ProjectContext) -> Result<PathBuf, FragmentGeneratorError> {
    let schema_content = fs::read_to_string(&ctx.schema_path)?;
    let fragments = crate::generate(&schema_content, ctx.tier_config.as_ref())?;
    tracing::debug!(
        "project {}: {} default, {} no-nesting, {} full fragments",
        ctx.name,
        fragments.default.len(),
        fragments.no_relations.len(),
        fragments.deep.len()
    );
    write_output(&assemble(&fragments, ctx.generator), &ctx.output)
}

/// Writes are not atomic; a failure can leave some files behind.
pub fn write_output(output: &Output, path: &Path) -> Result<PathBuf, FragmentGeneratorError> {
    let dir = path.parent().unwrap_or(Path::new(""));
    fs::create_dir_all(dir)?;
    match output {
        Output::Bundle(contents) => {
            fs::write(path, contents)?;
            Ok(path.into())
        }
        Output::Files(files) => {
            for file in files {
                fs::write(dir.join(&file.file_name), &file.contents)?;
            }
            Ok(dir.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CONFIG_FILE, DEFAULT_PROJECT};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use indoc::indoc;

    const SCHEMA: &str = indoc! {"
        type Query {
          posts: [Post!]!
        }

        type Post {
          id: ID!
          title: String!
        }
    "};

    fn config_with(dir: &TempDir, content: &str) -> GraphQLConfig {
        let file = dir.child(DEFAULT_CONFIG_FILE);
        file.write_str(content).unwrap();
        GraphQLConfig::load(file.path()).unwrap()
    }

    #[test]
    fn schema_path_prefers_bundle_output() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        dir.child("build/bundle.graphql").write_str(SCHEMA).unwrap();
        let config = config_with(
            &dir,
            r#"{ "schemaPath": "schema.graphql", "extensions": { "bundle": "build/old.graphql", "prepare-bundle": "build/bundle.graphql" } }"#,
        );
        let project = config.project(DEFAULT_PROJECT).unwrap();

        let path = resolve_schema_path(&config, project, &Overrides::default()).unwrap();
        assert_eq!(path, dir.path().join("build/bundle.graphql"));

        let overrides = Overrides {
            schema: Some(dir.path().join("schema.graphql")),
            ..Default::default()
        };
        let path = resolve_schema_path(&config, project, &overrides).unwrap();
        assert_eq!(path, dir.path().join("schema.graphql"));
    }

    #[test]
    fn schema_path_errors() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.json").write_str("{}").unwrap();

        let config = config_with(&dir, "{}");
        let project = config.project(DEFAULT_PROJECT).unwrap();
        let err = resolve_schema_path(&config, project, &Overrides::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema resolution error: input schema cannot be determined"
        );

        let config = config_with(&dir, r#"{ "schemaPath": "schema.json" }"#);
        let project = config.project(DEFAULT_PROJECT).unwrap();
        let err = resolve_schema_path(&config, project, &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("must have a .graphql or .gql extension"));

        let config = config_with(&dir, r#"{ "schemaPath": "missing.gql" }"#);
        let project = config.project(DEFAULT_PROJECT).unwrap();
        let err = resolve_schema_path(&config, project, &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn context_derives_output_from_output_dir() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        let config = config_with(
            &dir,
            r#"{ "projects": { "app": { "schemaPath": "schema.graphql" } } }"#,
        );
        let overrides = Overrides {
            generator: Some("js".into()),
            output_dir: Some(dir.path().join("generated")),
            ..Default::default()
        };

        let ctx = ProjectContext::resolve(&config, "app", &overrides).unwrap();
        assert_eq!(ctx.generator, Generator::SourceModule);
        assert_eq!(ctx.output, dir.path().join("generated/app.fragments.js"));
        assert_eq!(
            ctx.fragments_extension(),
            FragmentsExtension {
                output: Some(
                    Path::new("generated")
                        .join("app.fragments.js")
                        .display()
                        .to_string()
                ),
                generator: Some("js".into()),
            }
        );
        assert!(ctx.tier_config.is_none());
    }

    #[test]
    fn saved_output_resolves_to_written_file() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        let config = config_with(&dir, r#"{ "schemaPath": "schema.graphql" }"#);
        let elsewhere = TempDir::new().unwrap();
        let overrides = Overrides {
            generator: Some("graphql".into()),
            output_dir: Some(elsewhere.path().into()),
            ..Default::default()
        };

        let ctx = ProjectContext::resolve(&config, DEFAULT_PROJECT, &overrides).unwrap();
        let setting = ctx.fragments_extension().output.unwrap();
        assert!(Path::new(&setting).is_absolute());
        assert_eq!(config.resolve_path(&setting), ctx.output);
    }

    #[test]
    fn context_requires_generator_and_output() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        let config = config_with(&dir, r#"{ "schemaPath": "schema.graphql" }"#);

        let err = ProjectContext::resolve(&config, DEFAULT_PROJECT, &Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("generator cannot be determined"));

        let overrides = Overrides {
            generator: Some("graphql".into()),
            ..Default::default()
        };
        let err = ProjectContext::resolve(&config, DEFAULT_PROJECT, &overrides).unwrap_err();
        assert!(err.to_string().contains("output path cannot be determined"));
    }

    #[test]
    fn unknown_generator_writes_single_document() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        let config = config_with(
            &dir,
            r#"{ "schemaPath": "schema.graphql", "extensions": { "generate-fragments": { "generator": "typescript", "output": "out/fragments.txt" } } }"#,
        );

        let ctx = ProjectContext::resolve(&config, DEFAULT_PROJECT, &Overrides::default()).unwrap();
        assert_eq!(ctx.generator, Generator::SingleDocument);
        assert_eq!(ctx.fragments_extension().generator.as_deref(), Some("typescript"));

        let written = run(&ctx).unwrap();
        assert_eq!(written, dir.path().join("out/fragments.txt"));
        let written = fs::read_to_string(written).unwrap();
        assert!(written.starts_with("# This file was automatically generated"));
        assert!(written.contains("fragment PostFull on Post {"));
    }

    #[test]
    fn multi_file_writes_full_fragments_next_to_output() {
        let dir = TempDir::new().unwrap();
        dir.child("schema.graphql").write_str(SCHEMA).unwrap();
        dir.child("tiers.json")
            .write_str(r#"{ "Post": { "PublicListing": ["id"], "Admin": ["id", "title"] } }"#)
            .unwrap();
        let config = config_with(
            &dir,
            r#"{ "schemaPath": "schema.graphql", "extensions": { "fragment-tiers": "tiers.json", "generate-fragments": { "generator": "gql", "output": "fragments/all.gql" } } }"#,
        );

        let ctx = ProjectContext::resolve(&config, DEFAULT_PROJECT, &Overrides::default()).unwrap();
        assert!(ctx.tier_config.is_some());
        let written = run(&ctx).unwrap();
        assert_eq!(written, dir.path().join("fragments"));

        dir.child("fragments/PostPublicListing.gql").assert(indoc! {"
            fragment PostPublicListing on Post {
              id
            }
        "});
        dir.child("fragments/PostAdmin.gql").assert(indoc! {"
            fragment PostAdmin on Post {
              ...PostAdminListing
              id
              title
            }
        "});
        dir.child("fragments/Post.gql")
            .assert(predicates::path::missing());
        dir.child("fragments/all.gql").assert(predicates::path::missing());
    }

    #[test]
    fn skip_only_unconfigured_implicit_projects() {
        let dir = TempDir::new().unwrap();
        let config = config_with(
            &dir,
            r#"{ "projects": { "app": {}, "db": { "extensions": { "generate-fragments": {} } } } }"#,
        );
        let none = Overrides::default();
        assert!(should_skip(&config, "app", &none, false).unwrap());
        assert!(!should_skip(&config, "app", &none, true).unwrap());
        assert!(!should_skip(&config, "db", &none, false).unwrap());
        let with_generator = Overrides {
            generator: Some("js".into()),
            ..Default::default()
        };
        assert!(!should_skip(&config, "app", &with_generator, false).unwrap());
    }
}
