pub mod config;
pub mod fragment;
pub mod output;
pub mod project;
pub mod schema;
pub mod tiers;


use fragment::{FragmentMode, FragmentSet};
use schema::TypeSystem;
use std::collections::HashSet;
use thiserror::Error;
use tiers::TierConfig;

pub use output::{assemble, Generator, Output, OutputFile};

#[derive(Error, Debug)]
pub enum FragmentGeneratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at index {0}: \"{1}\", {2}")]
    Parse(usize, String, String),

    #[error("Schema error: {0}")]
    Schema(&'static str),

    #[error("Cannot classify field {type_name}.{field_name}: unknown type {named_type}")]
    FieldClassification {
        type_name: String,
        field_name: String,
        named_type: String,
    },

    #[error("Tier config error: {0}")]
    TierConfig(String),

    #[error("Config error: {0}")]
    ConfigResolution(String),

    #[error("Schema resolution error: {0}")]
    SchemaResolution(String),

    #[error("Duplicate fragment name: {0}")]
    DuplicateFragment(String),
}

struct FragmentGenerator<'a> {
    type_system: &'a TypeSystem,
    tier_config: Option<&'a TierConfig>,
    fragments: FragmentSet,
}

/// Generates the default, no-relations and deep/tiered fragments of every
/// object type in the schema.
pub fn generate(
    schema_content: &str,
    tier_config: Option<&TierConfig>,
) -> Result<FragmentSet, FragmentGeneratorError> {
    let type_system = TypeSystem::parse(schema_content)?;
    FragmentGenerator::new(&type_system, tier_config).execute()
}

impl<'a> FragmentGenerator<'a> {
    fn new(type_system: &'a TypeSystem, tier_config: Option<&'a TierConfig>) -> Self {
        Self {
            type_system,
            tier_config,
            fragments: FragmentSet::default(),
        }
    }

    fn execute(mut self) -> Result<FragmentSet, FragmentGeneratorError> {
        if let Some(tier_config) = self.tier_config {
            for type_name in tier_config.type_names() {
                if self.type_system.object(type_name).is_none() {
                    tracing::warn!("tier config names unknown object type {type_name}");
                }
            }
        }

        for object in self.type_system.fragment_types() {
            for mode in [FragmentMode::Default, FragmentMode::NoRelations] {
                if let Some(fragment) = fragment::build(self.type_system, object, mode)? {
                    match mode {
                        FragmentMode::Default => self.fragments.default.push(fragment),
                        _ => self.fragments.no_relations.push(fragment),
                    }
                }
            }

            let deep = fragment::build_selections(self.type_system, object, FragmentMode::Deep)?;
            self.fragments
                .deep
                .extend(tiers::expand(&object.name, &deep, self.tier_config));
        }

        check_unique_names(&self.fragments)?;
        Ok(self.fragments)
    }
}

fn check_unique_names(fragments: &FragmentSet) -> Result<(), FragmentGeneratorError> {
    let mut names = HashSet::new();
    for fragment in fragments.iter() {
        if !names.insert(fragment.name()) {
            return Err(FragmentGeneratorError::DuplicateFragment(
                fragment.name().into(),
            ));
        }
    }
    Ok(())
}
