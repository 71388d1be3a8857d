use crate::fragment::{Fragment, Selection, Spread, SpreadSuffix};
use crate::FragmentGeneratorError;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::path::Path;

pub const PUBLIC_LISTING: &str = "PublicListing";
pub const PUBLIC: &str = "Public";
pub const ADMIN_LISTING: &str = "AdminListing";
pub const ADMIN: &str = "Admin";

/// Tier label → allowed field names, in the order the file declares them.
pub type Tiers = IndexMap<String, IndexSet<String>>;

/// Per-type field allow-lists, read from a JSON document shaped like
/// `{ "Post": { "PublicListing": ["id", "title"], "Admin": [...] } }`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TierConfig {
    types: IndexMap<String, Tiers>,
}

impl TierConfig {
    pub fn from_path(path: &Path) -> Result<Self, FragmentGeneratorError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            FragmentGeneratorError::TierConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&content).map_err(|err| match err {
            FragmentGeneratorError::TierConfig(msg) => {
                FragmentGeneratorError::TierConfig(format!("{}: {msg}", path.display()))
            }
            err => err,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, FragmentGeneratorError> {
        let config: TierConfig = serde_json::from_str(content)
            .map_err(|err| FragmentGeneratorError::TierConfig(err.to_string()))?;
        if config.types.is_empty() {
            return Err(FragmentGeneratorError::TierConfig("no types configured".into()));
        }
        Ok(config)
    }

    pub fn tiers(&self, type_name: &str) -> Option<&Tiers> {
        self.types.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Sibling fragment a tier builds on, if any.
fn leading_spread(type_name: &str, tier_label: &str) -> Option<Spread> {
    let base = match tier_label {
        ADMIN => ADMIN_LISTING,
        ADMIN_LISTING | PUBLIC => PUBLIC_LISTING,
        _ => return None,
    };
    Some(Spread::new(type_name, SpreadSuffix::Tier(base.into())))
}

fn deep_spreads(selections: &mut [Selection]) -> impl Iterator<Item = &mut Spread> {
    selections.iter_mut().filter_map(|selection| match selection {
        Selection::Nested { spread, .. } if spread.suffix == SpreadSuffix::DeepNesting => {
            Some(spread)
        }
        _ => None,
    })
}

/// Rewrites pending deep spreads. Targets with tiers first get the listing
/// fragment matching the current tier, then everything left becomes `Full`.
fn resolve_deep_spreads(
    selections: &mut [Selection],
    tier_label: Option<&str>,
    tier_config: Option<&TierConfig>,
) {
    let listing = match tier_label {
        Some(label) if label.contains(ADMIN) => ADMIN_LISTING,
        _ => PUBLIC_LISTING,
    };
    if let Some(tier_config) = tier_config {
        for spread in deep_spreads(selections) {
            if tier_config.tiers(&spread.type_name).is_some() {
                spread.suffix = SpreadSuffix::Tier(listing.into());
            }
        }
    }
    for spread in deep_spreads(selections) {
        spread.suffix = SpreadSuffix::Full;
    }
}

/// Turns the deep selections of one type into its `Full` fragment, or into
/// one fragment per configured tier.
pub fn expand(
    type_name: &str,
    deep: &[Selection],
    tier_config: Option<&TierConfig>,
) -> Vec<Fragment> {
    if deep.is_empty() {
        return Vec::new();
    }

    let Some(tiers) = tier_config.and_then(|config| config.tiers(type_name)) else {
        let mut selections = deep.to_vec();
        resolve_deep_spreads(&mut selections, None, tier_config);
        return vec![Fragment::new(
            format!("{type_name}Full"),
            type_name,
            &selections,
        )];
    };

    let mut fragments = Vec::with_capacity(tiers.len());
    for (tier_label, allowed) in tiers {
        let mut selections: Vec<Selection> = leading_spread(type_name, tier_label)
            .map(Selection::Spread)
            .into_iter()
            .collect();
        selections.extend(
            deep.iter()
                .filter(|selection| {
                    selection
                        .field_name()
                        .is_some_and(|field| allowed.contains(field))
                })
                .cloned(),
        );
        if selections.is_empty() {
            tracing::debug!("tier {tier_label} of {type_name} selects no fields, skipping");
            continue;
        }
        resolve_deep_spreads(&mut selections, Some(tier_label.as_str()), tier_config);
        fragments.push(Fragment::new(
            format!("{type_name}{tier_label}"),
            type_name,
            &selections,
        ));
    }
    fragments
}
