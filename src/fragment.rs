use crate::schema::{FieldDescriptor, FieldKind, ObjectType, TypeSystem};
use crate::FragmentGeneratorError;
use std::fmt;

const INDENT: &str = "  ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentMode {
    /// Relations are spread with the target's `NoNesting` fragment.
    Default,
    /// Relations are left out.
    NoRelations,
    /// Relations are spread recursively, resolved later by tier.
    Deep,
}

impl FragmentMode {
    /// Suffix of the fragment built for this mode. Deep fragments have none
    /// of their own; the tier expander names them.
    pub fn fragment_suffix(self) -> Option<&'static str> {
        match self {
            FragmentMode::Default => Some(""),
            FragmentMode::NoRelations => Some("NoNesting"),
            FragmentMode::Deep => None,
        }
    }

    fn spread_suffix(self) -> Option<SpreadSuffix> {
        match self {
            FragmentMode::Default => Some(SpreadSuffix::NoNesting),
            FragmentMode::NoRelations => None,
            FragmentMode::Deep => Some(SpreadSuffix::DeepNesting),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpreadSuffix {
    NoNesting,
    /// Placeholder for a deep spread whose tier is not known yet.
    DeepNesting,
    Full,
    Tier(String),
}

impl SpreadSuffix {
    pub fn as_str(&self) -> &str {
        match self {
            SpreadSuffix::NoNesting => "NoNesting",
            SpreadSuffix::DeepNesting => "DeepNesting",
            SpreadSuffix::Full => "Full",
            SpreadSuffix::Tier(label) => label,
        }
    }
}

/// A `...<Type><Suffix>` fragment spread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spread {
    pub type_name: String,
    pub suffix: SpreadSuffix,
}

impl Spread {
    pub fn new(type_name: &str, suffix: SpreadSuffix) -> Self {
        Self {
            type_name: type_name.into(),
            suffix,
        }
    }

    pub fn fragment_name(&self) -> String {
        format!("{}{}", self.type_name, self.suffix.as_str())
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...{}", self.fragment_name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Field(String),
    Nested { field: String, spread: Spread },
    Spread(Spread),
}

impl Selection {
    /// The selected field's name; `None` for a bare spread.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Selection::Field(field) | Selection::Nested { field, .. } => Some(field.as_str()),
            Selection::Spread(_) => None,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = INDENT.repeat(depth);
        match self {
            Selection::Field(field) => writeln!(f, "{indent}{field}"),
            Selection::Spread(spread) => writeln!(f, "{indent}{spread}"),
            Selection::Nested { field, spread } => {
                writeln!(f, "{indent}{field} {{")?;
                writeln!(f, "{indent}{INDENT}{spread}")?;
                writeln!(f, "{indent}}}")
            }
        }
    }
}

/// A rendered fragment definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    name: String,
    body: String,
}

impl Fragment {
    pub fn new(name: String, type_name: &str, selections: &[Selection]) -> Self {
        let body = FragmentBody {
            name: &name,
            type_name,
            selections,
        }
        .to_string();
        Self { name, body }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

struct FragmentBody<'a> {
    name: &'a str,
    type_name: &'a str,
    selections: &'a [Selection],
}

impl fmt::Display for FragmentBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fragment {} on {} {{", self.name, self.type_name)?;
        for selection in self.selections {
            selection.write(f, 1)?;
        }
        write!(f, "}}")
    }
}

/// Every fragment of one run, grouped by the mode that produced it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentSet {
    pub default: Vec<Fragment>,
    pub no_relations: Vec<Fragment>,
    pub deep: Vec<Fragment>,
}

impl FragmentSet {
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.default
            .iter()
            .chain(&self.no_relations)
            .chain(&self.deep)
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.iter().find(|fragment| fragment.name() == name)
    }
}

/// Prints one field for `mode`, or `None` when the field is left out.
pub fn print_field(
    type_system: &TypeSystem,
    owner: &str,
    field: &FieldDescriptor,
    mode: FragmentMode,
) -> Result<Option<Selection>, FragmentGeneratorError> {
    Ok(match type_system.classify(owner, field)? {
        FieldKind::Scalar | FieldKind::Enum => Some(Selection::Field(field.name.clone())),
        FieldKind::Object(target) => mode.spread_suffix().map(|suffix| Selection::Nested {
            field: field.name.clone(),
            spread: Spread::new(&target, suffix),
        }),
        FieldKind::Other(_) => None,
    })
}

/// Printable fields of `object` in declaration order. Empty when nothing is
/// printable in this mode, in which case no fragment is emitted.
pub fn build_selections(
    type_system: &TypeSystem,
    object: &ObjectType,
    mode: FragmentMode,
) -> Result<Vec<Selection>, FragmentGeneratorError> {
    let mut selections = Vec::new();
    for field in &object.fields {
        if let Some(selection) = print_field(type_system, &object.name, field, mode)? {
            selections.push(selection);
        }
    }
    Ok(selections)
}

/// Builds the `Default` or `NoRelations` fragment of `object`. Always `None`
/// in `Deep` mode: those selections go through the tier expander instead.
pub fn build(
    type_system: &TypeSystem,
    object: &ObjectType,
    mode: FragmentMode,
) -> Result<Option<Fragment>, FragmentGeneratorError> {
    let Some(suffix) = mode.fragment_suffix() else {
        return Ok(None);
    };
    let selections = build_selections(type_system, object, mode)?;
    if selections.is_empty() {
        return Ok(None);
    }
    let name = format!("{}{suffix}", object.name);
    Ok(Some(Fragment::new(name, &object.name, &selections)))
}
