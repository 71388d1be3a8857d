use crate::fragment::{Fragment, FragmentSet};
use std::fmt;

const BANNER: &str = "This file was automatically generated and should not be edited.";

/// Output format selected by a project's `generator` label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generator {
    /// One JS module exporting each fragment as a template-literal constant.
    SourceModule,
    /// One GraphQL document holding every fragment.
    SingleDocument,
    /// One `.gql` file per deep/tiered fragment.
    MultiFile,
}

impl Generator {
    /// Unrecognized labels fall back to [`Generator::SingleDocument`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "js" | "source-module" => Generator::SourceModule,
            "graphql" | "single-document" => Generator::SingleDocument,
            "gql" | "multi-file" => Generator::MultiFile,
            _ => {
                tracing::warn!("unknown generator {label:?}, writing a single GraphQL document");
                Generator::SingleDocument
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Generator::SourceModule => "js",
            Generator::SingleDocument => "graphql",
            Generator::MultiFile => "gql",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub file_name: String,
    pub contents: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Written to the resolved output path.
    Bundle(String),
    /// Written next to each other in the output path's directory.
    Files(Vec<OutputFile>),
}

pub fn assemble(fragments: &FragmentSet, generator: Generator) -> Output {
    match generator {
        Generator::SourceModule => Output::Bundle(ModuleText(fragments).to_string()),
        Generator::SingleDocument => Output::Bundle(DocumentText(fragments).to_string()),
        Generator::MultiFile => Output::Files(
            fragments
                .deep
                .iter()
                .map(|fragment| OutputFile {
                    file_name: format!("{}.{}", fragment.name(), Generator::MultiFile.extension()),
                    contents: format!("{}\n", fragment.body()),
                })
                .collect(),
        ),
    }
}

/// A JS module exporting each fragment as a template-literal constant.
struct ModuleText<'a>(&'a FragmentSet);

impl fmt::Display for ModuleText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// {BANNER}")?;
        for fragment in self.0.iter() {
            write!(
                f,
                "\nexport const {}Fragment = `{}`\n",
                fragment.name(),
                fragment.body()
            )?;
        }
        Ok(())
    }
}

/// Every fragment in one document, grouped under a comment per mode.
struct DocumentText<'a>(&'a FragmentSet);

impl fmt::Display for DocumentText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fragments = self.0;
        let groups: [(&str, &[Fragment]); 3] = [
            ("Default fragments", &fragments.default),
            ("NoNesting fragments (relations omitted)", &fragments.no_relations),
            ("Full fragments (nested relations spread recursively)", &fragments.deep),
        ];
        writeln!(f, "# {BANNER}")?;
        for (header, group) in groups {
            if group.is_empty() {
                continue;
            }
            write!(f, "\n# {header}\n")?;
            for fragment in group {
                write!(f, "\n{}\n", fragment.body())?;
            }
        }
        Ok(())
    }
}
