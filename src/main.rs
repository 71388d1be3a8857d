use clap::Parser;
use eyre::Result;
use gen_fragments::config::{GraphQLConfig, DEFAULT_CONFIG_FILE, FRAGMENTS_EXTENSION};
use gen_fragments::project::{self, Overrides, ProjectContext};
use gen_fragments::FragmentGeneratorError;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Generate default, no-nesting and full fragments for every object type in
/// your GraphQL schema
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Only process this project
    #[arg(short, long)]
    project: Option<String>,

    /// Schema filename, overriding the project's schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Output format: js, graphql or gql
    #[arg(short, long)]
    generator: Option<String>,

    /// Output directory; writes <project>.fragments.<ext> into it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tier allow-list file, overriding the project's fragment-tiers setting
    #[arg(long)]
    tiers: Option<PathBuf>,

    /// Save the resolved output and generator to the project configuration
    #[arg(short, long)]
    save: bool,

    /// Show debug output
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(long)]
    quiet: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("gen_fragments=debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: &Path, has_schema: bool) -> Result<GraphQLConfig> {
    if has_schema && !path.exists() {
        return Ok(GraphQLConfig::empty(path));
    }
    Ok(GraphQLConfig::load(path)?)
}

/// `None` when the project is skipped.
fn process_project(
    config: &GraphQLConfig,
    name: &str,
    overrides: &Overrides,
    explicit: bool,
) -> Result<Option<(ProjectContext, PathBuf)>, FragmentGeneratorError> {
    if project::should_skip(config, name, overrides, explicit)? {
        return Ok(None);
    }
    let ctx = ProjectContext::resolve(config, name, overrides)?;
    let written = project::run(&ctx)?;
    Ok(Some((ctx, written)))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    let mut config = load_config(&args.config, args.schema.is_some())?;
    let overrides = Overrides {
        schema: args.schema,
        generator: args.generator,
        output_dir: args.output,
        tiers: args.tiers,
    };
    let project_names = match &args.project {
        Some(name) => vec![name.clone()],
        None => config.project_names(),
    };

    let mut failed = Vec::new();
    for name in project_names {
        info!("Generating fragments for project {name}");
        match process_project(&config, &name, &overrides, args.project.is_some()) {
            Ok(Some((ctx, written))) => {
                if let Some(project) = config.project_mut(&name) {
                    project.set_fragments_extension(&ctx.fragments_extension());
                }
                info!("Fragments for project {name} written to {}", written.display());
            }
            Ok(None) => {
                info!("Skipping project {name} without '{FRAGMENTS_EXTENSION}' extension");
            }
            Err(err) => {
                error!("Project {name} failed: {err}");
                failed.push(name);
            }
        }
    }

    if args.save {
        config.save()?;
        info!("Saved settings to {}", config.path().display());
    }

    if !failed.is_empty() {
        eyre::bail!("fragment generation failed for {}", failed.join(", "));
    }
    Ok(())
}
