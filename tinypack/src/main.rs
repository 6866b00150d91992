use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tinypack_rs::{
    build_graph, bundle, run_artifact, write_bundle, BundleFormat, BundleOptions, GraphOptions,
    ModuleTransformer, ProjectConfig,
};

const DEFAULT_CONFIG_FILE: &str = "tinypack.json";

/// tinypack: A utility for bundling JavaScript modules into a single script
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bundle an entry module and write the artifact
    Bundle {
        /// Path to the entry module. Taken from the config file when omitted
        entry: Option<PathBuf>,

        /// Path to the artifact to be created [default: bundle.js]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module table format. One of encoded, inline
        #[arg(long, value_parser = parse_format)]
        format: Option<BundleFormat>,

        /// Compile a module again for every import site instead of once per file
        #[arg(long)]
        no_dedupe: bool,

        /// Path to a tinypack.json project file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Bundle an entry module in memory, run it, and print its console output
    Run {
        /// Path to the entry module
        entry: PathBuf,

        /// Module table format. One of encoded, inline
        #[arg(long, value_parser = parse_format, default_value = "encoded")]
        format: BundleFormat,

        /// Compile a module again for every import site instead of once per file
        #[arg(long)]
        no_dedupe: bool,
    },

    /// Print the module graph discovered from an entry module as JSON
    Graph {
        /// Path to the entry module
        entry: PathBuf,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Compile a module again for every import site instead of once per file
        #[arg(long)]
        no_dedupe: bool,
    },
}

fn parse_format(s: &str) -> Result<BundleFormat, String> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;

    match cli.command {
        Commands::Bundle {
            entry,
            output,
            format,
            no_dedupe,
            config,
        } => bundle_command(&cwd, entry, output, format, no_dedupe, config)?,
        Commands::Run {
            entry,
            format,
            no_dedupe,
        } => {
            let options = BundleOptions {
                format,
                dedupe: !no_dedupe,
            };
            let emit = bundle(&entry, &cwd, &options)
                .with_context(|| format!("Failed to bundle {}", entry.display()))?;
            let lines = run_artifact(&emit.code)
                .with_context(|| format!("Failed to run bundle of {}", entry.display()))?;
            for line in lines {
                println!("{}", line);
            }
        }
        Commands::Graph {
            entry,
            pretty,
            no_dedupe,
        } => {
            let options = GraphOptions {
                dedupe: !no_dedupe,
            };
            let graph = build_graph(&cwd.join(&entry), &ModuleTransformer, &options)
                .with_context(|| format!("Failed to build graph for {}", entry.display()))?;
            let json = if pretty {
                serde_json::to_string_pretty(&graph)?
            } else {
                serde_json::to_string(&graph)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

fn bundle_command(
    cwd: &Path,
    entry: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<BundleFormat>,
    no_dedupe: bool,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config_path = match config {
        Some(path) => Some(path),
        None => {
            let default_path = cwd.join(DEFAULT_CONFIG_FILE);
            default_path.is_file().then_some(default_path)
        }
    };
    let project = match &config_path {
        Some(path) => Some({
            log::debug!("loading project config from {}", path.display());
            ProjectConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }),
        None => None,
    };

    // Command line flags take precedence over the config file
    let mut options = project
        .as_ref()
        .map(|p| p.options)
        .unwrap_or_default();
    if let Some(format) = format {
        options.format = format;
    }
    if no_dedupe {
        options.dedupe = false;
    }

    let entry = match (entry, &project) {
        (Some(entry), _) => entry,
        (None, Some(project)) => project.entry.clone(),
        (None, None) => bail!(
            "No entry module given and no {} found in {}",
            DEFAULT_CONFIG_FILE,
            cwd.display()
        ),
    };
    let output = match (output, &project) {
        (Some(output), _) => output,
        (None, Some(project)) => project.output.clone(),
        (None, None) => PathBuf::from("bundle.js"),
    };
    let output = cwd.join(output);

    let emit = bundle(&entry, cwd, &options)
        .with_context(|| format!("Failed to bundle {}", entry.display()))?;
    write_bundle(&output, &emit)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    eprintln!(
        "Bundled {} module(s) into {}",
        emit.modules,
        output.display()
    );
    Ok(())
}
