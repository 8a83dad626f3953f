use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing_subscriber::EnvFilter;

use sigresolve::config::{bootstrap, default_config_path, load_config, ResolverConfig};
use sigresolve::resolution::{Dispatcher, Registration};
use sigresolve::types::{Reference, ResourceContent, SelectionTarget};

/// Resolve signed-document references the way a verifier would.
#[derive(Parser)]
#[command(name = "sigresolve", about = "Resolve signed-document references")]
struct Cli {
    /// Configuration file (.toml or .json). Defaults to the user config dir.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered resolvers in probe order
    List,
    /// List identifiers that can be registered by name
    Catalog,
    /// Show which resolver would handle a reference
    Probe {
        /// Reference URI as written in the document
        uri: String,
        /// Base URI of the enclosing document
        #[arg(short, long, default_value = "")]
        base: String,
    },
    /// Resolve a reference and print a summary of its content
    Resolve {
        /// Reference URI as written in the document
        uri: String,
        /// Base URI of the enclosing document
        #[arg(short, long, default_value = "")]
        base: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> sigresolve::errors::Result<()> {
    let config = resolve_config(cli.config)?;
    let (registry, outcomes) = bootstrap(&config);
    for outcome in &outcomes {
        if let Registration::Skipped { identifier, reason } = outcome {
            eprintln!("Skipped resolver '{}': {}", identifier, reason);
        }
    }
    let dispatcher = Dispatcher::new(&registry);

    match cli.command {
        Commands::List => {
            let handles = registry.snapshot();
            if handles.is_empty() {
                println!("No resolvers registered");
            }
            for (index, handle) in handles.iter().enumerate() {
                let safety = if handle.is_thread_safe() {
                    "thread-safe"
                } else {
                    "isolated per call"
                };
                println!("{:>2}. {} ({})", index + 1, handle.name(), safety);
            }
        }
        Commands::Catalog => {
            for identifier in registry.catalog().identifiers() {
                println!("{}", identifier);
            }
        }
        Commands::Probe { uri, base } => {
            let reference = Reference::new(uri, base);
            let name = dispatcher.select(&reference, &[])?;
            println!("{}", name);
        }
        Commands::Resolve { uri, base, json } => {
            let reference = Reference::new(uri, base);
            let resource = dispatcher.resolve(&reference, &[])?;
            if json {
                let summary = serde_json::json!({
                    "source_uri": resource.source_uri,
                    "mime_type": resource.mime_type,
                    "length": resource.bytes().map(<[u8]>::len),
                    "sha256": resource.content_digest(),
                    "selection": resource.node_selection(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Source:  {}",
                    resource.source_uri.as_deref().unwrap_or("(unknown)")
                );
                if let Some(mime_type) = &resource.mime_type {
                    println!("Type:    {}", mime_type);
                }
                match &resource.content {
                    ResourceContent::Octets(bytes) => {
                        println!("Length:  {} bytes", bytes.len());
                        if let Some(digest) = resource.content_digest() {
                            println!("SHA-256: {}", digest);
                        }
                    }
                    ResourceContent::Selection(selection) => {
                        let target = match &selection.target {
                            SelectionTarget::WholeDocument => "whole document".to_string(),
                            SelectionTarget::ElementById(id) => format!("element '{}'", id),
                        };
                        println!("Select:  {}", target);
                        println!("Comments: {}", selection.include_comments);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Loads the configuration from `path`, or from the default location.
///
/// Falls back to the built-in defaults if neither exists.
fn resolve_config(path: Option<PathBuf>) -> sigresolve::errors::Result<ResolverConfig> {
    match path.or_else(default_config_path) {
        Some(p) => load_config(&p),
        None => Ok(ResolverConfig::default()),
    }
}
