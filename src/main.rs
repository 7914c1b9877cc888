//! bundle-compose CLI
//!
//! Composes the development bundler configuration and prints it as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bundle_compose::config::to_json;
use bundle_compose::rules::validate_rules;
use bundle_compose::{Composer, DevProfile};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bundle-compose")]
#[command(about = "Compose a development bundler configuration", version)]
struct Cli {
    /// Base (common) configuration file in TOML
    #[arg(long, short = 'b')]
    base: Option<PathBuf>,

    /// Skip the base file if it does not exist
    #[arg(long)]
    optional_base: bool,

    /// Directory whose scripts are transpiled
    #[arg(long, default_value = "src")]
    src: String,

    /// Value injected as process.env.NODE_ENV
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    node_env: String,

    /// Apply overrides from environment variables with this prefix
    #[arg(long)]
    env_prefix: Option<String>,

    /// Separator between path segments in override variable names
    #[arg(long, default_value = "__")]
    env_separator: String,

    /// Leave ${...} references unresolved
    #[arg(long)]
    no_resolve: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut composer = Composer::builder();

    if let Some(base) = &cli.base {
        composer = composer.with_file(base, !cli.optional_base);
    }

    composer = composer.with_profile(DevProfile::new(cli.src).with_node_env(cli.node_env));

    if let Some(prefix) = cli.env_prefix {
        composer = composer.with_env(prefix, cli.env_separator);
    }

    let config = composer
        .resolve_references(!cli.no_resolve)
        .build()
        .context("failed to compose configuration")?;

    let rules = validate_rules(&config).context("composed rules are invalid")?;
    tracing::info!(rules, keys = config.len(), "configuration composed");

    let json = to_json(&config).context("failed to encode configuration")?;
    let json = serde_json::to_string_pretty(&json).context("failed to encode configuration")?;
    println!("{json}");
    Ok(())
}
