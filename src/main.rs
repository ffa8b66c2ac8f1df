//! Hintline CLI - inspect hint directives

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;

use hintline::config::DEFAULT_CONFIG_FILE;
use hintline::{
    consume_hints, parse_and_resolve_hints, peek_hints, FixSuggestion, HintError, HintsConfig,
    ModuleRegistry,
};

#[derive(Parser)]
#[command(name = "hintline")]
#[command(about = "Hintline - parse <<prefix key=value>> hint directives")]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the opening enclosure
    #[arg(long, global = true)]
    start: Option<String>,

    /// Override the closing enclosure
    #[arg(long, global = true)]
    end: Option<String>,

    /// Directory JSON resources are relative to
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hints (resolved) and the remaining text as JSON
    Parse {
        /// Directive prefix, e.g. "re"
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Input text (stdin when omitted)
        text: Option<String>,
    },

    /// Print only the hints
    Peek {
        #[arg(short, long, default_value = "")]
        prefix: String,

        text: Option<String>,
    },

    /// Print only the text after the directive
    Consume {
        #[arg(short, long, default_value = "")]
        prefix: String,

        text: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<HintError>().and_then(|h| h.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let enclosure = config.enclosure.clone();
    let registry = Arc::new(ModuleRegistry::from_config(&config));

    match cli.command {
        Commands::Parse { prefix, text } => {
            let text = read_input(text)?;
            let (remaining, outcome) = parse_and_resolve_hints(&text, &prefix, &enclosure, registry)?;
            let map = outcome.into_map().await?;
            let output = json!({
                "hints": map.to_json()?,
                "remaining": remaining,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Peek { prefix, text } => {
            let text = read_input(text)?;
            let map = peek_hints(&text, &prefix, &enclosure, registry)?;
            println!("{}", serde_json::to_string_pretty(&map.to_json()?)?);
        }
        Commands::Consume { prefix, text } => {
            let text = read_input(text)?;
            println!("{}", consume_hints(&text, &prefix, &enclosure)?);
        }
    }

    Ok(())
}

/// Config file, then environment, then CLI flags
fn load_config(cli: &Cli) -> anyhow::Result<HintsConfig> {
    let mut config = HintsConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?
        .with_env_overrides();

    if let Some(start) = &cli.start {
        config.enclosure.start = start.clone();
    }
    if let Some(end) = &cli.end {
        config.enclosure.end = end.clone();
    }
    if let Some(dir) = &cli.base_dir {
        config.base_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn read_input(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading input from stdin")?;
            Ok(buf)
        }
    }
}
