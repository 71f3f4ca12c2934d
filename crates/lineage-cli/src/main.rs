//! Lineage CLI - Command-line interface for the lineage engine.

use anyhow::Context;
use clap::Parser;
use lineage_cli::commands;
use lineage_cli::{Cli, Command, Config, Formatter};
use lineage_llm::OllamaProvider;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };

    let config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let output = match cli.command {
        Command::Init(args) => commands::execute_init(args, &config_path, &formatter)?,
        Command::Process(args) => {
            let client = OllamaProvider::from_config(config.model.clone())
                .context("creating model client")?;
            let processor = commands::open_processor(&config, client)?;
            commands::execute_process(args, &processor, &formatter).await?
        }
        Command::Show(args) => {
            let client = OllamaProvider::from_config(config.model.clone())
                .context("creating model client")?;
            let processor = commands::open_processor(&config, client)?;
            commands::execute_show(args, &processor, &formatter)?
        }
    };

    println!("{}", output);
    Ok(())
}
