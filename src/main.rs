use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use citybuilder::{
    catalog::CatalogLoader,
    config::Config,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless city simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/riverside.yaml")]
    scenario: PathBuf,

    /// Runner configuration (map size, catalog, log level)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the template catalog named in the configuration
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Restore this save before running the scenario
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a save once the scenario has finished
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_yaml(path)?,
        None => Config::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let catalog_path = cli.catalog.clone().unwrap_or_else(|| config.catalog.clone());
    let catalog = CatalogLoader::new(".").load(&catalog_path)?;
    let scenario = ScenarioLoader::new(".").load(&cli.scenario)?;

    let settings = scenario.settings(EngineSettings::from_config(&config));
    let mut engine = EngineBuilder::standard(settings).build();
    if let Some(path) = &cli.load {
        engine
            .load_from_path(&catalog, path)
            .with_context(|| format!("Failed to load save {}", path.display()))?;
    }

    let report = scenario.run(&mut engine, &catalog)?;

    if let Some(path) = &cli.save {
        engine
            .save_to_path(path)
            .with_context(|| format!("Failed to write save {}", path.display()))?;
    }

    println!(
        "Scenario '{}' finished on {}: {} placed, {} rejected, {} removed. \
         Money: {}, population: {}, happiness: {:.3}",
        scenario.name,
        engine.date(),
        report.placed,
        report.rejected,
        report.removed,
        engine.money(),
        engine.population(),
        engine.happiness()
    );
    Ok(())
}
