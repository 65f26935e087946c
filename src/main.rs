//! pagebuilder - An incremental static site builder with template inheritance.

mod build;
mod cli;
mod compiler;
mod config;
mod dispatch;
mod logger;
mod serve;
mod watch;

use anyhow::Result;
use build::Site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use serve::serve_site;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);
    let config = load_config(&cli)?;

    let mut site = Site::new(config);
    site.build()?;

    match &cli.command {
        Commands::Build { .. } => Ok(()),
        Commands::Serve { .. } => serve_site(site),
    }
}

/// Load and validate configuration from CLI arguments.
///
/// The config file is optional; every setting has a default.
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
