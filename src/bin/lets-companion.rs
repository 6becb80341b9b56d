//! Lets companion CLI binary.

use clap::Parser;
use lets_companion::config::ConfigLoader;
use lets_companion::logging;
use lets_companion::tooling::cli::{Cli, CliContext};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match ConfigLoader::load(&cli.workspace) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }
    if let Some(file) = cli.log_file.clone() {
        config.logging.file = Some(file);
    }

    if let Err(e) = logging::init_logging(&config.logging, Some(cli.workspace.as_path())) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    let context = match CliContext::new(cli.workspace.clone(), &config) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error initializing workspace: {}", e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
