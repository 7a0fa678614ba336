//! Arbor - a content-tree server.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod logger;
mod render;
mod store;
mod worker;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Init { name } => cli::init::new_site(name.as_deref()),
        Commands::Serve { interface, port } => {
            let mut config = SiteConfig::load(&cli.config)?;
            if let Some(interface) = interface {
                config.serve.interface = *interface;
            }
            if let Some(port) = port {
                config.serve.port = *port;
            }
            let config = config::init_config(config);
            cli::serve::run(&config)
        }
    }
}
