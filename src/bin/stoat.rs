// src/bin/stoat.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use stoat::cli::{Cli, Commands};
use stoat::commands::demo::run_demo;
use stoat::commands::dump::dump_registry;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump => dump_registry(),
        Commands::Demo => run_demo(),
    }
}
