// src/cli/args.rs

use clap::{Parser, Subcommand};

/// Stoat runtime reflection toolkit
#[derive(Parser)]
#[command(name = "stoat")]
#[command(version = "0.1.0")]
#[command(about = "Runtime reflection and dynamic values", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the registered type table and memory statistics
    Dump,
    /// Run the dynamic-value walkthrough: spans, handles, reflected calls
    Demo,
}
