//! Command-line interface for lafal
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Pronunciation classification service
#[derive(Parser, Debug)]
#[command(name = "lafal", version, about = "Pronunciation classification service")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides server.bind), e.g. 0.0.0.0:5000 or :5000
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Fail instead of downloading the classifier if it is missing
        #[arg(long)]
        no_download: bool,
    },

    /// Classify one WAV file and print the result as JSON
    Predict {
        /// WAV file to classify
        #[arg(value_name = "WAV")]
        audio: PathBuf,

        /// User identity the result is recorded under
        #[arg(long, value_name = "EMAIL")]
        email: String,

        /// Do not write the result to the history file
        #[arg(long)]
        no_history: bool,

        /// Fail instead of downloading the classifier if it is missing
        #[arg(long)]
        no_download: bool,
    },

    /// Manage the classifier artifact
    Models {
        /// Action to perform
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration (API key masked)
    Show,
}

/// Classifier artifact actions
#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// Download the configured classifier if it is missing
    Install,
    /// Show whether the classifier is installed and loadable
    Status,
}
