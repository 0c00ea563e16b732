//! SmartFill CLI - fill gallery walls from a photo directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "smartfill")]
#[command(author, version, about = "Photo-to-frame matching for gallery walls", long_about = None)]
#[command(after_help = exit_codes::HELP_TEXT)]
struct Cli {
    /// Log analysis details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// User preference toggles passed through to the scorer.
#[derive(Args)]
struct PreferenceArgs {
    /// Favour photos with prominent faces
    #[arg(long)]
    faces: bool,

    /// Favour black-and-white photos
    #[arg(long, conflicts_with = "vibrant")]
    bw: bool,

    /// Favour colourful, saturated photos
    #[arg(long)]
    vibrant: bool,

    /// Score only photos already in the cache instead of analyzing first
    #[arg(long)]
    no_wait: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every photo in a directory and cache the results
    Analyze {
        /// Directory of photos
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Also run face detection
        #[arg(long)]
        faces: bool,

        /// Suppress progress and summary output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show which photos already have cached analysis
    Status {
        /// Directory of photos
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Require face detection results
        #[arg(long)]
        faces: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank photos for a single frame
    Suggest {
        /// Directory of photos
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Frame size as WxH, e.g. 4x6
        #[arg(short, long, value_name = "WxH")]
        frame: String,

        #[command(flatten)]
        preferences: PreferenceArgs,
    },

    /// Propose whole-wall assignments
    Fill {
        /// Directory of photos
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Wall layout JSON file
        #[arg(short, long, value_name = "FILE")]
        wall: PathBuf,

        /// Number of alternative solutions to generate
        #[arg(short, long, default_value_t = 3)]
        count: usize,

        #[command(flatten)]
        preferences: PreferenceArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "smartfill=debug,smartfill_core=debug"
    } else {
        "smartfill=warn,smartfill_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze { dir, faces, quiet } => commands::analyze::execute(dir, faces, quiet).await,
        Commands::Status { dir, faces, json } => commands::status::execute(dir, faces, json).await,
        Commands::Suggest {
            dir,
            frame,
            preferences,
        } => {
            commands::suggest::execute(commands::suggest::SuggestArgs {
                dir,
                frame,
                options: utils::scoring_options(preferences.faces, preferences.bw, preferences.vibrant),
                no_wait: preferences.no_wait,
                json: preferences.json,
            })
            .await
        }
        Commands::Fill {
            dir,
            wall,
            count,
            preferences,
        } => {
            commands::fill::execute(commands::fill::FillArgs {
                dir,
                wall,
                count,
                options: utils::scoring_options(preferences.faces, preferences.bw, preferences.vibrant),
                no_wait: preferences.no_wait,
                json: preferences.json,
            })
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit = match run(cli.command).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
