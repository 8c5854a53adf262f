pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "confetti",
    about = "Confetti operator CLI",
    long_about = "Inspect Confetti's configuration, content catalog, state store, and leaderboard.",
    after_help = "Examples:\n  confetti doctor --json\n  confetti config\n  confetti leaderboard --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with secrets redacted"
    )]
    Config,
    #[command(about = "Validate config, catalog, and state-store readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List catalog buckets and their item counts")]
    Catalog,
    #[command(about = "Show the community leaderboard")]
    Leaderboard {
        #[arg(long, default_value_t = 10, help = "Number of entries to show")]
        limit: usize,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json).await }
        }
        Command::Catalog => commands::catalog::run(),
        Command::Leaderboard { limit } => commands::leaderboard::run(limit).await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
