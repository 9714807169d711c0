pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::catalog::CatalogArgs;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront operator CLI",
    long_about = "Operate storefront readiness, migrations, demo catalog seeding, config inspection, and catalog queries.",
    after_help = "Examples:\n  storefront doctor --json\n  storefront seed\n  storefront catalog --category Moda --sort price_asc"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the demo catalog (safe to re-run)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, schema state, and catalog availability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Filter, sort, and page the stored catalog")]
    Catalog(CatalogArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Catalog(args) => commands::catalog::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
