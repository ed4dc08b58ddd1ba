mod cli;
mod commands;
mod db;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod render;
mod repository;
mod settings;
mod store;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Add { name, child } => cli::categories::add(db, &name, child.as_deref()),
        Commands::Remove { name } => cli::categories::remove(db, &name),
        Commands::Tree => cli::tree::run(db),
        Commands::List => cli::categories::list(db),
        Commands::Export { output, format } => cli::export::run(db, output, format),
        Commands::Import { file } => cli::import::run(db, &file),
        Commands::Run {
            document,
            output,
            tokens,
        } => cli::run::run(db, document.as_deref(), output, &tokens),
        Commands::Status => cli::status::run(db),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "taxon", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "Error:".red());
        std::process::exit(1);
    }
}
