pub mod categories;
pub mod export;
pub mod import;
pub mod init;
pub mod run;
pub mod status;
pub mod tree;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::export::ExportFormat;
use crate::settings::load_settings;

/// Open the database named by `--db`, or the one in the configured data dir.
pub(crate) fn open_db(db_override: Option<&Path>) -> Result<Connection> {
    let path = match db_override {
        Some(p) => p.to_path_buf(),
        None => load_settings().db_path(),
    };
    db::open(&path)
}

#[derive(Parser)]
#[command(name = "taxon", version, about = "Manage a tree of named categories and sync it with spreadsheets.")]
pub struct Cli {
    /// Database file to use instead of <data_dir>/taxon.db
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up taxon: choose a data directory and initialize the database.
    Init {
        /// Path for taxon data (default: the configured dir, initially ~/Documents/taxon)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Add a root category, or a child when two names are given.
    Add {
        /// Category name, or the parent name when CHILD is given
        name: String,
        /// Name of the child to create under NAME
        child: Option<String>,
    },
    /// Remove a category and all of its descendants.
    Remove {
        /// Category name
        name: String,
    },
    /// Print the category tree.
    Tree,
    /// List every category with its id and parent.
    List,
    /// Export all categories to a spreadsheet.
    Export {
        /// Output file path (default: <data_dir>/exports/categories-YYYYMMDD-HHMMSS.<ext>)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Spreadsheet format (default from settings)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// Merge a CSV/XLSX spreadsheet (id, name, parent_id) into the tree.
    Import {
        /// Path to the CSV or XLSX file
        file: PathBuf,
    },
    /// Execute a bot-style command, e.g. `taxon run /addElement Parent Child`.
    Run {
        /// Spreadsheet to hand over as a received document
        #[arg(long)]
        document: Option<PathBuf>,
        /// Where to save a document reply (default: <data_dir>/exports/<file name>)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Command name followed by its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },
    /// Show the database location and category counts.
    Status,
    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
