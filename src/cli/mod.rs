pub mod archive;
pub mod import;
pub mod init;
pub mod people;
pub mod serve;
pub mod status;
pub mod totals;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{LedgerError, Result};
use crate::settings::load_settings;

/// Open the configured database, refusing to create one implicitly.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = load_settings().db_path();
    if !db_path.exists() {
        return Err(LedgerError::Settings(format!(
            "No database found at {}\nRun `splitledger init` to create one.",
            db_path.display()
        )));
    }
    get_connection(&db_path)
}

#[derive(Parser)]
#[command(name = "splitledger", about = "Shared-expense ledger with period archives.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for splitledger data
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Run the JSON HTTP API.
    Serve {
        /// Listen address (default from settings, 127.0.0.1:3000)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Import a statement CSV into the active ledger, skipping duplicates.
    Import {
        /// Path to CSV file
        file: String,
    },
    /// Manage people.
    People {
        #[command(subcommand)]
        command: PeopleCommands,
    },
    /// Show each person's share of the active ledger.
    Totals,
    /// Close out the active period or inspect past archives.
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum PeopleCommands {
    /// Add a person.
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// List people.
    List,
}

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Archive every active transaction under a new name.
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List archives, newest first.
    List,
    /// Show an archive's person totals and contents.
    Show {
        /// Archive ID (shown in `splitledger archive list`)
        id: String,
    },
}
