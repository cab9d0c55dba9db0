mod api;
mod archiver;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod registry;
mod settings;
mod splits;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{ArchiveCommands, Cli, Commands, PeopleCommands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("splitledger=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Serve { addr } => cli::serve::run(addr),
        Commands::Import { file } => cli::import::run(&file),
        Commands::People { command } => match command {
            PeopleCommands::Add { name, email } => cli::people::add(&name, email.as_deref()),
            PeopleCommands::List => cli::people::list(),
        },
        Commands::Totals => cli::totals::run(),
        Commands::Archive { command } => match command {
            ArchiveCommands::Create { name, description } => {
                cli::archive::create(&name, description.as_deref())
            }
            ArchiveCommands::List => cli::archive::list(),
            ArchiveCommands::Show { id } => cli::archive::show(&id),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
