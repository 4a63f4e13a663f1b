use clap::{Parser, Subcommand};
use tracing::Level;

use asntriage::TriageConfig;

mod commands;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.asntriage/asntriage.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify incoming addresses read line by line from standard input.
    Classify,

    /// Resynchronize the range data of all stored records from the bulk database.
    Resync,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = match TriageConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: unable to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Classify => commands::classify::run(&config),
        Commands::Resync => commands::resync::run(&config),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}
