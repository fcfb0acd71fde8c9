use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use disaster_etl::logging;
use disaster_etl::pipeline;
use disaster_etl::storage::MessageStore;

const USAGE_EXAMPLE: &str =
    "Example: process_data disaster_messages.csv disaster_categories.csv DisasterResponse.db";

#[derive(Parser)]
#[command(name = "process_data")]
#[command(about = "Loads disaster response messages and category labels into a SQLite database")]
#[command(version = "0.1.0")]
#[command(after_help = USAGE_EXAMPLE)]
struct Cli {
    /// Delimited file of messages, keyed by an `id` column
    messages_filepath: PathBuf,
    /// Delimited file of category labels, keyed by the same `id` column
    categories_filepath: PathBuf,
    /// SQLite database file to write the cleaned table to
    database_filepath: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Argument validation happens before logging so a bad invocation
    // touches no files at all. The usage error carries the example
    // invocation, not just the --help text.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if err.use_stderr() {
                eprintln!("{USAGE_EXAMPLE}");
            }
            std::process::exit(err.exit_code());
        }
    };

    logging::init_logging();
    info!("Starting ETL run");

    println!(
        "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
        cli.messages_filepath.display(),
        cli.categories_filepath.display()
    );
    let table = pipeline::load(&cli.messages_filepath, &cli.categories_filepath)?;

    println!("Cleaning data...");
    let cleaned = pipeline::clean(table)?;

    println!(
        "Saving data...\n    DATABASE: {}",
        cli.database_filepath.display()
    );
    let mut store = MessageStore::open(&cli.database_filepath)?;
    store.save(&cleaned)?;

    println!("Cleaned data saved to database!");
    info!("ETL run complete");
    Ok(())
}
