use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use bookshelf_db::{BookFilter, BookStore, MemoryBookStore, MongoBookStore, NewBook, SharedStore};
use bookshelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Operate the bookshelf book collection service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Keep books in process memory instead of MongoDB (lost on exit)
        #[arg(long)]
        memory: bool,
    },
    /// Print the resolved settings as JSON, credentials masked
    Config,
    /// Check that the record store is reachable
    Ping,
    /// Insert the sample books into an empty collection
    Seed {
        /// Insert even when the collection already holds books
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        // Stdout carries only the JSON document, so no subscriber is installed.
        Command::Config => print_config(&settings),
        Command::Serve { memory } => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let store: SharedStore = if memory {
                tracing::warn!("serving from process memory; books are lost on exit");
                Arc::new(MemoryBookStore::new())
            } else {
                Arc::new(connect(&settings).await?)
            };
            bookshelf_app::serve(settings, store).await
        }
        Command::Ping => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            connect(&settings).await?;
            println!("ok: {}", settings.database.redacted_uri());
            Ok(())
        }
        Command::Seed { force } => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let store = connect(&settings).await?;
            seed(&store, force).await
        }
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<MongoBookStore> {
    MongoBookStore::connect(&settings.database)
        .await
        .with_context(|| format!("failed to connect to {}", settings.database.redacted_uri()))
}

fn print_config(settings: &Settings) -> anyhow::Result<()> {
    let mut shown = settings.clone();
    shown.database.uri = shown.database.redacted_uri();
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// The two books the service's first iteration shipped with.
fn sample_books() -> Vec<Value> {
    vec![
        json!({
            "title": "The Great Gatsby",
            "author": "F. Scott Fitzgerald",
            "year": 1925,
            "genre": "Classic",
            "rating": 4,
            "isRead": true
        }),
        json!({
            "title": "To Kill a Mockingbird",
            "author": "Harper Lee",
            "year": 1960,
            "genre": "Classic",
            "rating": 5,
            "isRead": true
        }),
    ]
}

async fn seed(store: &dyn BookStore, force: bool) -> anyhow::Result<()> {
    let existing = store.count(&BookFilter::default()).await?;
    if existing > 0 && !force {
        println!("collection already holds {existing} books; use --force to seed anyway");
        return Ok(());
    }

    for sample in sample_books() {
        let Value::Object(fields) = sample else {
            continue;
        };
        let book = store.create(NewBook::from_json(&fields)?).await?;
        println!("seeded {} ({})", book.title, book.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sample_books_pass_validation() {
        for sample in sample_books() {
            let Value::Object(fields) = sample else {
                panic!("sample is not an object");
            };
            assert!(NewBook::from_json(&fields).is_ok());
        }
    }

    #[tokio::test]
    async fn seed_skips_populated_collections_unless_forced() {
        let store = MemoryBookStore::new();
        seed(&store, false).await.unwrap();
        assert_eq!(store.count(&BookFilter::default()).await.unwrap(), 2);

        seed(&store, false).await.unwrap();
        assert_eq!(store.count(&BookFilter::default()).await.unwrap(), 2);

        seed(&store, true).await.unwrap();
        assert_eq!(store.count(&BookFilter::default()).await.unwrap(), 4);
    }
}
