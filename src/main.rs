use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::MongoBookStore;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.redacted_uri(),
        port = settings.server.port,
        "bookshelf-app starting"
    );

    // Without a store there is nothing to serve.
    let store = MongoBookStore::connect(&settings.database)
        .await
        .with_context(|| "failed to connect to the book store")?;

    bookshelf_app::serve(settings, Arc::new(store)).await
}
