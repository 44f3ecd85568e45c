//! Bookshelf application library
//!
//! Project modules plus the bootstrap shared by the `bookshelf-app` binary
//! and the operator CLI.

pub mod modules;

use anyhow::Context;
use axum::Router;

use bookshelf_db::SharedStore;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Registry with every project module wired to `store`
pub fn registry(store: SharedStore) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store)?;
    Ok(registry)
}

/// Full HTTP router for `store`, without running any module lifecycle hook
pub fn router(store: SharedStore, settings: &Settings) -> anyhow::Result<Router> {
    let registry = registry(store)?;
    Ok(bookshelf_http::build_router(&registry, settings))
}

/// Initialize and start the modules, serve HTTP until shutdown, then stop them.
pub async fn serve(settings: Settings, store: SharedStore) -> anyhow::Result<()> {
    tracing::info!(backend = store.backend(), "bookshelf bootstrap starting");

    let registry = registry(store)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_all(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_all(&ctx)
        .await
        .context("module start failed")?;

    let app = bookshelf_http::build_router(&registry, &settings);
    tracing::info!("bookshelf bootstrap complete");

    let served = bookshelf_http::start_server(app, &settings.server).await;

    registry.stop_all().await.context("module shutdown failed")?;
    served
}
