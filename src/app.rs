//! Application assembly: database, module registry, and HTTP router.

use std::time::Duration;

use anyhow::Context;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully wired application: settings, store, and registered modules.
pub struct App {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl App {
    /// Register every module against `db`. Nothing touches the store yet.
    pub fn new(settings: Settings, db: Database) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db)?;
        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    /// Open the configured database and register modules against it.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let db = open_database(&settings)?;
        Self::new(settings, db)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Initialize modules, apply their schema, then start them.
    pub async fn start(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };

        self.registry.init_modules(&ctx).await?;
        self.apply_schema().await?;
        self.registry.start_modules(&ctx).await?;
        Ok(())
    }

    /// Apply every module's DDL; returns how many definitions ran.
    pub async fn apply_schema(&self) -> anyhow::Result<usize> {
        let applied = self
            .db
            .ensure_schema(self.registry.collect_schema())
            .await
            .context("failed to apply database schema")?;
        tracing::info!(applied, database = self.db.location(), "database schema ready");
        Ok(applied)
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.registry.stop_modules().await
    }

    /// The HTTP router with every module mounted.
    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, &self.settings)
    }

    /// The merged OpenAPI document.
    pub fn openapi(&self) -> serde_json::Value {
        bookstore_http::router::openapi_document(&self.registry, &self.settings.server)
    }
}

/// Open the database named in `settings.database`.
pub fn open_database(settings: &Settings) -> anyhow::Result<Database> {
    Database::open(
        &settings.database.path,
        Duration::from_millis(settings.database.busy_timeout_ms),
    )
    .with_context(|| format!("failed to open database '{}'", settings.database.path))
}

/// Throwaway store for commands that only need the module wiring.
pub fn in_memory_database() -> anyhow::Result<Database> {
    Database::in_memory().context("failed to open in-memory database")
}

/// Run the service until a shutdown signal arrives.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let app = App::from_settings(settings)?;
    app.start().await?;

    let served = bookstore_http::start_server(app.registry(), app.settings()).await;
    let stopped = app.stop().await;

    served?;
    stopped?;
    tracing::info!("bookstore shutdown complete");
    Ok(())
}
