//! Application state for the review API

use anyhow::Result;
use review_export::ExportSettings;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::config::Config;
use crate::runner::{ArchiveRunner, GhostscriptRunner};

pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub runner: Arc<dyn ArchiveRunner>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let db_url = config.database_url();
        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let runner = Arc::new(GhostscriptRunner::new(config.ghostscript_timeout()));
        Self::with_pool(pool, config, runner).await
    }

    /// Build state around an existing pool, running migrations on it
    pub async fn with_pool(
        pool: SqlitePool,
        config: Config,
        runner: Arc<dyn ArchiveRunner>,
    ) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        Ok(Self {
            db: pool,
            config,
            runner,
        })
    }

    pub fn export_settings(&self) -> ExportSettings {
        self.config.export_settings()
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id TEXT NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                closed BOOLEAN NOT NULL DEFAULT 0,
                pdf_file TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL,
                review_id TEXT NOT NULL,
                author TEXT NOT NULL,
                page_id INTEGER,
                kind TEXT,
                msg TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'None',
                rects TEXT,
                reply_to_id TEXT,
                timestamp INTEGER NOT NULL,
                deleted BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS myread (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_hash TEXT NOT NULL,
                review_id TEXT NOT NULL,
                reader TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id TEXT NOT NULL,
                owner TEXT NOT NULL,
                msg TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS myreviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id TEXT NOT NULL,
                reader TEXT NOT NULL,
                UNIQUE (review_id, reader)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Index for fast lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review_id, hash)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}
