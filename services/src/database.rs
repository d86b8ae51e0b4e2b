use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};
use sea_orm::sea_query::Index;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::entity::request_history;

/// Pool bounds and timeouts for the history database
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_connections: 2,
            max_connections: 10,
            connect_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .min_connections(self.min_connections)
            .max_connections(self.max_connections.max(self.min_connections).max(1))
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .sqlx_logging(false);
        options
    }
}

pub async fn create_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    let db = Database::connect(settings.connect_options())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    Ok(db)
}

/// Process-wide pool: connected once on first use, closed explicitly at shutdown
pub struct DatabaseHandle {
    settings: DatabaseSettings,
    connection: OnceCell<DatabaseConnection>,
}

impl DatabaseHandle {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            connection: OnceCell::new(),
        }
    }

    /// Concurrent first callers share a single connect attempt
    pub async fn get(&self) -> Result<&DatabaseConnection> {
        self.connection
            .get_or_try_init(|| async {
                let db = create_connection(&self.settings).await?;
                log::info!(
                    "Database pool established (min {}, max {})",
                    self.settings.min_connections,
                    self.settings.max_connections
                );
                Ok(db)
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    pub async fn close(mut self) -> Result<()> {
        if let Some(db) = self.connection.take() {
            db.close().await?;
            log::info!("Database pool closed");
        }
        Ok(())
    }
}

/// DDL that provisioning would run on `backend`, one statement per line
pub fn create_schema_sql(backend: DbBackend) -> String {
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(request_history::Entity);
    table.if_not_exists();

    let mut statements = vec![backend.build(&table).to_string()];

    let created_at = Index::create()
        .name("idx_request_history_created_at")
        .table(request_history::Entity)
        .col(request_history::Column::CreatedAt)
        .if_not_exists()
        .to_owned();
    statements.push(backend.build(&created_at).to_string());

    let method_status = Index::create()
        .name("idx_request_history_method_status")
        .table(request_history::Entity)
        .col(request_history::Column::Method)
        .col(request_history::Column::Status)
        .if_not_exists()
        .to_owned();
    statements.push(backend.build(&method_status).to_string());

    statements
        .into_iter()
        .map(|sql| format!("{};", sql))
        .collect::<Vec<_>>()
        .join("\n")
}

/// DDL for the backend of an open connection
pub fn schema_sql_for(db: &DatabaseConnection) -> String {
    create_schema_sql(db.get_database_backend())
}
