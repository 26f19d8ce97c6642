use std::str::FromStr;

use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::postgres::PostgresConnection;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// Configuration for the database created by [`setup_postgres_embedded`]
    pub config: tokio_postgres::Config,
}

/// Start an embedded `PostgreSQL` server and create `db_name` on it.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database cannot be
/// created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(db_name: &str) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // Bundled binaries, so nothing is downloaded
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(db_name).await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let database_url = format!(
            "postgres://{}:{}@{}:{port}/{db_name}",
            settings.username, settings.password, settings.host
        );
        let config = tokio_postgres::Config::from_str(&database_url)?;

        let conn = PostgresConnection::connect(&config).await?;
        conn.client().execute("SELECT 1", &[]).await?;
        conn.close().await;

        Ok::<_, Box<dyn std::error::Error>>(EmbeddedPostgres {
            postgresql,
            port,
            database_url,
            config,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
