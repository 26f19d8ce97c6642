use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tracing::warn;

use crate::error::SqlHelperError;

/// An open Postgres session: the client and the task driving its socket.
#[derive(Debug)]
pub struct PostgresConnection {
    client: Client,
    task: JoinHandle<()>,
}

impl PostgresConnection {
    /// Connect without TLS and spawn the connection task on the current runtime.
    ///
    /// # Errors
    /// Returns `SqlHelperError::PostgresError` if the server cannot be reached or rejects
    /// the login.
    pub async fn connect(config: &Config) -> Result<Self, SqlHelperError> {
        let (client, connection) = config.connect(NoTls).await?;
        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection task ended with an error");
            }
        });
        Ok(Self { client, task })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Drop the client, which terminates the session, and wait for the connection task.
    pub async fn close(self) {
        let Self { client, task } = self;
        drop(client);
        if let Err(e) = task.await {
            warn!(error = %e, "postgres connection task did not shut down cleanly");
        }
    }
}
