use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::debug;

use super::config::MssqlClient;
use crate::error::SqlHelperError;

/// Open a SQL Server connection described by `config`.
///
/// Named instances are resolved through SQL Browser. When the server answers with a
/// routing redirect (Azure SQL gateways do), the connection is retried once against the
/// host and port it names.
///
/// # Errors
/// Returns `SqlHelperError::ConnectionError` if the TCP connection fails, or
/// `SqlHelperError::MssqlError` if the login is rejected.
pub async fn connect(config: Config) -> Result<MssqlClient, SqlHelperError> {
    let tcp = open_tcp(&config).await?;
    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(%host, port, "SQL Server redirected the connection");
            let mut config = config;
            config.host(&host);
            config.port(port);
            let tcp = open_tcp(&config).await?;
            Ok(Client::connect(config, tcp.compat_write()).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn open_tcp(config: &Config) -> Result<TcpStream, SqlHelperError> {
    let tcp = TcpStream::connect_named(config).await.map_err(|e| {
        SqlHelperError::ConnectionError(format!(
            "TCP connection to {} failed: {e}",
            config.get_addr()
        ))
    })?;
    tcp.set_nodelay(true)
        .map_err(|e| SqlHelperError::ConnectionError(format!("TCP configuration error: {e}")))?;
    Ok(tcp)
}
