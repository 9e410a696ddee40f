//! TLS for the remote PostgreSQL store.
//!
//! Hosted databases require TLS; `remote.no_tls` or `EVIDENCE_NO_TLS=1`
//! switches it off for local test servers.

use std::sync::{Arc, LazyLock};

use diesel::ConnectionError;
use diesel_async::AsyncPgConnection;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rustls::ClientConfig;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{Client, Connection, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;

/// Native roots are read once per process; pool rebuilds after a credential
/// refresh reuse them.
static CLIENT_CONFIG: LazyLock<Arc<ClientConfig>> = LazyLock::new(|| {
    let mut roots = rustls::RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        tracing::warn!("Skipping native certificate: {}", err);
    }
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    tracing::debug!("Loaded {} native roots ({} unparsable)", added, ignored);

    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

fn tls_connector() -> MakeRustlsConnect {
    MakeRustlsConnect::new(ClientConfig::clone(&CLIENT_CONFIG))
}

/// Pool setup hook: open one TLS connection for diesel-async.
pub fn establish_tls_connection(
    url: &str,
) -> BoxFuture<'_, diesel::ConnectionResult<AsyncPgConnection>> {
    async move {
        let (client, conn) = tokio_postgres::connect(url, tls_connector())
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        AsyncPgConnection::try_from_client_and_connection(client, conn).await
    }
    .boxed()
}

fn drive<T>(connection: Connection<Socket, T>)
where
    T: tokio_postgres::tls::TlsStream + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Remote store connection closed: {}", e);
        }
    });
}

async fn connect_with<M>(url: &str, tls: M) -> Result<Client, tokio_postgres::Error>
where
    M: MakeTlsConnect<Socket>,
    M::Stream: Send + 'static,
{
    let (client, connection) = tokio_postgres::connect(url, tls).await?;
    drive(connection);
    Ok(client)
}

/// Plain client for migrations, with its connection task already spawned.
pub async fn connect_raw(url: &str, no_tls: bool) -> Result<Client, tokio_postgres::Error> {
    if no_tls {
        connect_with(url, tokio_postgres::NoTls).await
    } else {
        connect_with(url, tls_connector()).await
    }
}
