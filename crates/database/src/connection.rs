use crate::error::DbError;
use crate::mongo::MongoStore;
use crate::store::DocumentStore;
use futures::FutureExt;
use mongodb::Client;
use mongodb::options::ClientOptions;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info, warn};

/// Opens a client for `uri` and selects `database`.
///
/// Driver defaults are used for pooling and timeouts. The driver connects
/// lazily, so an unreachable server surfaces on the first operation; call
/// `DocumentStore::ping` to check up front.
pub async fn connect(uri: &str, database: &str) -> Result<MongoStore, DbError> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(DbError::ConnectionError)?;
    options.app_name = Some("boutique-maint".to_string());

    let client = Client::with_options(options).map_err(DbError::ConnectionError)?;
    let db = client.database(database);
    info!(database, "database client ready");

    Ok(MongoStore::new(client, db))
}

/// Runs `body` against `store`, then closes `store` exactly once.
///
/// The store is closed whether `body` returns `Ok`, returns `Err`, or
/// panics; a panic is resumed after the close. When both the body and the
/// close fail, the body's error wins and the close error is logged.
pub async fn with_session<S, T, E, F>(store: S, body: F) -> Result<T, E>
where
    S: DocumentStore,
    E: From<DbError>,
    F: AsyncFnOnce(&S) -> Result<T, E>,
{
    let outcome = AssertUnwindSafe(body(&store)).catch_unwind().await;
    let closed = store.close().await;

    match outcome {
        Ok(Ok(value)) => {
            closed?;
            Ok(value)
        }
        Ok(Err(err)) => {
            if let Err(close_err) = closed {
                warn!(
                    error = &close_err as &(dyn std::error::Error + 'static),
                    "failed to close the connection after an error"
                );
            }
            Err(err)
        }
        Err(payload) => {
            if let Err(close_err) = closed {
                error!(
                    error = &close_err as &(dyn std::error::Error + 'static),
                    "failed to close the connection after a panic"
                );
            }
            panic::resume_unwind(payload)
        }
    }
}
