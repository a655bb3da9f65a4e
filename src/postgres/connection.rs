//! Server-backend connection lifecycle and statement execution.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use crate::error::VidmetaDbError;
use crate::results::{NativeResult, PgRows, ResultSet};
use crate::typemap::{CatalogRow, DatabaseTypes};
use crate::types::Value;

use super::params::Params;

/// One connection to the server backend.
///
/// Connecting loads the backend's type catalog; the classified map is shared
/// with every result set produced over this connection.
pub struct PgConnection {
    conninfo: String,
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    db_types: Arc<DatabaseTypes>,
}

impl PgConnection {
    /// Connect and load the type catalog.
    ///
    /// # Errors
    ///
    /// Returns driver errors from connecting or from the catalog query.
    pub async fn connect(conninfo: &str) -> Result<Self, VidmetaDbError> {
        let (client, driver, db_types) = open(conninfo).await?;
        Ok(Self {
            conninfo: conninfo.to_string(),
            client: Some(client),
            driver: Some(driver),
            db_types: Arc::new(db_types),
        })
    }

    /// Close the connection. Safe to call repeatedly or before connecting.
    pub fn disconnect(&mut self) {
        self.client = None;
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    /// Drop any existing connection and open a fresh one, reloading the type
    /// catalog. Works without a prior successful connect.
    ///
    /// # Errors
    ///
    /// Returns driver errors from connecting or from the catalog query.
    pub async fn reconnect(&mut self) -> Result<(), VidmetaDbError> {
        self.disconnect();
        let (client, driver, db_types) = open(&self.conninfo).await?;
        self.client = Some(client);
        self.driver = Some(driver);
        self.db_types = Arc::new(db_types);
        Ok(())
    }

    /// Probe the connection with a trivial round trip.
    pub async fn is_connected(&self) -> bool {
        match &self.client {
            Some(client) if !client.is_closed() => {
                client.simple_query("SELECT 1;").await.is_ok()
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn db_types(&self) -> Arc<DatabaseTypes> {
        Arc::clone(&self.db_types)
    }

    fn client(&self) -> Result<&Client, VidmetaDbError> {
        self.client
            .as_ref()
            .ok_or_else(|| VidmetaDbError::ConnectionError("not connected".to_string()))
    }

    /// Run a statement that returns no rows; the count of affected rows comes
    /// back.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ConnectionError` when disconnected, or the
    /// driver error from execution.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, VidmetaDbError> {
        debug!(statement = sql, "executing");
        let client = self.client()?;
        let bound = Params::convert(params);
        Ok(client.execute(sql, bound.as_refs()).await?)
    }

    /// Run a query and hand its rows to `result_set`. On failure the result
    /// set is cleared so stale rows cannot be read.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ConnectionError` when disconnected, or the
    /// driver error from preparation or execution.
    pub async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        result_set: &mut ResultSet,
    ) -> Result<usize, VidmetaDbError> {
        debug!(statement = sql, "fetching");
        let client = match self.client() {
            Ok(client) => client,
            Err(err) => {
                result_set.clear();
                return Err(err);
            }
        };
        let bound = Params::convert(params);
        let outcome = async {
            let statement = client.prepare(sql).await?;
            let columns: Vec<(String, Type)> = statement
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.type_().clone()))
                .collect();
            let rows = client.query(&statement, bound.as_refs()).await?;
            Ok::<_, tokio_postgres::Error>((columns, rows))
        }
        .await;
        match outcome {
            Ok((columns, rows)) => {
                let count = rows.len();
                result_set.new_result(NativeResult::Postgres(PgRows::new(columns, rows)));
                Ok(count)
            }
            Err(err) => {
                result_set.clear();
                Err(err.into())
            }
        }
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn open(
    conninfo: &str,
) -> Result<(Client, JoinHandle<()>, DatabaseTypes), VidmetaDbError> {
    let (client, connection) = tokio_postgres::connect(conninfo, NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "connection driver terminated");
        }
    });
    let db_types = load_catalog(&client).await?;
    debug!(types = db_types.len(), "type catalog loaded");
    Ok((client, driver, db_types))
}

async fn load_catalog(client: &Client) -> Result<DatabaseTypes, VidmetaDbError> {
    let rows = client
        .query(
            "SELECT oid, typname, typcategory, typlen, typelem FROM pg_catalog.pg_type;",
            &[],
        )
        .await?;
    let mut catalog = Vec::with_capacity(rows.len());
    for row in rows {
        let oid: u32 = row.try_get(0)?;
        let name: String = row.try_get(1)?;
        let category: i8 = row.try_get(2)?;
        let length: i16 = row.try_get(3)?;
        let elem_oid: u32 = row.try_get(4)?;
        catalog.push(CatalogRow {
            oid,
            name,
            category: u8::from_ne_bytes(category.to_ne_bytes()),
            length,
            elem_oid,
        });
    }
    Ok(DatabaseTypes::from_catalog(catalog))
}
