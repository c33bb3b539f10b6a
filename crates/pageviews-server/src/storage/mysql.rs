//! MySQL-backed counter store.
//!
//! The increment runs as one transaction: `UPDATE ... SET hits = hits + 1`
//! takes the row lock and keeps it until commit, so the `SELECT` that follows
//! in the same transaction sees exactly this caller's increment. Concurrent
//! requests queue on the row lock instead of losing updates.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::{
    MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow,
};
use sqlx::{Connection, Row};

use pageviews_core::counter::CounterStore;
use pageviews_core::error::{PageviewsError, Result};

use crate::config::{DatabaseSettings, DbEndpoint};

const INCREMENT_SQL: &str = "UPDATE visits SET hits = hits + 1";
// No CAST: a non-integer column must fail decoding instead of being coerced.
const READ_SQL: &str = "SELECT hits FROM visits";

// MySQL server error numbers that point at the data, not the connection.
const ER_BAD_FIELD_ERROR: u16 = 1054;
const ER_NO_SUCH_TABLE: u16 = 1146;
const ER_WARN_DATA_OUT_OF_RANGE: u16 = 1264;
const ER_TRUNCATED_WRONG_VALUE: u16 = 1292;
const ER_TRUNCATED_WRONG_VALUE_FOR_FIELD: u16 = 1366;

#[derive(Debug, Clone)]
pub struct MySqlCounterStore {
    pool: MySqlPool,
}

impl MySqlCounterStore {
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open the pool and establish the first connection.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = pool_options(settings)
            .connect_with(connect_options(settings)?)
            .await
            .map_err(|e| {
                PageviewsError::StorageUnavailable(format!(
                    "connect to {} failed: {e}",
                    settings.describe()
                ))
            })?;
        Ok(Self::from_pool(pool))
    }

    /// Build the pool without touching the network; connections open on demand.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self> {
        let pool = pool_options(settings).connect_lazy_with(connect_options(settings)?);
        Ok(Self::from_pool(pool))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn pool_options(settings: &DatabaseSettings) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.connect_timeout)
}

pub fn connect_options(settings: &DatabaseSettings) -> Result<MySqlConnectOptions> {
    match &settings.endpoint {
        DbEndpoint::Url(url) => MySqlConnectOptions::from_str(url).map_err(|e| {
            PageviewsError::InvalidConfig(format!(
                "invalid connection url {}: {e}",
                settings.describe()
            ))
        }),
        DbEndpoint::HostPort { host, port } => {
            let opts = MySqlConnectOptions::new()
                .host(host)
                .port(*port)
                .username(&settings.user)
                .database(&settings.name);
            Ok(match &settings.password {
                Some(pw) => opts.password(pw),
                None => opts,
            })
        }
    }
}

/// Map a driver error onto the store's two failure kinds.
pub fn classify(op: &str, e: sqlx::Error) -> PageviewsError {
    let integrity = match &e {
        sqlx::Error::RowNotFound
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => true,
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|m| {
                matches!(
                    m.number(),
                    ER_BAD_FIELD_ERROR
                        | ER_NO_SUCH_TABLE
                        | ER_WARN_DATA_OUT_OF_RANGE
                        | ER_TRUNCATED_WRONG_VALUE
                        | ER_TRUNCATED_WRONG_VALUE_FOR_FIELD
                )
            })
            .unwrap_or(false),
        _ => false,
    };

    if integrity {
        PageviewsError::StorageIntegrity(format!("{op}: {e}"))
    } else {
        PageviewsError::StorageUnavailable(format!("{op}: {e}"))
    }
}

/// Exactly one counter row.
fn single_row<T>(rows: Vec<T>) -> Result<T> {
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Ok(row),
        (None, _) => Err(PageviewsError::StorageIntegrity("counter row missing".into())),
        (Some(_), Some(_)) => Err(PageviewsError::StorageIntegrity(format!(
            "expected one counter row, found {}",
            rows.len() + 2
        ))),
    }
}

fn non_negative(hits: i64) -> Result<u64> {
    u64::try_from(hits)
        .map_err(|_| PageviewsError::StorageIntegrity(format!("negative hits value: {hits}")))
}

/// Decode `hits` from a signed or unsigned integer column. Any other column
/// type (VARCHAR, DECIMAL, ...) surfaces as a decode error.
fn decode_hits(row: &MySqlRow) -> Result<u64> {
    match row.try_get::<u64, _>(0) {
        Ok(hits) => Ok(hits),
        Err(_) => {
            let hits = row.try_get::<i64, _>(0).map_err(|e| classify("decode hits", e))?;
            non_negative(hits)
        }
    }
}

async fn read_hits<'c, E>(executor: E) -> Result<u64>
where
    E: sqlx::Executor<'c, Database = sqlx::MySql>,
{
    let rows = sqlx::query(READ_SQL)
        .fetch_all(executor)
        .await
        .map_err(|e| classify("read hits", e))?;
    decode_hits(&single_row(rows)?)
}

#[async_trait]
impl CounterStore for MySqlCounterStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| classify("acquire", e))?;
        conn.ping()
            .await
            .map_err(|e| PageviewsError::StorageUnavailable(format!("ping: {e}")))
    }

    async fn increment_and_read(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| classify("begin", e))?;

        // A failed update returns here; dropping `tx` rolls it back and the read is skipped.
        let affected = sqlx::query(INCREMENT_SQL)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("update hits", e))?
            .rows_affected();

        if affected != 1 {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "rollback after bad row count failed");
            }
            return Err(match affected {
                0 => PageviewsError::StorageIntegrity("counter row missing".into()),
                n => PageviewsError::StorageIntegrity(format!(
                    "expected one counter row, update touched {n}"
                )),
            });
        }

        // A malformed value returns here too; the increment is rolled back with `tx`.
        let hits = read_hits(&mut *tx).await?;

        tx.commit().await.map_err(|e| classify("commit", e))?;
        Ok(hits)
    }

    async fn current(&self) -> Result<u64> {
        read_hits(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn exactly_one_counter_row() {
        assert_eq!(single_row(vec![6]).unwrap(), 6);
        assert!(matches!(
            single_row(Vec::<u64>::new()),
            Err(PageviewsError::StorageIntegrity(_))
        ));
        let err = single_row(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, PageviewsError::StorageIntegrity(_)));
        assert!(err.to_string().contains("found 3"));
    }

    #[test]
    fn negative_hits_are_rejected() {
        assert_eq!(non_negative(0).unwrap(), 0);
        assert!(matches!(
            non_negative(-3),
            Err(PageviewsError::StorageIntegrity(_))
        ));
    }

    #[test]
    fn read_query_does_not_coerce() {
        assert!(!READ_SQL.to_ascii_uppercase().contains("CAST"));
    }

    #[test]
    fn driver_errors_are_classified() {
        assert!(matches!(
            classify("read hits", sqlx::Error::RowNotFound),
            PageviewsError::StorageIntegrity(_)
        ));
        assert!(matches!(
            classify("acquire", sqlx::Error::PoolTimedOut),
            PageviewsError::StorageUnavailable(_)
        ));
        assert!(matches!(
            classify("acquire", sqlx::Error::PoolClosed),
            PageviewsError::StorageUnavailable(_)
        ));
        assert!(matches!(
            classify(
                "decode hits",
                sqlx::Error::ColumnDecode {
                    index: "0".into(),
                    source: "mismatched types".into(),
                }
            ),
            PageviewsError::StorageIntegrity(_)
        ));
    }
}
