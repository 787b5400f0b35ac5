//! Crate for accessing the database of a Torq installation.
//!
//! The database is the durable store behind the cache: channels, nodes, routing policy
//! history, tags, corridors and the activity imported by the ingestion pipelines.
//! Every group of tables is exposed through its own operations trait implemented by [`db::TorqDb`].

pub mod activity;
pub mod channels;
pub mod corridors;
pub mod db;
pub mod errors;
pub mod nodes;
pub mod peers;
pub mod policies;
pub mod settings;
pub mod tags;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::TransactionTrait;
pub use sea_orm::{DatabaseConnection, DatabaseTransaction};

use crate::{
    activity::TorqDbActivityOperations,
    channels::TorqDbChannelOperations,
    corridors::TorqDbCorridorOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
    nodes::TorqDbNodeOperations,
    peers::TorqDbPeerOperations,
    policies::TorqDbRoutingPolicyOperations,
    settings::TorqDbSettingsOperations,
    tags::TorqDbTagOperations,
};

/// Primary key used in tables that contain only a single row.
pub const SINGULAR_TABLE_FIXED_ID: i64 = 1;

/// Shorthand for the `chrono` based timestamp type used in the database.
pub type DbTimestamp = chrono::DateTime<chrono::Utc>;

/// Represents an already opened transaction.
/// This is a thin wrapper over [DatabaseTransaction].
/// The wrapping behavior is needed to allow transaction agnostic functionalities
/// of the DB traits.
#[derive(Debug)]
pub struct OpenTransaction(DatabaseTransaction);

impl OpenTransaction {
    /// Executes the given `callback` inside the transaction
    /// and commits the transaction if it succeeds or rollbacks otherwise.
    #[tracing::instrument(level = "trace", name = "Sql::perform_in_transaction", skip_all, err)]
    pub async fn perform<F, T, E>(self, callback: F) -> std::result::Result<T, E>
    where
        F: for<'c> FnOnce(&'c OpenTransaction) -> BoxFuture<'c, std::result::Result<T, E>> + Send,
        T: Send,
        E: std::error::Error + From<DbSqlError>,
    {
        let start = std::time::Instant::now();
        let res = callback(&self).await;

        if res.is_ok() {
            self.commit().await?;
        } else {
            self.rollback().await?;
        }

        tracing::trace!(
            elapsed_ms = start.elapsed().as_millis(),
            was_successful = res.is_ok(),
            "transaction completed",
        );

        res
    }

    /// Commits the transaction.
    pub async fn commit(self) -> Result<()> {
        Ok(self.0.commit().await?)
    }

    /// Rollbacks the transaction.
    pub async fn rollback(self) -> Result<()> {
        Ok(self.0.rollback().await?)
    }
}

impl AsRef<DatabaseTransaction> for OpenTransaction {
    fn as_ref(&self) -> &DatabaseTransaction {
        &self.0
    }
}

/// Shorthand for optional transaction.
/// Useful for transaction nesting (see [`TorqDbGeneralModelOperations::nest_transaction`]).
pub type OptTx<'a> = Option<&'a OpenTransaction>;

#[async_trait]
pub trait TorqDbGeneralModelOperations {
    /// Returns reference to the database connection.
    /// Can be used in case transaction is not needed, but
    /// users should aim to use [`TorqDbGeneralModelOperations::begin_transaction`]
    /// and [`TorqDbGeneralModelOperations::nest_transaction`] as much as possible.
    fn conn(&self) -> &DatabaseConnection;

    /// Creates a new transaction.
    async fn begin_transaction(&self) -> Result<OpenTransaction>;

    /// Creates a nested transaction inside the given transaction.
    ///
    /// If `None` is given, behaves exactly as [`TorqDbGeneralModelOperations::begin_transaction`].
    async fn nest_transaction(&self, tx: OptTx<'_>) -> Result<OpenTransaction> {
        if let Some(t) = tx {
            Ok(OpenTransaction(t.as_ref().begin().await?))
        } else {
            self.begin_transaction().await
        }
    }
}

#[async_trait]
impl TorqDbGeneralModelOperations for TorqDb {
    fn conn(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn begin_transaction(&self) -> Result<OpenTransaction> {
        Ok(OpenTransaction(self.db.begin_with_config(None, None).await?))
    }
}

/// Convenience trait that contains all Torq DB operations.
pub trait TorqDbAllOperations:
    TorqDbGeneralModelOperations
    + TorqDbActivityOperations
    + TorqDbChannelOperations
    + TorqDbCorridorOperations
    + TorqDbNodeOperations
    + TorqDbPeerOperations
    + TorqDbRoutingPolicyOperations
    + TorqDbSettingsOperations
    + TorqDbTagOperations
{
}

#[doc(hidden)]
pub mod prelude {
    pub use super::*;
    pub use crate::{
        activity::*, channels::*, corridors::*, db::*, errors::*, nodes::*, peers::*, policies::*, settings::*, tags::*,
    };
}
