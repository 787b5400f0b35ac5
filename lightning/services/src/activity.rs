//! Storage of on-chain transactions shared by the LND and CLN pipelines.

use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_types::prelude::{Transaction, TransactionFlags};

use crate::{context::ServiceContext, errors::Result, events::TorqEvent, vector::TransactionLookup};

/// Stores a confirmed transaction, with the block time from the explorer when available.
///
/// Returns `false` for unconfirmed transactions and for transactions the node already has.
pub async fn store_transaction<Db>(ctx: &ServiceContext<Db>, mut transaction: Transaction) -> Result<bool>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    if transaction.block_height == 0 {
        return Ok(false);
    }

    if let Some(explorer) = ctx.explorer.as_ref() {
        let lookup = TransactionLookup {
            node_id: transaction.node_id,
            transaction_hash: transaction.tx_hash.clone(),
            output_index: None,
        };
        match explorer.transaction_details(lookup).await {
            Ok(Some(details)) => {
                transaction.timestamp = Some(details.block_timestamp);
                transaction.block_hash = Some(details.block_hash);
                transaction.flags = TransactionFlags(transaction.flags.0 | TransactionFlags::BLOCK_TIMESTAMP.0);
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(tx_hash = %transaction.tx_hash, %error, "block explorer lookup failed"),
        }
    }
    if transaction.timestamp.is_none() {
        transaction.timestamp = Some(chrono::Utc::now());
    }

    let inserted = ctx.db.insert_transaction(None, transaction.clone()).await?;
    if inserted {
        tracing::debug!(node_id = transaction.node_id, tx_hash = %transaction.tx_hash, "transaction stored");
        ctx.bus.publish(TorqEvent::TransactionStored(transaction));
    }
    Ok(inserted)
}
