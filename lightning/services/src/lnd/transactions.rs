use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::proto::lnrpc;
use torq_types::prelude::Transaction;

use super::{from_unix_seconds, next_message, non_empty};
use crate::{
    activity::store_transaction, context::ServiceContext, errors::Result, lifecycle::ServiceHandle,
};

/// Imports the wallet transactions above the stored block height, then follows new ones.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;

    // fixed for the lifetime of the service, later blocks may hold several transactions
    let high_water_mark = ctx.db.get_last_transaction_block_height(None, node_id).await?.unwrap_or(0);

    let mut updates = client.subscribe_transactions().await?;

    let start_height = i32::try_from(high_water_mark.saturating_add(1)).unwrap_or(i32::MAX);
    let mut imported = 0;
    for transaction in client.get_transactions(start_height).await? {
        if let Some(transaction) = normalize(node_id, high_water_mark, transaction) {
            if store_transaction(ctx, transaction).await? {
                imported += 1;
            }
        }
    }
    tracing::debug!(node_id, high_water_mark, imported, "transactions imported");
    handle.active();

    while let Some(transaction) = next_message(cancel, &mut updates, "transactions").await? {
        if let Some(transaction) = normalize(node_id, high_water_mark, transaction) {
            store_transaction(ctx, transaction).await?;
        }
    }
    Ok(())
}

/// Drops unconfirmed transactions and those at or below the high-water mark.
fn normalize(node_id: i64, high_water_mark: u32, transaction: lnrpc::Transaction) -> Option<Transaction> {
    let block_height = u32::try_from(transaction.block_height).ok().filter(|h| *h > 0)?;
    if block_height <= high_water_mark {
        return None;
    }

    Some(Transaction {
        node_id,
        tx_hash: transaction.tx_hash,
        timestamp: from_unix_seconds(transaction.time_stamp),
        amount: transaction.amount,
        total_fees: transaction.total_fees,
        num_confirmations: transaction.num_confirmations,
        block_height,
        block_hash: non_empty(transaction.block_hash),
        dest_addresses: transaction.dest_addresses,
        raw_tx_hex: non_empty(transaction.raw_tx_hex),
        label: non_empty(transaction.label),
        flags: Default::default(),
    })
}
