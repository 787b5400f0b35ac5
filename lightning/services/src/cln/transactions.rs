use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::{ClnConnection, proto::cln};
use torq_types::prelude::Transaction;

use super::{msat, to_hex};
use crate::{
    activity::store_transaction,
    context::ServiceContext,
    errors::Result,
    lifecycle::{ServiceHandle, tick},
};

/// Polls the wallet transactions and stores the ones confirmed above the last stored block.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.cln(node_id).await?;

    let stored = import_transactions(ctx, &client, node_id, cancel).await?;
    tracing::debug!(node_id, stored, "wallet transactions imported");
    handle.active();

    while tick(cancel, ctx.cfg.cln_transactions_interval).await {
        import_transactions(ctx, &client, node_id, cancel).await?;
    }
    Ok(())
}

async fn import_transactions<Db>(
    ctx: &ServiceContext<Db>,
    client: &ClnConnection,
    node_id: i64,
    cancel: &CancellationToken,
) -> Result<usize>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let mark = ctx.db.get_last_transaction_block_height(None, node_id).await?.unwrap_or_default();
    let (chain, network) = ctx.network_of(node_id);
    let current_height = ctx.cache.get_block_height(chain, network);

    let mut stored = 0;
    for transaction in client.list_transactions().await? {
        if cancel.is_cancelled() {
            break;
        }
        // unconfirmed, or already covered by the mark
        if transaction.blockheight == 0 || transaction.blockheight <= mark {
            continue;
        }
        if store_transaction(ctx, normalize(node_id, current_height, transaction)).await? {
            stored += 1;
        }
    }
    Ok(stored)
}

fn normalize(node_id: i64, current_height: u32, transaction: cln::ListtransactionsTransactions) -> Transaction {
    let amount_msat: u64 = transaction.outputs.iter().map(|o| msat(o.amount_msat.as_ref())).sum();
    let num_confirmations = current_height
        .checked_sub(transaction.blockheight)
        .map(|depth| i32::try_from(depth + 1).unwrap_or(i32::MAX))
        .unwrap_or_default();

    Transaction {
        node_id,
        tx_hash: to_hex(&transaction.hash),
        amount: i64::try_from(amount_msat / 1000).unwrap_or(i64::MAX),
        num_confirmations,
        block_height: transaction.blockheight,
        raw_tx_hex: (!transaction.rawtx.is_empty()).then(|| to_hex(&transaction.rawtx)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use torq_lightning_rpc::test_utils::ClnScript;
    use torq_types::prelude::{Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::test_support::{TestEnv, status_reached};

    fn cln_transaction(fill: u8, blockheight: u32) -> cln::ListtransactionsTransactions {
        cln::ListtransactionsTransactions {
            hash: vec![fill; 32],
            rawtx: vec![0x02, 0x00],
            blockheight,
            txindex: 1,
            outputs: vec![
                cln::ListtransactionsTransactionsOutputs {
                    index: 0,
                    amount_msat: Some(cln::Amount { msat: 150_000_000 }),
                    script_pub_key: vec![],
                },
                cln::ListtransactionsTransactionsOutputs {
                    index: 1,
                    amount_msat: Some(cln::Amount { msat: 50_000_000 }),
                    script_pub_key: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_amount_is_the_sum_of_outputs() {
        let transaction = normalize(1, 110, cln_transaction(1, 101));
        assert_eq!(transaction.amount, 200_000);
        assert_eq!(transaction.num_confirmations, 10);
        assert_eq!(transaction.raw_tx_hex.as_deref(), Some("0200"));
    }

    #[tokio::test]
    async fn test_only_confirmed_transactions_above_the_mark_are_stored() -> anyhow::Result<()> {
        let env = TestEnv::new(Implementation::Cln, Default::default(), ClnScript::default(), Default::default()).await?;
        env.ctx
            .db
            .insert_transaction(
                None,
                Transaction {
                    node_id: env.node_id,
                    tx_hash: hex::encode([9u8; 32]),
                    timestamp: Some(chrono::Utc::now()),
                    block_height: 200,
                    ..Default::default()
                },
            )
            .await?;
        env.cln.update_script(|s| {
            s.transactions = vec![cln_transaction(1, 150), cln_transaction(2, 0), cln_transaction(3, 201)];
        });
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::ClnTransactions);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::ClnTransactions, ServiceStatus::Active).await?;

        let stored = env.ctx.db.get_transactions(None, env.node_id).await?;
        let hashes: Vec<&str> = stored.iter().map(|t| t.tx_hash.as_str()).collect();
        assert_eq!(stored.len(), 2);
        assert!(hashes.contains(&hex::encode([3u8; 32]).as_str()));
        Ok(())
    }
}
