use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_requests::cln::wallet_balance_from_funds;
use torq_lightning_rpc::ClnConnection;

use super::{sat, to_hex};
use crate::{
    context::ServiceContext,
    errors::Result,
    lifecycle::{ServiceHandle, tick},
};

/// Polls `listfunds` for the on-chain wallet balance and the local channel balances.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.cln(node_id).await?;

    import_funds(ctx, &client, node_id).await?;
    handle.active();

    while tick(cancel, ctx.cfg.cln_funds_interval).await {
        import_funds(ctx, &client, node_id).await?;
    }
    Ok(())
}

async fn import_funds<Db>(ctx: &ServiceContext<Db>, client: &ClnConnection, node_id: i64) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let funds = client.list_funds().await?;
    ctx.cache.set_wallet_balance(node_id, wallet_balance_from_funds(&funds));

    for channel in &funds.channels {
        let channel_id = ctx
            .cache
            .get_channel_id_by_funding_transaction(&to_hex(&channel.funding_txid), channel.funding_output);
        if channel_id == 0 {
            continue;
        }
        let local_balance = sat(channel.our_amount_msat.as_ref());
        let remote_balance = sat(channel.amount_msat.as_ref()) - local_balance;
        ctx.cache
            .set_channel_state_balances(node_id, channel_id, local_balance, remote_balance);
    }
    Ok(())
}
