use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::LndConnection;
use torq_types::prelude::Payment;

use super::payments::{normalize, store_payment};
use crate::{
    context::ServiceContext,
    errors::{Result, ServiceError},
    lifecycle::{ServiceHandle, tick},
};

/// Settles the stored in-flight payments by tracking each of them on the node.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;
    handle.active();

    loop {
        let payments = ctx.db.get_in_flight_payments(None, node_id).await?;
        for payment in payments {
            if cancel.is_cancelled() {
                return Ok(());
            }
            reconcile(ctx, &client, payment).await?;
        }

        if !tick(cancel, ctx.cfg.in_flight_payments_interval).await {
            return Ok(());
        }
    }
}

async fn reconcile<Db>(ctx: &ServiceContext<Db>, client: &LndConnection, stored: Payment) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let hash = match hex::decode(&stored.payment_hash) {
        Ok(hash) => hash,
        Err(_) => {
            return Err(ServiceError::InvalidData(format!(
                "payment hash {} is not hex",
                stored.payment_hash
            )));
        }
    };

    let mut updates = client.track_payment(hash).await?;
    let final_update = tokio::time::timeout(ctx.cfg.track_payment_timeout, async {
        while let Some(update) = updates.next().await {
            let update = normalize(stored.node_id, update?)?;
            if update.status.is_final() {
                return Ok(Some(update));
            }
        }
        Ok::<_, ServiceError>(None)
    })
    .await;

    match final_update {
        Ok(Ok(Some(mut payment))) => {
            if payment.payment_index == 0 {
                payment.payment_index = stored.payment_index;
            }
            tracing::debug!(
                node_id = stored.node_id,
                payment_hash = %stored.payment_hash,
                status = ?payment.status,
                "in-flight payment resolved"
            );
            store_payment(ctx, payment).await
        }
        Ok(Ok(None)) | Err(_) => Ok(()),
        Ok(Err(error)) => Err(error),
    }
}
