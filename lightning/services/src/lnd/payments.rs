use tokio_util::sync::CancellationToken;
use torq_db::{TorqDbAllOperations, activity::TorqDbActivityOperations};
use torq_lightning_rpc::{LndConnection, proto::lnrpc};
use torq_types::prelude::{Payment, PaymentStatus};

use super::{from_unix_nanos, non_empty};
use crate::{
    context::ServiceContext,
    errors::Result,
    events::TorqEvent,
    lifecycle::{ServiceHandle, tick},
};

/// Imports the payments made since the last stored one, then repeats on the payments interval.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let client = ctx.lnd(node_id).await?;

    let imported = import_payments(ctx, &client, node_id, cancel).await?;
    tracing::debug!(node_id, imported, "payments imported");
    handle.active();

    while tick(cancel, ctx.cfg.payments_interval).await {
        import_payments(ctx, &client, node_id, cancel).await?;
    }
    Ok(())
}

async fn import_payments<Db>(
    ctx: &ServiceContext<Db>,
    client: &LndConnection,
    node_id: i64,
    cancel: &CancellationToken,
) -> Result<usize>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let page_size = u64::from(ctx.cfg.import_page_size.max(1));
    let mut index_offset = ctx.db.get_last_payment_index(None, node_id).await?;
    let mut imported = 0;

    while !cancel.is_cancelled() {
        let page = client
            .list_payments(lnrpc::ListPaymentsRequest {
                include_incomplete: true,
                index_offset,
                max_payments: page_size,
                reversed: false,
            })
            .await?;
        let count = page.payments.len();
        for payment in page.payments {
            store_payment(ctx, normalize(node_id, payment)?).await?;
        }
        imported += count;

        if (count as u64) < page_size || page.last_index_offset <= index_offset {
            break;
        }
        index_offset = page.last_index_offset;
    }
    Ok(imported)
}

pub(crate) async fn store_payment<Db>(ctx: &ServiceContext<Db>, payment: Payment) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    ctx.db.upsert_payment(None, payment.clone()).await?;
    ctx.bus.publish(TorqEvent::PaymentUpdated(Box::new(payment)));
    Ok(())
}

pub(crate) fn normalize(node_id: i64, payment: lnrpc::Payment) -> Result<Payment> {
    let failure_reason = match lnrpc::PaymentFailureReason::try_from(payment.failure_reason) {
        Ok(lnrpc::PaymentFailureReason::FailureReasonNone) => None,
        Ok(reason) => Some(format!("{reason:?}")),
        Err(_) => Some(format!("FailureReason{}", payment.failure_reason)),
    };

    Ok(Payment {
        node_id,
        payment_hash: payment.payment_hash,
        payment_index: payment.payment_index,
        value_msat: payment.value_msat,
        fee_msat: payment.fee_msat,
        status: PaymentStatus::try_from(payment.status)?,
        failure_reason,
        creation_time: from_unix_nanos(payment.creation_time_ns),
        payment_preimage: non_empty(payment.payment_preimage),
        payment_request: non_empty(payment.payment_request),
        htlc_attempts: u32::try_from(payment.htlcs.len()).unwrap_or(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use torq_lightning_rpc::test_utils::LndScript;
    use torq_types::prelude::{Implementation, ServiceStatus, ServiceType};

    use super::*;
    use crate::{
        config::ServicesConfig,
        test_support::{TestEnv, next_event, status_reached},
    };

    fn lnd_payment(payment_index: u64, status: lnrpc::PaymentStatus) -> lnrpc::Payment {
        lnrpc::Payment {
            payment_hash: hex::encode([payment_index as u8; 32]),
            value_msat: 50_000,
            fee_msat: 12,
            status: status as i32,
            creation_time_ns: 1_700_000_000_000_000_000,
            htlcs: vec![lnrpc::HtlcAttempt { attempt_id: 1 }],
            payment_index,
            ..Default::default()
        }
    }

    #[test]
    fn test_failure_reason_is_named() -> anyhow::Result<()> {
        let failed = normalize(
            1,
            lnrpc::Payment {
                failure_reason: lnrpc::PaymentFailureReason::FailureReasonNoRoute as i32,
                ..lnd_payment(1, lnrpc::PaymentStatus::Failed)
            },
        )?;
        assert_eq!(failed.failure_reason.as_deref(), Some("FailureReasonNoRoute"));
        assert_eq!(failed.htlc_attempts, 1);
        assert_eq!(normalize(1, lnd_payment(2, lnrpc::PaymentStatus::Succeeded))?.failure_reason, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_payments_are_polled() -> anyhow::Result<()> {
        let script = LndScript {
            payments: vec![
                lnd_payment(1, lnrpc::PaymentStatus::Succeeded),
                lnd_payment(2, lnrpc::PaymentStatus::InFlight),
            ],
            ..Default::default()
        };
        let cfg = ServicesConfig {
            payments_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Lnd, script, Default::default(), cfg).await?;
        let mut events = env.ctx.bus.subscribe();

        let (ctx, handle, cancel) = env.service(ServiceType::LndPayments);
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });
        status_reached(&mut events, ServiceType::LndPayments, ServiceStatus::Active).await?;
        assert_eq!(env.ctx.db.get_payments(None, env.node_id).await?.len(), 2);
        assert_eq!(env.ctx.db.get_in_flight_payments(None, env.node_id).await?.len(), 1);

        env.lnd
            .update_script(|s| s.payments.push(lnd_payment(3, lnrpc::PaymentStatus::Succeeded)));
        next_event(&mut events, |e| matches!(e, TorqEvent::PaymentUpdated(p) if p.payment_index == 3)).await?;
        assert_eq!(env.ctx.db.get_payments(None, env.node_id).await?.len(), 3);
        Ok(())
    }
}
