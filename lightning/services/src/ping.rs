//! Liveness pings to Vector and Amboss, signed by the managed node.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use torq_db::TorqDbAllOperations;
use torq_lightning_requests::messages::SignMessageRequest;
use torq_types::prelude::ServiceType;

use crate::{
    context::ServiceContext,
    errors::Result,
    lifecycle::{ServiceHandle, tick},
    vector::{Pinger, SignedPing},
};

/// Signs the current time through the request router and posts it, once per ping interval.
///
/// A failed ping is logged and retried on the next tick; it never fails the service.
pub async fn run<Db>(ctx: &ServiceContext<Db>, handle: &ServiceHandle, cancel: &CancellationToken) -> Result<()>
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let pinger: Arc<dyn Pinger> = match handle.service_type() {
        ServiceType::AmbossPing => ctx.amboss.clone(),
        _ => ctx.vector.clone(),
    };
    handle.active();

    loop {
        ping_once(ctx, pinger.as_ref(), handle).await;
        if !tick(cancel, ctx.cfg.ping_interval).await {
            return Ok(());
        }
    }
}

async fn ping_once<Db>(ctx: &ServiceContext<Db>, pinger: &dyn Pinger, handle: &ServiceHandle)
where
    Db: TorqDbAllOperations + Clone + Send + Sync + 'static,
{
    let node_id = handle.node_id();
    let timestamp = chrono::Utc::now();
    let message = timestamp.to_rfc3339();

    let signed = ctx
        .requests
        .sign_message(SignMessageRequest {
            node_id,
            message: message.clone(),
        })
        .await;
    if !signed.is_active() {
        tracing::warn!(node_id, service = %handle.service_type(), error = ?signed.error, "could not sign ping");
        return;
    }

    let ping = SignedPing {
        node_id,
        public_key: ctx.cache.get_node_settings_by_node_id(node_id).public_key,
        timestamp,
        message,
        signature: signed.data,
    };
    match pinger.ping(ping).await {
        Ok(()) => tracing::trace!(node_id, service = %handle.service_type(), "ping sent"),
        Err(error) => tracing::warn!(node_id, service = %handle.service_type(), %error, "ping failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use torq_lightning_rpc::test_utils::LndScript;
    use torq_types::prelude::Implementation;

    use super::*;
    use crate::{
        config::ServicesConfig,
        errors::ServiceError,
        test_support::{TestEnv, public_key},
        vector::MockPinger,
    };

    #[tokio::test]
    async fn test_signed_timestamp_is_posted_and_failures_are_tolerated() -> anyhow::Result<()> {
        let script = LndScript {
            signature: "d2abc".into(),
            ..Default::default()
        };
        let cfg = ServicesConfig {
            ping_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let env = TestEnv::new(Implementation::Lnd, script, Default::default(), cfg).await?;

        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let mut amboss = MockPinger::new();
        let mut calls = 0;
        amboss.expect_ping().returning(move |ping| {
            calls += 1;
            let _ = sent_tx.send(ping);
            if calls == 1 {
                Err(ServiceError::Explorer("503".into()))
            } else {
                Ok(())
            }
        });
        let mut vector = MockPinger::new();
        vector.expect_ping().never();

        let ctx = env.ctx.clone().with_pingers(Arc::new(vector), Arc::new(amboss));
        let handle = ServiceHandle::new(ctx.cache.clone(), ctx.bus.clone(), env.node_id, ServiceType::AmbossPing);
        let cancel = env.cancel.child_token();
        tokio::spawn(async move { run(&ctx, &handle, &cancel).await });

        for _ in 0..2 {
            let ping = tokio::time::timeout(Duration::from_secs(5), sent_rx.recv())
                .await?
                .ok_or_else(|| anyhow::anyhow!("ping expected"))?;
            assert_eq!(ping.signature, "d2abc");
            assert_eq!(ping.public_key, public_key("02"));
            assert_eq!(chrono::DateTime::parse_from_rfc3339(&ping.message)?, ping.timestamp);
        }
        Ok(())
    }
}
