use std::time::Duration;

use async_trait::async_trait;
use torq_lightning_rpc::{
    LndConnection,
    proto::lnrpc::{self, policy_update_request::Scope},
};
use torq_types::prelude::{Chain, Implementation, Network, WalletBalance};

use crate::{
    backend::{InvoiceParameters, LightningBackend, PolicySubmission},
    errors::{RequestError, Result},
    messages::{AddressType, CreatedInvoice, FailedRoutingPolicyUpdate, NodeInformation, PeerInfo, SignatureVerification},
};

pub struct LndBackend {
    client: LndConnection,
}

impl LndBackend {
    pub fn new(client: LndConnection) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LightningBackend for LndBackend {
    fn implementation(&self) -> Implementation {
        Implementation::Lnd
    }

    async fn information(&self) -> Result<NodeInformation> {
        let info = self.client.get_info().await?;
        let (chain, network) = match info.chains.first() {
            Some(c) => (
                c.chain.parse::<Chain>().unwrap_or_default(),
                c.network.parse::<Network>().unwrap_or_default(),
            ),
            None => (Chain::Bitcoin, Network::MainNet),
        };

        Ok(NodeInformation {
            implementation: Implementation::Lnd,
            version: info.version,
            public_key: info.identity_pubkey,
            alias: info.alias,
            color: info.color,
            chain,
            network,
            block_height: info.block_height,
            num_peers: info.num_peers,
            num_active_channels: info.num_active_channels,
            num_inactive_channels: info.num_inactive_channels,
            num_pending_channels: info.num_pending_channels,
        })
    }

    async fn wallet_balance(&self) -> Result<WalletBalance> {
        let balance = self.client.wallet_balance().await?;
        Ok(WalletBalance {
            total_balance: balance.total_balance,
            confirmed_balance: balance.confirmed_balance,
            unconfirmed_balance: balance.unconfirmed_balance,
            locked_balance: balance.locked_balance,
        })
    }

    async fn new_address(&self, address_type: AddressType, account: Option<String>) -> Result<String> {
        let r#type = match address_type {
            AddressType::P2wkh => lnrpc::AddressType::WitnessPubkeyHash,
            AddressType::NestedP2wkh => lnrpc::AddressType::NestedPubkeyHash,
            AddressType::P2tr => lnrpc::AddressType::TaprootPubkey,
        };
        let response = self
            .client
            .new_address(lnrpc::NewAddressRequest {
                r#type: r#type as i32,
                account: account.unwrap_or_default(),
            })
            .await?;
        Ok(response.address)
    }

    async fn new_invoice(&self, parameters: InvoiceParameters) -> Result<CreatedInvoice> {
        let value_msat = parameters
            .value_msat
            .map(i64::try_from)
            .transpose()
            .map_err(|_| RequestError::Validation("invoice amount is too large".into()))?
            .unwrap_or_default();
        let expiry = parameters
            .expiry_seconds
            .map(i64::try_from)
            .transpose()
            .map_err(|_| RequestError::Validation("invoice expiry is too large".into()))?
            .unwrap_or_default();

        let response = self
            .client
            .add_invoice(lnrpc::Invoice {
                memo: parameters.memo,
                value_msat,
                expiry,
                ..Default::default()
            })
            .await?;

        Ok(CreatedInvoice {
            payment_request: response.payment_request,
            payment_hash: hex::encode(response.r_hash),
            add_index: Some(response.add_index),
        })
    }

    async fn connect_peer(&self, public_key: String, host: String, timeout: Duration) -> Result<()> {
        self.client
            .connect_peer(lnrpc::ConnectPeerRequest {
                addr: Some(lnrpc::LightningAddress { pubkey: public_key, host }),
                perm: false,
                timeout: timeout.as_secs(),
            })
            .await?;
        Ok(())
    }

    async fn disconnect_peer(&self, public_key: String) -> Result<()> {
        Ok(self.client.disconnect_peer(public_key).await?)
    }

    async fn list_peers(&self) -> Result<Vec<PeerInfo>> {
        Ok(self
            .client
            .list_peers()
            .await?
            .into_iter()
            .map(|p| PeerInfo {
                public_key: p.pub_key,
                address: Some(p.address).filter(|a| !a.is_empty()),
                connected: true,
                inbound: Some(p.inbound),
                bytes_sent: Some(p.bytes_sent),
                bytes_received: Some(p.bytes_recv),
                ping_time_us: Some(p.ping_time),
            })
            .collect())
    }

    async fn sign_message(&self, message: String) -> Result<String> {
        Ok(self.client.sign_message(message.into_bytes()).await?)
    }

    async fn verify_message(&self, message: String, signature: String) -> Result<SignatureVerification> {
        let response = self.client.verify_message(message.into_bytes(), signature).await?;
        Ok(SignatureVerification {
            valid: response.valid,
            public_key: response.pubkey,
        })
    }

    async fn update_routing_policy(&self, submission: PolicySubmission) -> Result<Vec<FailedRoutingPolicyUpdate>> {
        let policy = submission.policy;
        let fee_rate_ppm = u32::try_from(policy.fee_rate_milli_msat)
            .map_err(|_| RequestError::Validation("fee rate out of range".into()))?;

        let response = self
            .client
            .update_channel_policy(lnrpc::PolicyUpdateRequest {
                scope: Some(Scope::ChanPoint(lnrpc::ChannelPoint::from_str_txid(
                    submission.channel_point.funding_transaction_hash.clone(),
                    submission.channel_point.funding_output_index,
                ))),
                base_fee_msat: policy.fee_base_msat,
                fee_rate: 0.0,
                time_lock_delta: policy.time_lock_delta,
                max_htlc_msat: policy.max_htlc_msat,
                min_htlc_msat: policy.min_htlc_msat,
                min_htlc_msat_specified: true,
                fee_rate_ppm,
            })
            .await?;

        Ok(response
            .failed_updates
            .into_iter()
            .map(|f| FailedRoutingPolicyUpdate {
                channel_id: submission.channel_id,
                reason: lnrpc::UpdateFailure::try_from(f.reason)
                    .map(|r| format!("{r:?}"))
                    .unwrap_or_else(|_| f.reason.to_string()),
                error: f.update_error,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use torq_lightning_rpc::test_utils::{LndScript, ScriptedLnd};
    use torq_types::prelude::{ChannelPoint, RoutingPolicy};

    use super::*;

    #[tokio::test]
    async fn test_policy_update_targets_the_channel_point() -> anyhow::Result<()> {
        let lnd = ScriptedLnd::new(LndScript::default());
        let backend = LndBackend::new(lnd.clone());

        let failed = backend
            .update_routing_policy(PolicySubmission {
                channel_id: 3,
                channel_point: ChannelPoint::new("ab01", 1),
                short_channel_id: None,
                policy: RoutingPolicy {
                    fee_rate_milli_msat: 250,
                    fee_base_msat: 1000,
                    time_lock_delta: 40,
                    min_htlc_msat: 1,
                    max_htlc_msat: 990_000_000,
                    disabled: false,
                },
                time_lock_delta_changed: false,
            })
            .await?;
        assert!(failed.is_empty());

        let sent = lnd.requests().policy_updates;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].fee_rate_ppm, 250);
        assert_eq!(sent[0].base_fee_msat, 1000);
        assert_eq!(
            sent[0].scope,
            Some(Scope::ChanPoint(lnrpc::ChannelPoint::from_str_txid("ab01", 1)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_updates_are_translated() -> anyhow::Result<()> {
        let lnd = ScriptedLnd::new(LndScript {
            policy_failures: vec![lnrpc::FailedUpdate {
                outpoint: None,
                reason: lnrpc::UpdateFailure::Pending as i32,
                update_error: "channel is pending".into(),
            }],
            ..Default::default()
        });
        let backend = LndBackend::new(lnd);

        let failed = backend
            .update_routing_policy(PolicySubmission {
                channel_id: 3,
                channel_point: ChannelPoint::new("ab01", 0),
                short_channel_id: None,
                policy: RoutingPolicy::default(),
                time_lock_delta_changed: false,
            })
            .await?;

        assert_eq!(
            failed,
            vec![FailedRoutingPolicyUpdate {
                channel_id: 3,
                reason: "Pending".into(),
                error: "channel is pending".into(),
            }]
        );
        Ok(())
    }
}
