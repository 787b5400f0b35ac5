use std::time::Duration;

use async_trait::async_trait;
use torq_lightning_rpc::{
    ClnConnection,
    errors::RpcError,
    proto::cln::{self, Amount},
};
use torq_types::prelude::{Chain, Implementation, Network, WalletBalance};

use crate::{
    backend::{InvoiceParameters, LightningBackend, PolicySubmission, split_host_port},
    errors::{RequestError, Result},
    messages::{AddressType, CreatedInvoice, FailedRoutingPolicyUpdate, NodeInformation, PeerInfo, SignatureVerification},
};

pub struct ClnBackend {
    client: ClnConnection,
}

impl ClnBackend {
    pub fn new(client: ClnConnection) -> Self {
        Self { client }
    }
}

fn decode_public_key(public_key: &str) -> Result<Vec<u8>> {
    hex::decode(public_key).map_err(|_| RequestError::Validation(format!("invalid public key {public_key}")))
}

/// Sums the on-chain outputs of `listfunds` into a wallet balance in satoshis.
///
/// Reserved outputs count as locked in addition to their confirmation status; spent outputs are ignored.
pub fn wallet_balance_from_funds(funds: &cln::ListfundsResponse) -> WalletBalance {
    let mut balance = WalletBalance::default();
    for output in &funds.outputs {
        let sat = output.amount_msat.as_ref().map(|a| a.msat / 1000).unwrap_or_default() as i64;
        if output.reserved {
            balance.locked_balance += sat;
        }
        match cln::OutputStatus::try_from(output.status) {
            Ok(cln::OutputStatus::Confirmed) => balance.confirmed_balance += sat,
            Ok(cln::OutputStatus::Unconfirmed) | Ok(cln::OutputStatus::Immature) => balance.unconfirmed_balance += sat,
            _ => continue,
        }
        balance.total_balance += sat;
    }
    balance
}

#[async_trait]
impl LightningBackend for ClnBackend {
    fn implementation(&self) -> Implementation {
        Implementation::Cln
    }

    async fn information(&self) -> Result<NodeInformation> {
        let info = self.client.get_info().await?;
        Ok(NodeInformation {
            implementation: Implementation::Cln,
            version: info.version,
            public_key: hex::encode(&info.id),
            alias: info.alias.unwrap_or_default(),
            color: hex::encode(&info.color),
            chain: Chain::Bitcoin,
            network: info.network.parse::<Network>().unwrap_or_default(),
            block_height: info.blockheight,
            num_peers: info.num_peers,
            num_active_channels: info.num_active_channels,
            num_inactive_channels: info.num_inactive_channels,
            num_pending_channels: info.num_pending_channels,
        })
    }

    async fn wallet_balance(&self) -> Result<WalletBalance> {
        Ok(wallet_balance_from_funds(&self.client.list_funds().await?))
    }

    async fn new_address(&self, address_type: AddressType, _account: Option<String>) -> Result<String> {
        let addresstype = match address_type {
            AddressType::P2wkh => cln::NewaddrAddresstype::Bech32,
            AddressType::P2tr => cln::NewaddrAddresstype::P2tr,
            AddressType::NestedP2wkh => return Err(RequestError::Unsupported("nested segwit addresses")),
        };
        let response = self
            .client
            .new_address(cln::NewaddrRequest {
                addresstype: Some(addresstype as i32),
            })
            .await?;

        match address_type {
            AddressType::P2tr => response.p2tr,
            _ => response.bech32,
        }
        .ok_or_else(|| RpcError::InvalidResponse("no address returned".into()).into())
    }

    async fn new_invoice(&self, parameters: InvoiceParameters) -> Result<CreatedInvoice> {
        let amount = match parameters.value_msat {
            Some(msat) => cln::amount_or_any::Value::Amount(Amount::from_msat(msat)),
            None => cln::amount_or_any::Value::Any(true),
        };

        let response = self
            .client
            .invoice(cln::InvoiceRequest {
                description: parameters.memo,
                label: format!("torq-{}", uuid::Uuid::new_v4()),
                expiry: parameters.expiry_seconds,
                amount_msat: Some(cln::AmountOrAny { value: Some(amount) }),
            })
            .await?;

        Ok(CreatedInvoice {
            payment_request: response.bolt11,
            payment_hash: hex::encode(response.payment_hash),
            add_index: None,
        })
    }

    async fn connect_peer(&self, public_key: String, host: String, _timeout: Duration) -> Result<()> {
        let (host, port) = split_host_port(&host);
        self.client
            .connect(cln::ConnectRequest {
                id: public_key,
                host: Some(host),
                port,
            })
            .await?;
        Ok(())
    }

    async fn disconnect_peer(&self, public_key: String) -> Result<()> {
        Ok(self.client.disconnect(decode_public_key(&public_key)?, false).await?)
    }

    async fn list_peers(&self) -> Result<Vec<PeerInfo>> {
        Ok(self
            .client
            .list_peers()
            .await?
            .into_iter()
            .map(|p| PeerInfo {
                public_key: hex::encode(&p.id),
                address: p.remote_addr.or_else(|| p.netaddr.first().cloned()),
                connected: p.connected,
                inbound: None,
                bytes_sent: None,
                bytes_received: None,
                ping_time_us: None,
            })
            .collect())
    }

    async fn sign_message(&self, message: String) -> Result<String> {
        Ok(self.client.sign_message(message).await?.zbase)
    }

    async fn verify_message(&self, message: String, signature: String) -> Result<SignatureVerification> {
        let response = self
            .client
            .check_message(cln::CheckmessageRequest {
                message,
                zbase: signature,
                pubkey: None,
            })
            .await?;
        Ok(SignatureVerification {
            valid: response.verified,
            public_key: hex::encode(response.pubkey),
        })
    }

    /// `setchannel` has no time lock delta parameter; a requested change of it is reported as
    /// a failed update while the remaining fields are still applied.
    async fn update_routing_policy(&self, submission: PolicySubmission) -> Result<Vec<FailedRoutingPolicyUpdate>> {
        let short_channel_id = submission
            .short_channel_id
            .clone()
            .ok_or_else(|| RequestError::Validation("channel has no short channel id yet".into()))?;
        let policy = submission.policy;

        let fee_base = u64::try_from(policy.fee_base_msat)
            .map_err(|_| RequestError::Validation("fee base out of range".into()))?;
        let fee_rate = u32::try_from(policy.fee_rate_milli_msat)
            .map_err(|_| RequestError::Validation("fee rate out of range".into()))?;

        let response = self
            .client
            .set_channel(cln::SetchannelRequest {
                id: short_channel_id,
                feebase: Some(Amount::from_msat(fee_base)),
                feeppm: Some(fee_rate),
                htlcmin: Some(Amount::from_msat(policy.min_htlc_msat)),
                htlcmax: Some(Amount::from_msat(policy.max_htlc_msat)),
                enforcedelay: None,
            })
            .await?;

        let mut failed: Vec<FailedRoutingPolicyUpdate> = response
            .channels
            .into_iter()
            .flat_map(|c| {
                [
                    c.warning_htlcmin_too_low.map(|w| ("htlc minimum too low", w)),
                    c.warning_htlcmax_too_high.map(|w| ("htlc maximum too high", w)),
                ]
            })
            .flatten()
            .map(|(reason, error)| FailedRoutingPolicyUpdate {
                channel_id: submission.channel_id,
                reason: reason.to_string(),
                error,
            })
            .collect();

        if submission.time_lock_delta_changed {
            failed.push(FailedRoutingPolicyUpdate {
                channel_id: submission.channel_id,
                reason: "unsupported".into(),
                error: "time lock delta can not be changed on CLN".into(),
            });
        }

        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use torq_lightning_rpc::test_utils::{ClnScript, ScriptedCln};
    use torq_types::prelude::{ChannelPoint, RoutingPolicy};

    use super::*;

    fn submission(time_lock_delta_changed: bool) -> PolicySubmission {
        PolicySubmission {
            channel_id: 9,
            channel_point: ChannelPoint::new("cd02", 0),
            short_channel_id: Some("700000x1x0".into()),
            policy: RoutingPolicy {
                fee_rate_milli_msat: 100,
                fee_base_msat: 1000,
                time_lock_delta: 80,
                min_htlc_msat: 1000,
                max_htlc_msat: 500_000_000,
                disabled: false,
            },
            time_lock_delta_changed,
        }
    }

    #[tokio::test]
    async fn test_policy_update_uses_short_channel_id() -> anyhow::Result<()> {
        let cln = ScriptedCln::new(ClnScript::default());
        let backend = ClnBackend::new(cln.clone());

        assert!(backend.update_routing_policy(submission(false)).await?.is_empty());

        let sent = cln.requests().set_channels;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, "700000x1x0");
        assert_eq!(sent[0].feeppm, Some(100));
        assert_eq!(sent[0].feebase, Some(Amount::from_msat(1000)));
        Ok(())
    }

    #[tokio::test]
    async fn test_time_lock_delta_change_is_reported() -> anyhow::Result<()> {
        let cln = ScriptedCln::new(ClnScript::default());
        let backend = ClnBackend::new(cln);

        let failed = backend.update_routing_policy(submission(true)).await?;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].reason, "unsupported");
        Ok(())
    }

    #[tokio::test]
    async fn test_wallet_balance_sums_outputs() -> anyhow::Result<()> {
        let cln = ScriptedCln::new(ClnScript {
            funds: cln::ListfundsResponse {
                outputs: vec![
                    cln::ListfundsOutputs {
                        amount_msat: Some(Amount::from_msat(5_000_000)),
                        status: cln::OutputStatus::Confirmed as i32,
                        ..Default::default()
                    },
                    cln::ListfundsOutputs {
                        amount_msat: Some(Amount::from_msat(2_000_000)),
                        status: cln::OutputStatus::Unconfirmed as i32,
                        ..Default::default()
                    },
                    cln::ListfundsOutputs {
                        amount_msat: Some(Amount::from_msat(9_000_000)),
                        status: cln::OutputStatus::Spent as i32,
                        ..Default::default()
                    },
                ],
                channels: vec![],
            },
            ..Default::default()
        });

        let balance = ClnBackend::new(cln).wallet_balance().await?;
        assert_eq!(balance.total_balance, 7000);
        assert_eq!(balance.confirmed_balance, 5000);
        assert_eq!(balance.unconfirmed_balance, 2000);
        Ok(())
    }
}
