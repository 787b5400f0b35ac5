//! HTTP clients of the external services: the Vector block explorer and the Amboss health check.
//!
//! None of these services is required for ingestion. Callers log failures and carry on
//! with provisional data.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use torq_cache::TorqCache;
use torq_types::prelude::Timestamp;

use crate::errors::{Result, ServiceError};

const TRANSACTION_DETAILS_PATH: &str = "api/bitcoin/transaction";
const PING_PATH: &str = "api/publicNodeEvents/ping";

/// Block information of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDetails {
    pub block_hash: String,
    pub block_height: u32,
    pub block_timestamp: Timestamp,
    pub transaction_index: u32,
    pub transaction_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLookup {
    /// Managed node asking for the details.
    pub node_id: i64,
    pub transaction_hash: String,
    pub output_index: Option<u32>,
}

/// Source of the block height and block time of on-chain transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockExplorer: Send + Sync {
    /// Returns `None` when the transaction is not mined yet or not known to the explorer.
    async fn transaction_details(&self, lookup: TransactionLookup) -> Result<Option<BlockDetails>>;
}

/// A timestamp signed by a managed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPing {
    pub node_id: i64,
    pub public_key: String,
    pub timestamp: Timestamp,
    /// The signed message.
    pub message: String,
    pub signature: String,
}

/// Liveness reporting to an external service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ping: SignedPing) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDetailsRequest {
    transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_index: Option<u32>,
    unix_time: i64,
    public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDetailsResponse {
    #[serde(default)]
    block_hash: String,
    #[serde(default)]
    block_height: u32,
    #[serde(default)]
    block_timestamp: i64,
    #[serde(default)]
    transaction_index: u32,
    #[serde(default)]
    transaction_count: u32,
}

impl TransactionDetailsResponse {
    fn into_details(self) -> Option<BlockDetails> {
        if self.block_height == 0 {
            return None;
        }
        Some(BlockDetails {
            block_hash: self.block_hash,
            block_height: self.block_height,
            block_timestamp: chrono::DateTime::from_timestamp(self.block_timestamp, 0)?,
            transaction_index: self.transaction_index,
            transaction_count: self.transaction_count,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PingRequest {
    public_key: String,
    unix_time: i64,
    message: String,
    signature: String,
}

/// Client of the Vector service.
///
/// The base URL, the installation UUID and the version are read from the cached settings on
/// every request so a settings change applies without a restart.
#[derive(Debug, Clone)]
pub struct VectorClient {
    http: reqwest::Client,
    cache: TorqCache,
}

impl VectorClient {
    pub fn new(cache: TorqCache, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, cache })
    }

    fn url(&self, path: &str) -> Result<url::Url> {
        let base = self.cache.get_vector_url();
        url::Url::parse(&base)
            .and_then(|base| base.join(path))
            .map_err(|e| ServiceError::Explorer(format!("invalid vector url {base}: {e}")))
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path)?)
            .header("Torq-Version", self.cache.get_torq_version())
            .header("Torq-UUID", self.cache.get_torq_uuid().to_string())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Explorer(format!("{path} answered with {status}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl BlockExplorer for VectorClient {
    async fn transaction_details(&self, lookup: TransactionLookup) -> Result<Option<BlockDetails>> {
        let public_key = self.cache.get_node_settings_by_node_id(lookup.node_id).public_key;
        let request = TransactionDetailsRequest {
            transaction_hash: lookup.transaction_hash,
            output_index: lookup.output_index,
            unix_time: chrono::Utc::now().timestamp(),
            public_key,
        };
        let response: TransactionDetailsResponse = self.post(TRANSACTION_DETAILS_PATH, &request).await?;
        Ok(response.into_details())
    }
}

#[async_trait]
impl Pinger for VectorClient {
    async fn ping(&self, ping: SignedPing) -> Result<()> {
        let request = PingRequest {
            public_key: ping.public_key,
            unix_time: ping.timestamp.timestamp(),
            message: ping.message,
            signature: ping.signature,
        };
        let _: serde_json::Value = self.post(PING_PATH, &request).await?;
        Ok(())
    }
}

const AMBOSS_HEALTH_CHECK: &str =
    "mutation HealthCheck($signature: String!, $timestamp: String!) { healthCheck(signature: $signature, timestamp: $timestamp) }";

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: AmbossVariables,
}

#[derive(Debug, Serialize)]
struct AmbossVariables {
    signature: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Client of the Amboss health check.
#[derive(Debug, Clone)]
pub struct AmbossClient {
    http: reqwest::Client,
    url: url::Url,
}

impl AmbossClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = url::Url::parse(url).map_err(|e| ServiceError::Explorer(format!("invalid amboss url {url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl Pinger for AmbossClient {
    async fn ping(&self, ping: SignedPing) -> Result<()> {
        let request = GraphQlRequest {
            query: AMBOSS_HEALTH_CHECK,
            variables: AmbossVariables {
                signature: ping.signature,
                timestamp: ping.message,
            },
        };
        let response = self.http.post(self.url.clone()).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Explorer(format!("amboss answered with {status}")));
        }

        let body: GraphQlResponse = response.json().await?;
        match body.errors.first() {
            Some(error) => Err(ServiceError::Explorer(format!("amboss refused the ping: {}", error.message))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use torq_types::prelude::Settings;

    use super::*;

    #[test]
    fn test_unmined_transaction_has_no_details() -> anyhow::Result<()> {
        let response: TransactionDetailsResponse = serde_json::from_str(r#"{"blockHeight":0}"#)?;
        assert!(response.into_details().is_none());
        Ok(())
    }

    #[test]
    fn test_transaction_details_are_parsed() -> anyhow::Result<()> {
        let response: TransactionDetailsResponse = serde_json::from_str(
            r#"{"blockHash":"00ff","blockHeight":700005,"blockTimestamp":1700000000,"transactionIndex":3,"transactionCount":2500}"#,
        )?;
        let details = response
            .into_details()
            .ok_or_else(|| anyhow::anyhow!("details expected"))?;

        assert_eq!(details.block_height, 700005);
        assert_eq!(details.block_timestamp.timestamp(), 1_700_000_000);
        assert_eq!(details.transaction_index, 3);
        Ok(())
    }

    #[test]
    fn test_request_uses_camel_case_and_skips_missing_output() -> anyhow::Result<()> {
        let body = serde_json::to_value(TransactionDetailsRequest {
            transaction_hash: "cd".into(),
            output_index: None,
            unix_time: 10,
            public_key: "02".into(),
        })?;
        assert_eq!(body, serde_json::json!({"transactionHash": "cd", "unixTime": 10, "publicKey": "02"}));
        Ok(())
    }

    #[test]
    fn test_vector_url_follows_settings() -> anyhow::Result<()> {
        let cache = TorqCache::new();
        let client = VectorClient::new(cache.clone(), Duration::from_secs(1))?;
        assert_eq!(
            client.url(TRANSACTION_DETAILS_PATH)?.as_str(),
            "https://vector.ln.capital/api/bitcoin/transaction"
        );

        cache.set_settings(Settings {
            vector_url: "http://localhost:8080/vector/".into(),
            ..Default::default()
        });
        assert_eq!(client.url(PING_PATH)?.as_str(), "http://localhost:8080/vector/api/publicNodeEvents/ping");

        cache.set_settings(Settings {
            vector_url: "not a url".into(),
            ..Default::default()
        });
        assert!(matches!(client.url(PING_PATH), Err(ServiceError::Explorer(_))));
        Ok(())
    }
}
