//! HTTP transport (reqwest) for peer calls, plus the client used by the CLI

use crate::common::{encode_key, DynamoNode, Error, Result};
use crate::replica::{VectorClock, VersionSet};
use crate::transport::messages::{
    BatchReplicateArgs, CrashArgs, DynamoResult, ErrorResponse, HealthResponse, PutArgs,
    SuccessResponse,
};
use crate::transport::PeerTransport;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Map a peer response onto the crate error taxonomy
async fn decode<T: DeserializeOwned>(target: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(Error::NodeUnavailable(target.to_string()));
    }
    if !status.is_success() {
        let reason = match resp.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(match status {
            StatusCode::BAD_REQUEST => Error::InvalidRequest(reason),
            _ => Error::Http(format!("{} returned {}: {}", target, status, reason)),
        });
    }
    Ok(resp.json::<T>().await?)
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))
}

/// Peer transport speaking the node HTTP API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn ping(&self, peer: &DynamoNode) -> Result<()> {
        let url = format!("{}/health", peer.base_url());
        let resp = self.client.get(url).send().await?;
        let _: HealthResponse = decode(&peer.to_string(), resp).await?;
        Ok(())
    }

    async fn replicate(&self, peer: &DynamoNode, args: &PutArgs) -> Result<bool> {
        let url = format!("{}/internal/replicate", peer.base_url());
        let resp = self.client.post(url).json(args).send().await?;
        let body: SuccessResponse = decode(&peer.to_string(), resp).await?;
        Ok(body.success)
    }

    async fn batch_replicate(&self, peer: &DynamoNode, args: &BatchReplicateArgs) -> Result<bool> {
        let url = format!("{}/internal/batch_replicate", peer.base_url());
        let resp = self.client.post(url).json(args).send().await?;
        let body: SuccessResponse = decode(&peer.to_string(), resp).await?;
        Ok(body.success)
    }

    async fn node_get(&self, peer: &DynamoNode, key: &str) -> Result<VersionSet> {
        let url = format!("{}/internal/node_get/{}", peer.base_url(), encode_key(key));
        let resp = self.client.get(url).send().await?;
        let body: DynamoResult = decode(&peer.to_string(), resp).await?;
        Ok(body.entries)
    }
}

/// Client for the client-facing operations of one node
#[derive(Debug, Clone)]
pub struct DynamoClient {
    base_url: String,
    client: Client,
}

impl DynamoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    pub fn for_node(node: &DynamoNode, timeout: Duration) -> Result<Self> {
        Self::new(node.base_url(), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Quorum write; `Ok(false)` when W replicas were not reached
    pub async fn put(&self, key: &str, context: VectorClock, value: Vec<u8>) -> Result<bool> {
        let args = PutArgs::with_context(key, value, context);
        let resp = self
            .client
            .post(format!("{}/put", self.base_url))
            .json(&args)
            .send()
            .await?;
        let body: SuccessResponse = decode(&self.base_url, resp).await?;
        Ok(body.success)
    }

    /// Quorum read. A crashed node yields [`Error::NodeUnavailable`], a
    /// missing key an empty set.
    pub async fn get(&self, key: &str) -> Result<DynamoResult> {
        let resp = self
            .client
            .get(format!("{}/get/{}", self.base_url, encode_key(key)))
            .send()
            .await?;
        decode(&self.base_url, resp).await
    }

    pub async fn gossip(&self) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(format!("{}/gossip", self.base_url))
            .send()
            .await?;
        decode(&self.base_url, resp).await
    }

    /// Returns whether a new crash window was started
    pub async fn crash(&self, seconds: u64) -> Result<bool> {
        let resp = self
            .client
            .post(format!("{}/crash", self.base_url))
            .json(&CrashArgs { seconds })
            .send()
            .await?;
        let body: SuccessResponse = decode(&self.base_url, resp).await?;
        Ok(body.success)
    }

    pub async fn send_preference_list(&self, nodes: &[DynamoNode]) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/preference_list", self.base_url))
            .json(nodes)
            .send()
            .await?;
        let _: serde_json::Value = decode(&self.base_url, resp).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        decode(&self.base_url, resp).await
    }

    pub async fn metrics(&self) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }
}
