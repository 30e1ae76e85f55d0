//! Outbound XML-RPC client used to call back into a node (spec §4.3,
//! "Node Handle"). Kept separate from `node::Node`, which owns the
//! lifecycle and lazy construction; this module is only the wire client.

use dxr::server::async_trait;
use dxr::Value;
use dxr_client::{Call, Client, ClientBuilder, Url};

/// Abstraction over "the thing a `Node` calls back into", so the
/// Registration Manager's tests can substitute a recording fake instead of
/// making real HTTP calls.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn publisher_update(&self, topic: &str, publisher_apis: &[String]) -> anyhow::Result<()>;
    async fn param_update(&self, key: &str, value: &Value) -> anyhow::Result<()>;
    async fn shutdown(&self, msg: &str) -> anyhow::Result<()>;
}

/// Concrete `NodeApi` backed by an XML-RPC client bound to a node's API
/// URL. The master's own name is sent as the first argument of every
/// callback, per the node-API convention.
pub struct ClientApi {
    client: Client,
}

impl ClientApi {
    /// Builds a client bound to `uri`. Panics if `uri` is not a valid URL;
    /// callers only ever pass URLs that were themselves accepted as
    /// `caller_api`/`service_api` registration arguments.
    pub fn new(uri: &str) -> Self {
        let url = Url::parse(uri).expect("Failed to parse client-api URL.");
        let client = ClientBuilder::new(url).user_agent("nodecore-rs-client-api").build();
        Self { client }
    }
}

#[async_trait]
impl NodeApi for ClientApi {
    async fn publisher_update(&self, topic: &str, publisher_apis: &[String]) -> anyhow::Result<()> {
        let request = Call::new("publisherUpdate", ("/master", topic, publisher_apis.to_vec()));
        self.client.call::<_, ()>(request).await?;
        Ok(())
    }

    async fn param_update(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let request = Call::new("paramUpdate", ("/master", key, value.clone()));
        self.client.call::<_, ()>(request).await?;
        Ok(())
    }

    async fn shutdown(&self, msg: &str) -> anyhow::Result<()> {
        let request = Call::new("shutdown", ("/master", msg));
        self.client.call::<_, ()>(request).await?;
        Ok(())
    }
}
