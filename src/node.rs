//! A logical participant in the graph, keyed by `caller_id` (spec §3,
//! "Node"). Owns its own relationship sets and a lazily constructed
//! outbound [`NodeApi`] handle.

use std::collections::HashSet;
use std::sync::Arc;

use dxr::Value;

use crate::client_api::NodeApi;

/// Builds a `NodeApi` for a node's API URL. In production this is
/// `ClientApi::new`; tests inject a factory that returns a recording fake
/// so notification delivery can be asserted without real network I/O.
pub type NodeApiFactory = Arc<dyn Fn(&str) -> Arc<dyn NodeApi> + Send + Sync>;

pub struct Node {
    pub api: String,
    pub param_subscriptions: HashSet<String>,
    pub topic_subscriptions: HashSet<String>,
    pub topic_publications: HashSet<String>,
    pub services: HashSet<String>,
    client: Option<Arc<dyn NodeApi>>,
    factory: NodeApiFactory,
}

impl Node {
    pub fn new(api: impl Into<String>, factory: NodeApiFactory) -> Self {
        Self {
            api: api.into(),
            param_subscriptions: HashSet::new(),
            topic_subscriptions: HashSet::new(),
            topic_publications: HashSet::new(),
            services: HashSet::new(),
            client: None,
            factory,
        }
    }

    /// True iff at least one of the node's four relationship sets is
    /// non-empty: the invariant that decides whether the node stays in
    /// the node table (spec §3).
    pub fn has_any_registration(&self) -> bool {
        !self.param_subscriptions.is_empty()
            || !self.topic_subscriptions.is_empty()
            || !self.topic_publications.is_empty()
            || !self.services.is_empty()
    }

    fn client(&mut self) -> Arc<dyn NodeApi> {
        if self.client.is_none() {
            self.client = Some((self.factory)(&self.api));
        }
        self.client.as_ref().unwrap().clone()
    }

    /// Materializes (or reuses) the lazily constructed outbound handle.
    pub fn client_handle(&mut self) -> Arc<dyn NodeApi> {
        self.client()
    }

    /// Releases the outbound client. Re-opening after close is permitted
    /// (the next call just lazily rebuilds it).
    pub fn close(&mut self) {
        self.client = None;
    }
}

/// Fire-and-forget outbound calls on a node's handle. These take an
/// `Arc<dyn NodeApi>` snapshot rather than `&mut Node` so they can be
/// spawned as detached tasks independent of the catalog lock.
pub async fn publisher_update(client: Arc<dyn NodeApi>, topic: String, publisher_apis: Vec<String>) {
    if let Err(err) = client.publisher_update(&topic, &publisher_apis).await {
        log::warn!("publisherUpdate call for topic {topic} failed: {err}");
    }
}

pub async fn param_update(client: Arc<dyn NodeApi>, key: String, value: Value) {
    if let Err(err) = client.param_update(&key, &value).await {
        log::warn!("paramUpdate call for key {key} failed: {err}");
    }
}

pub async fn shutdown(client: Arc<dyn NodeApi>, msg: String) {
    if let Err(err) = client.shutdown(&msg).await {
        log::warn!("shutdown call failed: {err}");
    }
}

pub async fn shutdown_then_close(client: Arc<dyn NodeApi>, msg: String) {
    shutdown(client, msg).await;
    // The client itself is dropped with this task; `Node::close` on the
    // owning catalog entry releases the table's own handle.
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        PublisherUpdate(String, Vec<String>),
        ParamUpdate(String, Value),
        Shutdown(String),
    }

    #[derive(Default)]
    pub struct RecordingNodeApi {
        pub calls: Mutex<Vec<Recorded>>,
    }

    #[dxr::server::async_trait]
    impl NodeApi for RecordingNodeApi {
        async fn publisher_update(&self, topic: &str, publisher_apis: &[String]) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Recorded::PublisherUpdate(topic.to_string(), publisher_apis.to_vec()));
            Ok(())
        }

        async fn param_update(&self, key: &str, value: &Value) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Recorded::ParamUpdate(key.to_string(), value.clone()));
            Ok(())
        }

        async fn shutdown(&self, msg: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Recorded::Shutdown(msg.to_string()));
            Ok(())
        }
    }

    /// A factory that hands every node the *same* shared recorder, so
    /// tests can inspect calls across all nodes in one place.
    pub fn shared_recorder_factory(
        recorder: Arc<RecordingNodeApi>,
    ) -> NodeApiFactory {
        Arc::new(move |_api: &str| recorder.clone() as Arc<dyn NodeApi>)
    }

    /// A factory that hands each node its own recorder, keyed by API URL,
    /// stored in a shared registry tests can inspect after the fact.
    pub fn per_node_recorder_factory() -> (
        NodeApiFactory,
        Arc<Mutex<std::collections::HashMap<String, Arc<RecordingNodeApi>>>>,
    ) {
        let registry: Arc<Mutex<std::collections::HashMap<String, Arc<RecordingNodeApi>>>> =
            Arc::new(Mutex::new(std::collections::HashMap::new()));
        let registry_for_factory = registry.clone();
        let factory: NodeApiFactory = Arc::new(move |api: &str| {
            let mut guard = registry_for_factory.lock().unwrap();
            let entry = guard
                .entry(api.to_string())
                .or_insert_with(|| Arc::new(RecordingNodeApi::default()))
                .clone();
            entry as Arc<dyn NodeApi>
        });
        (factory, registry)
    }
}
