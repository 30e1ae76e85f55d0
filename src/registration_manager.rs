//! Catalog of publishers/subscribers/services/param-subscribers, node
//! identity and lifecycle, and change notification (spec §4.4).
//!
//! All catalog and parameter mutations happen synchronously under one
//! lock; outbound notifications are snapshotted at schedule time and
//! delivered as detached tasks, so a later mutation never corrupts an
//! in-flight payload (spec §5).

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use dxr::Value;
use tokio::task::JoinSet;

use crate::client_api::{ClientApi, NodeApi};
use crate::error::MasterError;
use crate::name::{canon, strip_trailing_slash};
use crate::node::{self, Node, NodeApiFactory};
use crate::param_cache::{descendant_keys, empty_mapping_value, value_at_relative_path};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Registration {
    pub caller_id: String,
    pub api: String,
}

type RegistrationMap = HashMap<String, std::collections::BTreeSet<Registration>>;

struct Inner {
    param_subscribers: RegistrationMap,
    publishers: RegistrationMap,
    subscribers: RegistrationMap,
    services: RegistrationMap,
    topic_types: HashMap<String, String>,
    nodes: HashMap<String, Node>,
    /// Evictions discovered mid-`ensure_node`, drained (and turned into
    /// detached `shutdown_then_close` tasks) by the caller once the lock
    /// is released for the register call that triggered them.
    pending_evictions: Vec<(Arc<dyn NodeApi>, String)>,
}

impl Inner {
    fn new() -> Self {
        Self {
            param_subscribers: HashMap::new(),
            publishers: HashMap::new(),
            subscribers: HashMap::new(),
            services: HashMap::new(),
            topic_types: HashMap::new(),
            nodes: HashMap::new(),
            pending_evictions: Vec::new(),
        }
    }
}

pub struct RegistrationManager {
    inner: Mutex<Inner>,
    tasks: Mutex<JoinSet<()>>,
    node_api_factory: NodeApiFactory,
}

impl Default for RegistrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationManager {
    pub fn new() -> Self {
        Self::with_node_api_factory(Arc::new(|api: &str| Arc::new(ClientApi::new(api)) as Arc<dyn NodeApi>))
    }

    /// Builds a manager with an injectable outbound-client factory;
    /// production code always uses [`RegistrationManager::new`], tests
    /// inject a recording fake (see `node::test_support`).
    pub fn with_node_api_factory(factory: NodeApiFactory) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            tasks: Mutex::new(JoinSet::new()),
            node_api_factory: factory,
        }
    }

    fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.tasks.lock().unwrap().spawn(fut);
    }

    /// Awaits every outstanding notification task and releases every
    /// node's outbound client. Called on master shutdown (spec §5).
    pub async fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            for node in inner.nodes.values_mut() {
                node.close();
            }
        }
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        while tasks.join_next().await.is_some() {}
    }

    // ---- identity ---------------------------------------------------

    /// Returns the node for `caller_id`, creating it if absent. If a node
    /// already exists under a *different* `caller_api`, it is evicted
    /// (shutdown-then-close scheduled, its registrations purged from every
    /// index) before the new node is installed. The whole sequence runs
    /// under `self.inner`'s lock, so no reader observes a half-evicted
    /// state.
    fn ensure_node<'a>(inner: &'a mut Inner, caller_id: &str, caller_api: &str, factory: &NodeApiFactory) -> &'a mut Node {
        let needs_eviction = match inner.nodes.get(caller_id) {
            Some(node) if node.api == caller_api => false,
            Some(_) => true,
            None => false,
        };

        if needs_eviction {
            let mut evicted = inner.nodes.remove(caller_id).unwrap();
            let client = evicted.client_handle();
            Self::purge_caller(inner, caller_id);
            let msg = "new node registered with same name".to_string();
            // caller schedules this once the lock is released; see
            // `drain_pending_evictions`.
            inner.pending_evictions.push((client, msg));
        }

        inner
            .nodes
            .entry(caller_id.to_string())
            .or_insert_with(|| Node::new(caller_api, factory.clone()))
    }

    fn purge_caller(inner: &mut Inner, caller_id: &str) {
        for map in [
            &mut inner.param_subscribers,
            &mut inner.publishers,
            &mut inner.subscribers,
            &mut inner.services,
        ] {
            map.retain(|_, registrations| {
                registrations.retain(|r| r.caller_id != caller_id);
                !registrations.is_empty()
            });
        }
    }

    // ---- registration -------------------------------------------------

    pub fn register_param_subscriber(&self, key: &str, caller_id: &str, caller_api: &str) {
        let mut inner = self.inner.lock().unwrap();
        let canon_key = canon(key);
        {
            let node = Self::ensure_node(&mut inner, caller_id, caller_api, &self.node_api_factory);
            node.param_subscriptions.insert(canon_key.clone());
        }
        inner
            .param_subscribers
            .entry(canon_key)
            .or_default()
            .insert(Registration {
                caller_id: caller_id.to_string(),
                api: caller_api.to_string(),
            });
        self.drain_pending_evictions(&mut inner);
    }

    pub fn register_publisher(&self, topic: &str, topic_type: &str, caller_id: &str, caller_api: &str) {
        {
            let mut inner = self.inner.lock().unwrap();
            {
                let node = Self::ensure_node(&mut inner, caller_id, caller_api, &self.node_api_factory);
                node.topic_publications.insert(topic.to_string());
            }
            inner
                .publishers
                .entry(topic.to_string())
                .or_default()
                .insert(Registration {
                    caller_id: caller_id.to_string(),
                    api: caller_api.to_string(),
                });
            if topic_type != "*" && !inner.topic_types.contains_key(topic) {
                inner.topic_types.insert(topic.to_string(), topic_type.to_string());
            }
            self.drain_pending_evictions(&mut inner);
        }
        self.schedule_subscriber_update(topic);
    }

    pub fn register_subscriber(&self, topic: &str, topic_type: &str, caller_id: &str, caller_api: &str) {
        let mut inner = self.inner.lock().unwrap();
        {
            let node = Self::ensure_node(&mut inner, caller_id, caller_api, &self.node_api_factory);
            node.topic_subscriptions.insert(topic.to_string());
        }
        inner
            .subscribers
            .entry(topic.to_string())
            .or_default()
            .insert(Registration {
                caller_id: caller_id.to_string(),
                api: caller_api.to_string(),
            });
        if topic_type != "*" && !inner.topic_types.contains_key(topic) {
            inner.topic_types.insert(topic.to_string(), topic_type.to_string());
        }
        self.drain_pending_evictions(&mut inner);
    }

    pub fn register_service(&self, name: &str, caller_id: &str, caller_api: &str, service_api: &str) {
        let mut inner = self.inner.lock().unwrap();
        {
            let node = Self::ensure_node(&mut inner, caller_id, caller_api, &self.node_api_factory);
            node.services.insert(name.to_string());
        }
        inner.services.entry(name.to_string()).or_default().insert(Registration {
            caller_id: caller_id.to_string(),
            api: service_api.to_string(),
        });
        self.drain_pending_evictions(&mut inner);
    }

    fn drain_pending_evictions(&self, inner: &mut Inner) {
        for (client, msg) in inner.pending_evictions.drain(..) {
            self.spawn(node::shutdown_then_close(client, msg));
        }
    }

    // ---- unregistration -------------------------------------------------

    pub fn unregister_param_subscriber(&self, key: &str, caller_id: &str, caller_api: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let canon_key = canon(key);
        let removed = Self::remove_from_map(
            &mut inner.param_subscribers,
            &canon_key,
            caller_id,
            caller_api,
        );
        if let Some(node) = inner.nodes.get_mut(caller_id) {
            node.param_subscriptions.remove(&canon_key);
        }
        self.retire_if_empty(&mut inner, caller_id);
        removed
    }

    pub fn unregister_publisher(&self, topic: &str, caller_id: &str, caller_api: &str) -> bool {
        let removed;
        {
            let mut inner = self.inner.lock().unwrap();
            removed = Self::remove_from_map(&mut inner.publishers, topic, caller_id, caller_api);
            if let Some(node) = inner.nodes.get_mut(caller_id) {
                node.topic_publications.remove(topic);
            }
            self.retire_if_empty(&mut inner, caller_id);
        }
        self.schedule_subscriber_update(topic);
        removed
    }

    pub fn unregister_subscriber(&self, topic: &str, caller_id: &str, caller_api: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let removed = Self::remove_from_map(&mut inner.subscribers, topic, caller_id, caller_api);
        if let Some(node) = inner.nodes.get_mut(caller_id) {
            node.topic_subscriptions.remove(topic);
        }
        self.retire_if_empty(&mut inner, caller_id);
        removed
    }

    pub fn unregister_service(&self, service: &str, caller_id: &str, service_api: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let removed = Self::remove_from_map(&mut inner.services, service, caller_id, service_api);
        if let Some(node) = inner.nodes.get_mut(caller_id) {
            node.services.remove(service);
        }
        self.retire_if_empty(&mut inner, caller_id);
        removed
    }

    fn remove_from_map(map: &mut RegistrationMap, key: &str, caller_id: &str, api: &str) -> bool {
        let Some(set) = map.get_mut(key) else {
            return false;
        };
        let removed = set.remove(&Registration {
            caller_id: caller_id.to_string(),
            api: api.to_string(),
        });
        if set.is_empty() {
            map.remove(key);
        }
        removed
    }

    /// After any unregister, retires the node if it has no remaining
    /// relationships, scheduling a detached `close()`.
    fn retire_if_empty(&self, inner: &mut Inner, caller_id: &str) {
        let should_retire = matches!(inner.nodes.get(caller_id), Some(node) if !node.has_any_registration());
        if should_retire {
            let mut node = inner.nodes.remove(caller_id).unwrap();
            node.close();
        }
    }

    // ---- lookups -------------------------------------------------

    pub fn get_service_api(&self, service: &str) -> Result<String, MasterError> {
        let inner = self.inner.lock().unwrap();
        inner
            .services
            .get(service)
            .and_then(|set| set.iter().next())
            .map(|reg| reg.api.clone())
            .ok_or_else(|| MasterError::ServiceNotFound(service.to_string()))
    }

    pub fn get_caller_api(&self, node_name: &str) -> Result<String, MasterError> {
        let inner = self.inner.lock().unwrap();
        inner
            .nodes
            .get(node_name)
            .map(|node| node.api.clone())
            .ok_or_else(|| MasterError::NodeNotFound(node_name.to_string()))
    }

    pub fn publisher_apis(&self, topic: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .publishers
            .get(topic)
            .map(|set| set.iter().map(|r| r.api.clone()).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_apis(&self, topic: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .subscribers
            .get(topic)
            .map(|set| set.iter().map(|r| r.api.clone()).collect())
            .unwrap_or_default()
    }

    pub fn published_topics(&self, subgraph: &str) -> Vec<(String, String)> {
        let inner = self.inner.lock().unwrap();
        inner
            .publishers
            .keys()
            .filter(|topic| topic.starts_with(subgraph))
            .filter_map(|topic| inner.topic_types.get(topic).map(|t| (topic.clone(), t.clone())))
            .collect()
    }

    pub fn topic_types(&self) -> Vec<(String, String)> {
        let inner = self.inner.lock().unwrap();
        inner
            .publishers
            .keys()
            .filter_map(|topic| inner.topic_types.get(topic).map(|t| (topic.clone(), t.clone())))
            .collect()
    }

    #[allow(clippy::type_complexity)]
    pub fn system_state(&self) -> (Vec<(String, Vec<String>)>, Vec<(String, Vec<String>)>, Vec<(String, Vec<String>)>) {
        let inner = self.inner.lock().unwrap();
        let render = |map: &RegistrationMap| -> Vec<(String, Vec<String>)> {
            let mut rows: Vec<(String, Vec<String>)> = map
                .iter()
                .filter(|(_, set)| !set.is_empty())
                .map(|(key, set)| {
                    let mut ids: Vec<String> = set.iter().map(|r| r.caller_id.clone()).collect();
                    ids.sort();
                    ids.dedup();
                    (key.clone(), ids)
                })
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            rows
        };
        (
            render(&inner.publishers),
            render(&inner.subscribers),
            render(&inner.services),
        )
    }

    // ---- notification -------------------------------------------------

    /// Computes the current publisher list for `topic` and asynchronously
    /// invokes `publisherUpdate` on every current subscriber (spec §4.4).
    pub fn schedule_subscriber_update(&self, topic: &str) {
        let deliveries: Vec<(Arc<dyn NodeApi>, String, Vec<String>)> = {
            let mut inner = self.inner.lock().unwrap();
            let publishers: Vec<String> = inner
                .publishers
                .get(topic)
                .map(|set| set.iter().map(|r| r.api.clone()).collect())
                .unwrap_or_default();
            let subscriber_ids: Vec<String> = inner
                .subscribers
                .get(topic)
                .map(|set| set.iter().map(|r| r.caller_id.clone()).collect())
                .unwrap_or_default();
            subscriber_ids
                .into_iter()
                .filter_map(|caller_id| {
                    let node = inner.nodes.get_mut(&caller_id)?;
                    Some((node.client_handle(), topic.to_string(), publishers.clone()))
                })
                .collect()
        };
        for (client, topic, publishers) in deliveries {
            self.spawn(node::publisher_update(client, topic, publishers));
        }
    }

    /// Parameter change propagation (spec §4.4). `param_value` is the new
    /// value written (an empty mapping for deletions); `caller_id_to_ignore`
    /// is the writer, which never self-notifies.
    pub fn on_param_update(&self, param_key: &str, param_value: &Value, caller_id_to_ignore: &str) {
        let deliveries: Vec<(Arc<dyn NodeApi>, String, Value)> = {
            let mut inner = self.inner.lock().unwrap();
            if inner.param_subscribers.is_empty() {
                return;
            }

            let canon_key = canon(param_key);
            let all_keys = descendant_keys(&canon_key, param_value);

            let mut deliveries = Vec::new();

            for (sub_key, registrations) in inner.param_subscribers.clone() {
                let (delivered_key, value) = if canon_key.starts_with(&sub_key) {
                    (canon_key.clone(), param_value.clone())
                } else if let Some(all_keys) = &all_keys {
                    if sub_key.starts_with(&canon_key) && !all_keys.contains(&sub_key) {
                        (sub_key.clone(), empty_mapping_value())
                    } else {
                        continue;
                    }
                } else {
                    continue;
                };

                for registration in &registrations {
                    if registration.caller_id == caller_id_to_ignore {
                        continue;
                    }
                    let Some(node) = inner.nodes.get_mut(&registration.caller_id) else {
                        continue;
                    };
                    deliveries.push((
                        node.client_handle(),
                        strip_trailing_slash(&delivered_key).to_string(),
                        value.clone(),
                    ));
                }
            }

            if let Some(all_keys) = all_keys {
                for descendant in all_keys {
                    let Some(registrations) = inner.param_subscribers.get(&descendant).cloned() else {
                        continue;
                    };
                    let relative = &descendant[canon_key.len()..];
                    let Some(value) = value_at_relative_path(param_value, relative) else {
                        continue;
                    };
                    for registration in registrations {
                        if registration.caller_id == caller_id_to_ignore {
                            continue;
                        }
                        let Some(node) = inner.nodes.get_mut(&registration.caller_id) else {
                            continue;
                        };
                        deliveries.push((
                            node.client_handle(),
                            strip_trailing_slash(&descendant).to_string(),
                            value.clone(),
                        ));
                    }
                }
            }

            deliveries
        };

        for (client, key, value) in deliveries {
            self.spawn(node::param_update(client, key, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::{per_node_recorder_factory, Recorded, RecordingNodeApi};
    use dxr::TryToValue;
    use maplit::hashmap;
    use std::collections::HashMap as StdHashMap;

    fn recorder_for(
        registry: &Arc<Mutex<StdHashMap<String, Arc<RecordingNodeApi>>>>,
        api: &str,
    ) -> Arc<RecordingNodeApi> {
        registry.lock().unwrap().get(api).expect("node API never constructed").clone()
    }

    #[tokio::test]
    async fn scenario_topic_match_delivers_publisher_update() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_subscriber("t", "int32", "S", "http://a/");
        assert!(mgr.publisher_apis("t").is_empty());

        mgr.register_publisher("t", "int32", "P", "http://b/");
        mgr.close().await;

        let calls = recorder_for(&registry, "http://a/").calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Recorded::PublisherUpdate("t".to_string(), vec!["http://b/".to_string()])]);
    }

    #[tokio::test]
    async fn scenario_publisher_eviction_notifies_empty_and_retains_topic_type() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_subscriber("t", "int32", "S", "http://a/");
        mgr.register_publisher("t", "int32", "P", "http://b/");
        mgr.unregister_publisher("t", "P", "http://b/");
        mgr.close().await;

        assert!(mgr.publisher_apis("t").is_empty());
        assert_eq!(
            recorder_for(&registry, "http://a/").calls.lock().unwrap().last(),
            Some(&Recorded::PublisherUpdate("t".to_string(), vec![]))
        );

        // A later publisher with an unspecified ("*") type doesn't clobber
        // the type recorded by the first registration.
        mgr.register_publisher("t", "*", "P2", "http://c/");
        mgr.close().await;
        assert_eq!(mgr.topic_types(), vec![("t".to_string(), "int32".to_string())]);
    }

    #[tokio::test]
    async fn scenario_param_scalar_update_notifies_subscriber() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_param_subscriber("/robot/name", "S", "http://a/");
        mgr.on_param_update("/robot/name", &Value::string("r2d2"), "W");
        mgr.close().await;

        let calls = recorder_for(&registry, "http://a/").calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Recorded::ParamUpdate("/robot/name".to_string(), Value::string("r2d2"))]);
    }

    #[tokio::test]
    async fn scenario_param_update_suppresses_writer_itself() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_param_subscriber("/robot/name", "W", "http://a/");
        mgr.on_param_update("/robot/name", &Value::string("r2d2"), "W");
        mgr.close().await;

        assert!(recorder_for(&registry, "http://a/").calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_param_subtree_rewrite_delivers_per_path_diffs() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_param_subscriber("/a", "Sa", "http://sa/");
        mgr.register_param_subscriber("/a/b", "Sb", "http://sb/");
        mgr.register_param_subscriber("/a/c", "Sc", "http://sc/");
        mgr.register_param_subscriber("/a/d", "Sd", "http://sd/");

        let new_value = hashmap! {
            "b".to_string() => Value::i4(9),
            "e".to_string() => Value::i4(7),
        }
        .try_to_value()
        .unwrap();
        mgr.on_param_update("/a", &new_value, "W");
        mgr.close().await;

        assert_eq!(
            recorder_for(&registry, "http://sa/").calls.lock().unwrap().clone(),
            vec![Recorded::ParamUpdate("/a".to_string(), new_value.clone())]
        );
        assert_eq!(
            recorder_for(&registry, "http://sb/").calls.lock().unwrap().clone(),
            vec![Recorded::ParamUpdate("/a/b".to_string(), Value::i4(9))]
        );
        assert_eq!(
            recorder_for(&registry, "http://sc/").calls.lock().unwrap().clone(),
            vec![Recorded::ParamUpdate("/a/c".to_string(), crate::param_cache::empty_mapping_value())]
        );
        assert_eq!(
            recorder_for(&registry, "http://sd/").calls.lock().unwrap().clone(),
            vec![Recorded::ParamUpdate("/a/d".to_string(), crate::param_cache::empty_mapping_value())]
        );
    }

    #[tokio::test]
    async fn scenario_node_identity_collision_evicts_old_api() {
        let (factory, registry) = per_node_recorder_factory();
        let mgr = RegistrationManager::with_node_api_factory(factory);

        mgr.register_publisher("t1", "*", "N", "http://x/");
        mgr.register_publisher("t2", "*", "N", "http://y/");
        mgr.close().await;

        assert!(mgr.publisher_apis("t1").is_empty());
        assert_eq!(mgr.publisher_apis("t2"), vec!["http://y/".to_string()]);

        let calls = recorder_for(&registry, "http://x/").calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Recorded::Shutdown("new node registered with same name".to_string())]);
    }

    #[test]
    fn get_service_api_picks_lexicographically_least_provider() {
        let mgr = RegistrationManager::new();
        mgr.register_service("/add", "B", "http://b/", "rosrpc://b/");
        mgr.register_service("/add", "A", "http://a/", "rosrpc://a/");
        assert_eq!(mgr.get_service_api("/add").unwrap(), "rosrpc://a/");
    }

    #[test]
    fn unregister_returns_false_for_absent_registration() {
        let mgr = RegistrationManager::new();
        assert!(!mgr.unregister_subscriber("t", "S", "http://a/"));
        assert!(!mgr.unregister_publisher("t", "P", "http://b/"));
        assert!(!mgr.unregister_service("/add", "A", "http://a/"));
        assert!(!mgr.unregister_param_subscriber("/x", "A", "http://a/"));
    }
}
