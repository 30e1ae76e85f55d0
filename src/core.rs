//! RPC facade (spec §4.5): one `Handler` per XML-RPC method, delegating to
//! [`RegistrationManager`] and [`ParamCache`]. This module owns process-level
//! concerns (pid, own URI, shutdown) that neither of those two modules
//! knows anything about.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dxr::client::{Call, Client, ClientBuilder, Url};
use dxr::server::{async_trait, Handler, HandlerResult};
use dxr::server_axum::axum;
use dxr::server_axum::Server;
use dxr::server_axum::{axum::http::HeaderMap, RouteBuilder};
use dxr::{TryFromParams, TryFromValue, TryToValue, Value};
use paste::paste;
use tokio::sync::Notify;

use crate::param_cache::ParamCache;
use crate::registration_manager::RegistrationManager;

enum MasterEndpoints {
    GetPid,
    GetUri,
    Shutdown,
    RegisterService,
    UnRegisterService,
    RegisterSubscriber,
    UnregisterSubscriber,
    RegisterPublisher,
    UnregisterPublisher,
    LookupNode,
    GetPublishedTopics,
    GetTopicTypes,
    GetSystemState,
    LookupService,
    DeleteParam,
    SetParam,
    GetParam,
    SearchParam,
    SubscribeParam,
    UnsubscribeParam,
    HasParam,
    GetParamNames,
    SystemMultiCall,
    Default,
}

impl MasterEndpoints {
    fn as_str(&self) -> &'static str {
        match self {
            MasterEndpoints::GetPid => "getPid",
            MasterEndpoints::GetUri => "getUri",
            MasterEndpoints::Shutdown => "shutdown",
            MasterEndpoints::RegisterService => "registerService",
            MasterEndpoints::UnRegisterService => "unregisterService",
            MasterEndpoints::RegisterSubscriber => "registerSubscriber",
            MasterEndpoints::UnregisterSubscriber => "unregisterSubscriber",
            MasterEndpoints::RegisterPublisher => "registerPublisher",
            MasterEndpoints::UnregisterPublisher => "unregisterPublisher",
            MasterEndpoints::LookupNode => "lookupNode",
            MasterEndpoints::GetPublishedTopics => "getPublishedTopics",
            MasterEndpoints::GetTopicTypes => "getTopicTypes",
            MasterEndpoints::GetSystemState => "getSystemState",
            MasterEndpoints::LookupService => "lookupService",
            MasterEndpoints::DeleteParam => "deleteParam",
            MasterEndpoints::SetParam => "setParam",
            MasterEndpoints::GetParam => "getParam",
            MasterEndpoints::SearchParam => "searchParam",
            MasterEndpoints::SubscribeParam => "subscribeParam",
            MasterEndpoints::UnsubscribeParam => "unsubscribeParam",
            MasterEndpoints::HasParam => "hasParam",
            MasterEndpoints::GetParamNames => "getParamNames",
            MasterEndpoints::SystemMultiCall => "system.multicall",
            MasterEndpoints::Default => "",
        }
    }
}

/// Shared state behind every handler: the two catalogs plus the bits of
/// process bookkeeping the facade itself is responsible for.
pub struct MasterData {
    param_cache: Mutex<ParamCache>,
    registration_manager: RegistrationManager,
    uri: std::net::SocketAddr,
    pid: u32,
    shutdown: Notify,
}

pub struct Master {
    data: Arc<MasterData>,
}

macro_rules! log_debug {
    ($name:literal, $params:expr) => {
        log::debug!(concat!($name, " {:?}"), $params)
    };
}

struct GetPidHandler {
    data: Arc<MasterData>,
}
type GetPidResponse = (i32, String, i32);
#[async_trait]
impl Handler for GetPidHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetPidHandler", params);
        type Request = String;
        let _caller_id = Request::try_from_params(params)?;
        Ok((1, String::new(), self.data.pid as i32).try_to_value()?)
    }
}

struct GetUriHandler {
    data: Arc<MasterData>,
}
type GetUriResponse = (i32, String, String);
#[async_trait]
impl Handler for GetUriHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetUriHandler", params);
        type Request = String;
        let _caller_id = Request::try_from_params(params)?;
        let uri = format!("http://{}/", self.data.uri);
        Ok((1, String::new(), uri).try_to_value()?)
    }
}

/// Terminates the master process (spec §4.5: "asynchronously terminates
/// the master process"). Only notifies; the response for this call is
/// sent before `Master::serve`'s `tokio::select!` observes the
/// notification, drains the Registration Manager, and returns.
struct ShutdownHandler {
    data: Arc<MasterData>,
}
type ShutdownResponse = (i32, String, i32);
#[async_trait]
impl Handler for ShutdownHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("ShutdownHandler", params);
        type Request = (String, String);
        let (caller_id, msg) = Request::try_from_params(params)?;
        log::info!("shutdown requested by {caller_id}: {msg}");
        self.data.shutdown.notify_one();
        Ok((1, "shutdown".to_string(), 0).try_to_value()?)
    }
}

struct RegisterServiceHandler {
    data: Arc<MasterData>,
}
type RegisterServiceResponse = (i32, String, i32);
#[async_trait]
impl Handler for RegisterServiceHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("RegisterServiceHandler", params);
        type Request = (String, String, String, String);
        let (caller_id, service, service_api, caller_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .register_service(&service, &caller_id, &caller_api, &service_api);
        Ok((1, String::new(), 1).try_to_value()?)
    }
}

struct UnRegisterServiceHandler {
    data: Arc<MasterData>,
}
type UnRegisterServiceResponse = (i32, String, i32);
#[async_trait]
impl Handler for UnRegisterServiceHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("UnRegisterServiceHandler", params);
        type Request = (String, String, String);
        let (caller_id, service, service_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .unregister_service(&service, &caller_id, &service_api);
        Ok((1, String::new(), 1).try_to_value()?)
    }
}

struct RegisterSubscriberHandler {
    data: Arc<MasterData>,
}
type RegisterSubscriberResponse = (i32, String, Vec<String>);
#[async_trait]
impl Handler for RegisterSubscriberHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("RegisterSubscriberHandler", params);
        type Request = (String, String, String, String);
        let (caller_id, topic, topic_type, caller_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .register_subscriber(&topic, &topic_type, &caller_id, &caller_api);
        let publishers = self.data.registration_manager.publisher_apis(&topic);
        Ok((1, String::new(), publishers).try_to_value()?)
    }
}

struct UnRegisterSubscriberHandler {
    data: Arc<MasterData>,
}
type UnRegisterSubscriberResponse = (i32, String, i32);
#[async_trait]
impl Handler for UnRegisterSubscriberHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("UnRegisterSubscriberHandler", params);
        type Request = (String, String, String);
        let (caller_id, topic, caller_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .unregister_subscriber(&topic, &caller_id, &caller_api);
        Ok((1, String::new(), 1).try_to_value()?)
    }
}

struct RegisterPublisherHandler {
    data: Arc<MasterData>,
}
type RegisterPublisherResponse = (i32, String, Vec<String>);
#[async_trait]
impl Handler for RegisterPublisherHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("RegisterPublisherHandler", params);
        type Request = (String, String, String, String);
        let (caller_id, topic, topic_type, caller_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .register_publisher(&topic, &topic_type, &caller_id, &caller_api);
        let subscribers = self.data.registration_manager.subscriber_apis(&topic);
        Ok((1, String::new(), subscribers).try_to_value()?)
    }
}

struct UnRegisterPublisherHandler {
    data: Arc<MasterData>,
}
type UnRegisterPublisherResponse = (i32, String, i32);
#[async_trait]
impl Handler for UnRegisterPublisherHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("UnRegisterPublisherHandler", params);
        type Request = (String, String, String);
        let (caller_id, topic, caller_api) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .unregister_publisher(&topic, &caller_id, &caller_api);
        Ok((1, String::new(), 1).try_to_value()?)
    }
}

struct LookupNodeHandler {
    data: Arc<MasterData>,
}
type LookupNodeResponse = (i32, String, String);
#[async_trait]
impl Handler for LookupNodeHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("LookupNodeHandler", params);
        type Request = (String, String);
        let (_caller_id, node_name) = Request::try_from_params(params)?;
        match self.data.registration_manager.get_caller_api(&node_name) {
            Ok(api) => Ok((1, String::new(), api).try_to_value()?),
            Err(err) => {
                log::warn!("lookupNode({node_name}) failed: {err}");
                Ok((err.status(), err.to_string(), String::new()).try_to_value()?)
            }
        }
    }
}

struct GetPublishedTopicsHandler {
    data: Arc<MasterData>,
}
type GetPublishedTopicsResponse = (i32, String, Vec<(String, String)>);
#[async_trait]
impl Handler for GetPublishedTopicsHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetPublishedTopicsHandler", params);
        type Request = (String, String);
        let (_caller_id, subgraph) = Request::try_from_params(params)?;
        let topics = self.data.registration_manager.published_topics(&subgraph);
        Ok((1, String::new(), topics).try_to_value()?)
    }
}

struct GetTopicTypesHandler {
    data: Arc<MasterData>,
}
type GetTopicTypesResponse = (i32, String, Vec<(String, String)>);
#[async_trait]
impl Handler for GetTopicTypesHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetTopicTypesHandler", params);
        type Request = String;
        let _caller_id = Request::try_from_params(params)?;
        let topics = self.data.registration_manager.topic_types();
        Ok((1, String::new(), topics).try_to_value()?)
    }
}

struct GetSystemStateHandler {
    data: Arc<MasterData>,
}
#[allow(clippy::type_complexity)]
type GetSystemStateResponse = (i32, String, (Vec<(String, Vec<String>)>, Vec<(String, Vec<String>)>, Vec<(String, Vec<String>)>));
#[async_trait]
impl Handler for GetSystemStateHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetSystemStateHandler", params);
        type Request = String;
        let _caller_id = Request::try_from_params(params)?;
        let state = self.data.registration_manager.system_state();
        Ok((1, String::new(), state).try_to_value()?)
    }
}

struct LookupServiceHandler {
    data: Arc<MasterData>,
}
type LookupServiceResponse = (i32, String, String);
#[async_trait]
impl Handler for LookupServiceHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("LookupServiceHandler", params);
        type Request = (String, String);
        let (_caller_id, service) = Request::try_from_params(params)?;
        match self.data.registration_manager.get_service_api(&service) {
            Ok(api) => Ok((1, String::new(), api).try_to_value()?),
            Err(err) => {
                log::warn!("lookupService({service}) failed: {err}");
                Ok((err.status(), err.to_string(), String::new()).try_to_value()?)
            }
        }
    }
}

struct DeleteParamHandler {
    data: Arc<MasterData>,
}
type DeleteParamResponse = (i32, String, i32);
#[async_trait]
impl Handler for DeleteParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("DeleteParamHandler", params);
        type Request = (String, String);
        let (caller_id, key) = Request::try_from_params(params)?;
        let result = self.data.param_cache.lock().unwrap().delete(&key);
        match result {
            Ok(()) => {
                self.data
                    .registration_manager
                    .on_param_update(&key, &crate::param_cache::empty_mapping_value(), &caller_id);
                Ok((1, String::new(), 0).try_to_value()?)
            }
            Err(err) => {
                log::warn!("deleteParam({key}) failed: {err}");
                Ok((err.status(), err.to_string(), 0).try_to_value()?)
            }
        }
    }
}

struct SetParamHandler {
    data: Arc<MasterData>,
}
type SetParamResponse = (i32, String, i32);
#[async_trait]
impl Handler for SetParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("SetParamHandler", params);
        type Request = (String, String, Value);
        let (caller_id, key, value) = Request::try_from_params(params)?;
        let result = self.data.param_cache.lock().unwrap().set(&key, value.clone());
        match result {
            Ok(()) => {
                self.data.registration_manager.on_param_update(&key, &value, &caller_id);
                Ok((1, String::new(), 0).try_to_value()?)
            }
            Err(err) => {
                log::warn!("setParam({key}) failed: {err}");
                Ok((err.status(), err.to_string(), 0).try_to_value()?)
            }
        }
    }
}

struct GetParamHandler {
    data: Arc<MasterData>,
}
type GetParamResponse = (i32, String, Value);
#[async_trait]
impl Handler for GetParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetParamHandler", params);
        type Request = (String, String);
        let (_caller_id, key) = Request::try_from_params(params)?;
        match self.data.param_cache.lock().unwrap().get(&key) {
            Ok(value) => Ok((1, String::new(), value).try_to_value()?),
            Err(err) => Ok((err.status(), err.to_string(), Value::i4(0)).try_to_value()?),
        }
    }
}

struct SearchParamHandler {
    data: Arc<MasterData>,
}
type SearchParamResponse = (i32, String, String);
#[async_trait]
impl Handler for SearchParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("SearchParamHandler", params);
        type Request = (String, String);
        let (caller_id, key) = Request::try_from_params(params)?;
        match self.data.param_cache.lock().unwrap().search(&key, &caller_id) {
            Ok(resolved) => Ok((1, String::new(), resolved).try_to_value()?),
            Err(err) => Ok((err.status(), err.to_string(), String::new()).try_to_value()?),
        }
    }
}

struct HasParamHandler {
    data: Arc<MasterData>,
}
type HasParamResponse = (i32, String, bool);
#[async_trait]
impl Handler for HasParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("HasParamHandler", params);
        type Request = (String, String);
        let (_caller_id, key) = Request::try_from_params(params)?;
        let has = self.data.param_cache.lock().unwrap().has(&key);
        Ok((1, String::new(), has).try_to_value()?)
    }
}

struct GetParamNamesHandler {
    data: Arc<MasterData>,
}
type GetParamNamesResponse = (i32, String, Vec<String>);
#[async_trait]
impl Handler for GetParamNamesHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("GetParamNamesHandler", params);
        type Request = String;
        let _caller_id = Request::try_from_params(params)?;
        let names = self.data.param_cache.lock().unwrap().keys();
        Ok((1, String::new(), names).try_to_value()?)
    }
}

struct SubscribeParamHandler {
    data: Arc<MasterData>,
}
type SubscribeParamResponse = (i32, String, Value);
#[async_trait]
impl Handler for SubscribeParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("SubscribeParamHandler", params);
        type Request = (String, String, String);
        let (caller_id, caller_api, key) = Request::try_from_params(params)?;
        let value = self
            .data
            .param_cache
            .lock()
            .unwrap()
            .get(&key)
            .unwrap_or_else(|_| crate::param_cache::empty_mapping_value());
        self.data
            .registration_manager
            .register_param_subscriber(&key, &caller_id, &caller_api);
        Ok((1, String::new(), value).try_to_value()?)
    }
}

struct UnSubscribeParamHandler {
    data: Arc<MasterData>,
}
type UnSubscribeParamResponse = (i32, String, i32);
#[async_trait]
impl Handler for UnSubscribeParamHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log_debug!("UnSubscribeParamHandler", params);
        type Request = (String, String, String);
        let (caller_id, caller_api, key) = Request::try_from_params(params)?;
        self.data
            .registration_manager
            .unregister_param_subscriber(&key, &caller_id, &caller_api);
        Ok((1, String::new(), 1).try_to_value()?)
    }
}

/// Dispatches `system.multicall`'s batched sub-calls to the already
/// registered handlers, in input order, sharing catalog/parameter state
/// with no per-call isolation (spec §4.5 supplement).
struct SystemMultiCallHandler {
    handlers: Arc<HashMap<String, Arc<dyn Handler>>>,
}
#[async_trait]
impl Handler for SystemMultiCallHandler {
    async fn handle(&self, params: &[Value], headers: HeaderMap) -> HandlerResult {
        log_debug!("SystemMultiCallHandler", params);
        type Request = Vec<HashMap<String, Value>>;
        let call_list = Request::try_from_params(params)?;

        let mut results = Vec::with_capacity(call_list.len());
        for call in call_list {
            let method_name: String = match call.get("methodName") {
                Some(v) => String::try_from_value(v).unwrap_or_default(),
                None => String::new(),
            };
            let call_params: Vec<Value> = match call.get("params") {
                Some(v) => Vec::<Value>::try_from_value(v).unwrap_or_default(),
                None => Vec::new(),
            };

            let result = match self.handlers.get(&method_name) {
                Some(handler) => handler
                    .handle(&call_params, headers.clone())
                    .await
                    .unwrap_or_else(|_| {
                        (-1, format!("error calling {method_name}"), 0)
                            .try_to_value()
                            .expect("fixed-shape tuple always converts")
                    }),
                None => (-1, format!("unknown method {method_name}"), 0)
                    .try_to_value()
                    .expect("fixed-shape tuple always converts"),
            };
            results.push(result);
        }

        Ok(results.try_to_value()?)
    }
}

/// Fallback for any method name not explicitly routed; logs and reports
/// success with an empty payload rather than a hard XML-RPC fault.
struct DebugOutputHandler {
    #[allow(dead_code)]
    data: Arc<MasterData>,
}
#[async_trait]
impl Handler for DebugOutputHandler {
    async fn handle(&self, params: &[Value], _headers: HeaderMap) -> HandlerResult {
        log::debug!("DebugOutputHandler {:?} ", params);
        Ok((1, "", "").try_to_value()?)
    }
}

macro_rules! make_handlers {
    ($self:ident, $($endpoint:expr => $handlerFn:ident),* $(,)?) => {{
        let mut router_builder = RouteBuilder::new();
        let mut handler_map: HashMap<String, Arc<dyn Handler>> = HashMap::new();
        $(
            router_builder = router_builder.add_method($endpoint.as_str(), Box::new($handlerFn {
                data: $self.data.clone(),
            }));
            handler_map.insert(
                $endpoint.as_str().to_string(),
                Arc::new($handlerFn { data: $self.data.clone() }) as Arc<dyn Handler>,
            );
        )*
        (router_builder, handler_map)
    }};
}

impl Master {
    pub fn new(url: &std::net::SocketAddr) -> Master {
        Master {
            data: Arc::new(MasterData {
                param_cache: Mutex::new(ParamCache::new()),
                registration_manager: RegistrationManager::new(),
                uri: url.to_owned(),
                pid: std::process::id(),
                shutdown: Notify::new(),
            }),
        }
    }

    fn create_router(&self) -> axum::Router {
        let (mut router_builder, handler_map) = make_handlers!(
            self,
            MasterEndpoints::GetPid => GetPidHandler,
            MasterEndpoints::GetUri => GetUriHandler,
            MasterEndpoints::Shutdown => ShutdownHandler,
            MasterEndpoints::RegisterService => RegisterServiceHandler,
            MasterEndpoints::UnRegisterService => UnRegisterServiceHandler,
            MasterEndpoints::RegisterSubscriber => RegisterSubscriberHandler,
            MasterEndpoints::UnregisterSubscriber => UnRegisterSubscriberHandler,
            MasterEndpoints::RegisterPublisher => RegisterPublisherHandler,
            MasterEndpoints::UnregisterPublisher => UnRegisterPublisherHandler,
            MasterEndpoints::LookupNode => LookupNodeHandler,
            MasterEndpoints::GetPublishedTopics => GetPublishedTopicsHandler,
            MasterEndpoints::GetTopicTypes => GetTopicTypesHandler,
            MasterEndpoints::GetSystemState => GetSystemStateHandler,
            MasterEndpoints::LookupService => LookupServiceHandler,
            MasterEndpoints::DeleteParam => DeleteParamHandler,
            MasterEndpoints::SetParam => SetParamHandler,
            MasterEndpoints::GetParam => GetParamHandler,
            MasterEndpoints::SearchParam => SearchParamHandler,
            MasterEndpoints::SubscribeParam => SubscribeParamHandler,
            MasterEndpoints::UnsubscribeParam => UnSubscribeParamHandler,
            MasterEndpoints::HasParam => HasParamHandler,
            MasterEndpoints::GetParamNames => GetParamNamesHandler,
            MasterEndpoints::Default => DebugOutputHandler,
        );

        router_builder = router_builder.add_method(
            MasterEndpoints::SystemMultiCall.as_str(),
            Box::new(SystemMultiCallHandler {
                handlers: Arc::new(handler_map),
            }),
        );

        router_builder.build()
    }

    /// Starts the master server and listens for incoming requests.
    ///
    /// The server listens on the address given to [`Master::new`], serving
    /// the same router at both `/` and `/RPC2` (some clients use one, some
    /// the other). Returns once a `shutdown` RPC has drained every
    /// outstanding notification task.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nodecore_rs::core::Master;
    /// use url::Url;
    ///
    /// # async fn demo() -> anyhow::Result<()> {
    /// let socket_address = nodecore_rs::url_to_socket_addr(&Url::parse("http://0.0.0.0:11311").unwrap())?;
    /// let core = Master::new(&socket_address);
    /// core.serve().await
    /// # }
    /// ```
    pub async fn serve(&self) -> anyhow::Result<()> {
        let router: axum::Router = axum::Router::new()
            .nest("/", self.create_router())
            .nest("/RPC2", self.create_router());
        log::info!("nodecore-rs is listening on {}", self.data.uri);
        let server = Server::from_route(self.data.uri, router);
        let shutdown = &self.data.shutdown;
        let registration_manager = &self.data.registration_manager;
        tokio::select! {
            result = server.serve() => result,
            _ = shutdown.notified() => {
                log::info!("shutdown requested, draining outstanding notifications");
                registration_manager.close().await;
                Ok(())
            }
        }
    }
}

pub struct MasterClient {
    client: Client,
}

macro_rules! implement_client_fn {
    ($name:ident($($v:ident: $t:ty),*)->$response_type:ident) => {
        paste!{
            pub async fn [<$name:snake>](&self, $($v: $t),*) -> anyhow::Result<$response_type>{
                let request = Call::new(
                    MasterEndpoints::$name.as_str(),
                    ($($v,)*),
                );
                let response = self.client.call(request).await?;
                let value = $response_type::try_from_value(&response)?;
                Ok(value)
            }
        }
    };
}

macro_rules! make_client{
    ($($name:tt($($v:ident: $t:ty),*)-> $response_type:ident),*) => {
        $(implement_client_fn!($name($($v: $t),*)-> $response_type);)*
    }
}

impl MasterClient {
    /// Constructs a new instance of `MasterClient` bound to `url`.
    ///
    /// ```
    /// use nodecore_rs::core::MasterClient;
    /// use url::Url;
    ///
    /// let uri = Url::parse("http://localhost:11311").unwrap();
    /// let client = MasterClient::new(&uri);
    /// ```
    pub fn new(url: &Url) -> Self {
        let client = ClientBuilder::new(url.clone()).user_agent("master-client").build();
        Self { client }
    }

    make_client!(
        GetPid(caller_id: &str) -> GetPidResponse,
        GetUri(caller_id: &str) -> GetUriResponse,
        Shutdown(caller_id: &str, msg: &str) -> ShutdownResponse,
        RegisterService(caller_id: &str, service: &str, service_api: &str, caller_api: &str) -> RegisterServiceResponse,
        UnRegisterService(caller_id: &str, service: &str, service_api: &str) -> UnRegisterServiceResponse,
        RegisterSubscriber(caller_id: &str, topic: &str, topic_type: &str, caller_api: &str) -> RegisterSubscriberResponse,
        UnregisterSubscriber(caller_id: &str, topic: &str, caller_api: &str) -> UnRegisterSubscriberResponse,
        RegisterPublisher(caller_id: &str, topic: &str, topic_type: &str, caller_api: &str) -> RegisterPublisherResponse,
        UnregisterPublisher(caller_id: &str, topic: &str, caller_api: &str) -> UnRegisterPublisherResponse,
        LookupNode(caller_id: &str, node_name: &str) -> LookupNodeResponse,
        GetPublishedTopics(caller_id: &str, subgraph: &str) -> GetPublishedTopicsResponse,
        GetTopicTypes(caller_id: &str) -> GetTopicTypesResponse,
        GetSystemState(caller_id: &str) -> GetSystemStateResponse,
        LookupService(caller_id: &str, service: &str) -> LookupServiceResponse,
        DeleteParam(caller_id: &str, key: &str) -> DeleteParamResponse,
        SetParam(caller_id: &str, key: &str, value: &Value) -> SetParamResponse,
        GetParam(caller_id: &str, key: &str) -> GetParamResponse,
        SearchParam(caller_id: &str, key: &str) -> SearchParamResponse,
        SubscribeParam(caller_id: &str, caller_api: &str, key: &str) -> SubscribeParamResponse,
        UnsubscribeParam(caller_id: &str, caller_api: &str, key: &str) -> UnSubscribeParamResponse,
        HasParam(caller_id: &str, key: &str) -> HasParamResponse,
        GetParamNames(caller_id: &str) -> GetParamNamesResponse
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names_match_xmlrpc_method_names() {
        assert_eq!(MasterEndpoints::GetPid.as_str(), "getPid");
        assert_eq!(MasterEndpoints::SystemMultiCall.as_str(), "system.multicall");
        assert_eq!(MasterEndpoints::SearchParam.as_str(), "searchParam");
    }
}
