//! Client lifecycle and invocation gateway
//!
//! A [`Client`] owns one engine context. It moves through
//! `Uninitialized -> Active -> Destroyed`; requests are only accepted while
//! active. Destroying the client tears down the engine context, then fires the
//! shutdown signal so every reader still waiting returns `TransportClosed`.

use crate::correlation::{sink, CallControl, Ingress, RequestId, Signal};
use crate::engine::{ContextHandle, Engine};
use crate::error::{ClientError, ClientResult, ForeignError};
use crate::ffi::{wire_len, NativeEngine};
use crate::reader::{decode, PendingResponse, Subscription};
use ever_config::{BindingConfig, ClientConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Name this binding reports to the engine
pub const BINDING_LIBRARY: &str = "ever-client-rs";

/// Observable lifecycle state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Active,
    Destroyed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Uninitialized => write!(f, "uninitialized"),
            ClientState::Active => write!(f, "active"),
            ClientState::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Uninitialized,
    Active(ContextHandle),
    Destroyed,
}

impl Lifecycle {
    fn state(self) -> ClientState {
        match self {
            Lifecycle::Uninitialized => ClientState::Uninitialized,
            Lifecycle::Active(_) => ClientState::Active,
            Lifecycle::Destroyed => ClientState::Destroyed,
        }
    }
}

#[derive(Deserialize)]
struct ContextResponse {
    result: Option<ContextHandle>,
    error: Option<ForeignError>,
}

fn parse_context_response(response: &[u8]) -> ClientResult<ContextHandle> {
    let response: ContextResponse = serde_json::from_slice(response).map_err(|e| {
        ClientError::ContextCreation(format!(
            "unreadable engine response '{}': {}",
            String::from_utf8_lossy(response),
            e
        ))
    })?;

    match response {
        ContextResponse {
            error: Some(error), ..
        } => Err(ClientError::Foreign(error)),
        ContextResponse {
            result: Some(context),
            ..
        } if context != 0 => Ok(context),
        _ => Err(ClientError::ContextCreation(
            "engine returned no context handle".to_string(),
        )),
    }
}

/// Serialize request params. Params that serialize to `null` (such as `()`)
/// are sent as an empty string, which the engine reads as "no params".
fn encode_params<P: Serialize + ?Sized>(params: &P) -> ClientResult<Vec<u8>> {
    let value = serde_json::to_value(params).map_err(ClientError::Encode)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::to_vec(&value).map_err(ClientError::Encode)
}

fn check_wire_len(payload: &[u8]) -> ClientResult<()> {
    match wire_len(payload.len()) {
        Some(_) => Ok(()),
        None => Err(ClientError::PayloadTooLarge(payload.len())),
    }
}

struct ClientInner {
    engine: Box<dyn Engine>,
    ingress: Ingress,
    shutdown: Signal,
    lifecycle: RwLock<Lifecycle>,
}

impl ClientInner {
    fn destroy(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *lifecycle, Lifecycle::Destroyed)
        };

        if let Lifecycle::Active(context) = previous {
            self.engine.destroy_context(context);
            tracing::info!(context, "client context destroyed");
        }

        self.shutdown.fire();

        // No callbacks arrive after teardown to release these
        let released = self
            .ingress
            .table()
            .remove_matching(|call| call.control.shutdown_signal().same_as(&self.shutdown));
        for call in &released {
            call.sink.close();
        }
        if !released.is_empty() {
            tracing::debug!(count = released.len(), "released outstanding calls");
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Handle to an engine context. Clones share the same context.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Client {
    /// Create an uninitialized client over `engine`
    pub fn new<E: Engine>(engine: E) -> Self {
        let table = engine.correlation_table();
        Self {
            inner: Arc::new(ClientInner {
                engine: Box::new(engine),
                ingress: Ingress::new(table),
                shutdown: Signal::new(),
                lifecycle: RwLock::new(Lifecycle::Uninitialized),
            }),
        }
    }

    /// Create a client and its engine context in one step
    pub fn connect<E: Engine>(engine: E, config: &ClientConfig) -> ClientResult<Self> {
        let client = Self::new(engine);
        client.create_context(config)?;
        Ok(client)
    }

    /// Load the native engine library and connect
    pub fn connect_native(config: &ClientConfig) -> ClientResult<Self> {
        Self::connect(NativeEngine::load()?, config)
    }

    /// Create the engine context. Only valid once, from `Uninitialized`.
    ///
    /// Identifies this binding to the engine unless `config.binding` is set.
    pub fn create_context(&self, config: &ClientConfig) -> ClientResult<ContextHandle> {
        let mut config = config.clone();
        config.binding.get_or_insert_with(|| BindingConfig {
            library: Some(BINDING_LIBRARY.to_string()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        });

        let config_json = serde_json::to_string(&config).map_err(ClientError::Encode)?;
        self.create_context_from_json(&config_json)
    }

    /// Create the engine context from a raw JSON configuration blob
    pub fn create_context_from_json(&self, config_json: &str) -> ClientResult<ContextHandle> {
        let mut lifecycle = self.write_lifecycle();
        if let state @ (Lifecycle::Active(_) | Lifecycle::Destroyed) = *lifecycle {
            return Err(ClientError::InvalidState {
                operation: "create context",
                state: state.state(),
            });
        }

        check_wire_len(config_json.as_bytes())?;
        let response = self.inner.engine.create_context(config_json);
        let context = parse_context_response(&response).map_err(|e| {
            tracing::warn!(error = %e, "engine refused context creation");
            e
        })?;

        *lifecycle = Lifecycle::Active(context);
        tracing::info!(context, "client context created");
        Ok(context)
    }

    /// Tear down the engine context and wake every waiting reader.
    ///
    /// Calls still outstanding are dropped from the correlation table.
    /// Idempotent: the engine context is destroyed at most once.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn state(&self) -> ClientState {
        self.read_lifecycle().state()
    }

    /// The engine context handle while active
    pub fn context(&self) -> Option<ContextHandle> {
        match *self.read_lifecycle() {
            Lifecycle::Active(context) => Some(context),
            _ => None,
        }
    }

    /// Number of calls still registered for delivery
    pub fn pending_count(&self) -> usize {
        self.inner.ingress.table().len()
    }

    /// Whether a request id is still registered
    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.inner.ingress.table().contains(request_id)
    }

    /// Register a call and hand it to the engine with pre-encoded params.
    ///
    /// Returns as soon as the engine accepted the call; responses are read
    /// through the returned handle.
    pub fn request_raw(&self, method: &str, params_json: &[u8]) -> ClientResult<PendingResponse> {
        // Held across the engine call so destroy cannot race a request in flight
        let lifecycle = self.read_lifecycle();
        let context = match *lifecycle {
            Lifecycle::Active(context) => context,
            other => {
                return Err(ClientError::InvalidState {
                    operation: "send request",
                    state: other.state(),
                })
            }
        };

        check_wire_len(method.as_bytes())?;
        check_wire_len(params_json)?;

        let (sink, receiver) = sink::channel();
        let control = CallControl::new(self.inner.shutdown.clone());
        let table = Arc::clone(self.inner.ingress.table());
        let request_id = table.register(sink, Arc::clone(&control));

        tracing::debug!(request_id, method, "request sent");
        self.inner
            .engine
            .request(context, method, params_json, request_id, &self.inner.ingress);
        drop(lifecycle);

        Ok(PendingResponse::new(
            request_id,
            receiver,
            control,
            table,
            self.inner.shutdown.clone(),
        ))
    }

    /// Serialize `params` and send the request
    pub fn request<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
    ) -> ClientResult<PendingResponse> {
        let params_json = encode_params(params)?;
        self.request_raw(method, &params_json)
    }

    /// Send a request and wait for its aggregated raw result
    pub async fn get_response<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
    ) -> ClientResult<Vec<u8>> {
        self.request(method, params)?.wait().await
    }

    /// Send a request and decode its result
    pub async fn get_result<P, R>(&self, method: &str, params: &P) -> ClientResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(method, params)?.wait_decoded().await
    }

    pub async fn get_response_with_timeout<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> ClientResult<Vec<u8>> {
        self.request(method, params)?.wait_with_timeout(timeout).await
    }

    pub async fn get_result_with_timeout<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> ClientResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        decode(&self.get_response_with_timeout(method, params, timeout).await?)
    }

    /// Send a request, decoding each stream event into `E` for `on_event`,
    /// and decode the final result.
    ///
    /// An event that fails to decode is skipped; once the call completes, the
    /// first such failure is returned in place of the result.
    pub async fn get_result_with_events<P, R, E, F>(
        &self,
        method: &str,
        params: &P,
        mut on_event: F,
    ) -> ClientResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
        E: DeserializeOwned,
        F: FnMut(E),
    {
        let request = self.request(method, params)?;
        let request_id = request.request_id();

        let mut event_error = None;
        let payload = request
            .wait_with_events(|raw| match decode::<E>(raw) {
                Ok(event) => on_event(event),
                Err(e) => {
                    tracing::warn!(request_id, method, error = %e, "undecodable stream event");
                    event_error.get_or_insert(e);
                }
            })
            .await?;

        match event_error {
            Some(e) => Err(e),
            None => decode(&payload),
        }
    }

    /// Send a streaming request and read its payloads one at a time
    pub fn subscribe<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
    ) -> ClientResult<Subscription> {
        Ok(self.request(method, params)?.into_subscription())
    }

    /// Stop local delivery for a call.
    ///
    /// Fires the call's cancel signal, closes its sink and removes it from the
    /// table. Returns `false` if the call had already finished or never existed.
    /// The engine is not told; engine-side subscriptions are ended through
    /// their module (`net().unsubscribe`).
    pub fn unsubscribe(&self, request_id: RequestId) -> bool {
        match self.inner.ingress.table().resolve(request_id, true) {
            Some(call) => {
                call.control.claim_cancellation();
                call.sink.close();
                tracing::debug!(request_id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    fn read_lifecycle(&self) -> std::sync::RwLockReadGuard<'_, Lifecycle> {
        self.inner.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lifecycle(&self) -> std::sync::RwLockWriteGuard<'_, Lifecycle> {
        self.inner.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}
