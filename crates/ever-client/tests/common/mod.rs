//! Scripted engine for driving a `Client` without the native library

#![allow(dead_code)]

use ever_client::correlation::CorrelationTable;
use ever_client::{Client, ContextHandle, Engine, Ingress, RequestId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const SUCCESS: u32 = 0;
pub const ERROR: u32 = 1;
pub const STREAM_TERMINATED: u32 = 2;
pub const STREAM_EVENT: u32 = 100;

/// One scripted fragment: `(status, payload, finished)`
pub type Frame = (u32, &'static str, bool);

/// A request the engine received
#[derive(Debug, Clone)]
pub struct Call {
    pub context: ContextHandle,
    pub method: String,
    pub params: Vec<u8>,
    pub request_id: RequestId,
}

impl Call {
    pub fn params_json(&self) -> serde_json::Value {
        if self.params.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&self.params).unwrap()
    }
}

type Handler = dyn Fn(&Call, &Ingress) + Send + Sync;

pub struct ScriptedEngine {
    handler: Box<Handler>,
    context_response: Vec<u8>,
    configs: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
    ingress: Mutex<Option<Ingress>>,
    table: Option<Arc<CorrelationTable>>,
    destroyed: AtomicUsize,
}

impl ScriptedEngine {
    /// Engine answering every request through `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Call, &Ingress) + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            context_response: br#"{"result":1}"#.to_vec(),
            configs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            ingress: Mutex::new(None),
            table: None,
            destroyed: AtomicUsize::new(0),
        }
    }

    /// Engine that accepts requests and never answers
    pub fn silent() -> Self {
        Self::new(|_, _| {})
    }

    /// Engine answering each method with its script, from a separate thread.
    /// Unknown methods get an error fragment.
    pub fn scripted(routes: Vec<(&'static str, Vec<Frame>)>) -> Self {
        let routes: HashMap<&'static str, Vec<Frame>> = routes.into_iter().collect();
        Self::new(move |call, ingress| {
            let frames = routes.get(call.method.as_str()).cloned().unwrap_or_else(|| {
                vec![(ERROR, r#"{"code":-1,"message":"unknown method"}"#, true)]
            });
            deliver_later(ingress, call.request_id, frames, Duration::ZERO);
        })
    }

    pub fn with_context_response(mut self, response: &str) -> Self {
        self.context_response = response.as_bytes().to_vec();
        self
    }

    /// Register calls in `table` instead of a fresh per-client table
    pub fn with_table(mut self, table: Arc<CorrelationTable>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn configs(&self) -> Vec<String> {
        self.configs.lock().unwrap().clone()
    }

    /// Ingress of the most recent request, for delivering by hand
    pub fn ingress(&self) -> Ingress {
        self.ingress.lock().unwrap().clone().expect("no request sent yet")
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Engine for ScriptedEngine {
    fn create_context(&self, config_json: &str) -> Vec<u8> {
        self.configs.lock().unwrap().push(config_json.to_string());
        self.context_response.clone()
    }

    fn destroy_context(&self, _context: ContextHandle) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn request(
        &self,
        context: ContextHandle,
        method: &str,
        params_json: &[u8],
        request_id: RequestId,
        ingress: &Ingress,
    ) {
        let call = Call {
            context,
            method: method.to_string(),
            params: params_json.to_vec(),
            request_id,
        };
        self.calls.lock().unwrap().push(call.clone());
        self.ingress.lock().unwrap().replace(ingress.clone());
        (self.handler)(&call, ingress);
    }

    fn correlation_table(&self) -> Arc<CorrelationTable> {
        match &self.table {
            Some(table) => Arc::clone(table),
            None => Arc::new(CorrelationTable::new()),
        }
    }
}

/// Deliver `frames` in order from a new thread, pausing `gap` before each
pub fn deliver_later(ingress: &Ingress, request_id: RequestId, frames: Vec<Frame>, gap: Duration) {
    let ingress = ingress.clone();
    thread::spawn(move || {
        for (status, payload, finished) in frames {
            if !gap.is_zero() {
                thread::sleep(gap);
            }
            ingress.deliver(request_id, payload.as_bytes().to_vec(), status, finished);
        }
    });
}

/// Client over `engine` with an active context
pub fn active_client(engine: Arc<ScriptedEngine>) -> Client {
    let client = Client::new(engine);
    client.create_context_from_json("{}").unwrap();
    client
}
