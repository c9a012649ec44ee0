//! Transport test doubles shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use serde_json::Value;
use sitekit::{
    endpoint::{HttpMethod, RequestDescriptor},
    transport::{ApiResponse, SendFuture, Transport, TransportError},
};
use tokio::sync::{mpsc, oneshot};

pub fn method_str(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Patch => "PATCH",
        HttpMethod::Put => "PUT",
        HttpMethod::Delete => "DELETE",
    }
}

pub fn route_key(request: &RequestDescriptor) -> String {
    format!("{} {}", method_str(request.method), request.path)
}

/// Auto-answering transport scripted per `"METHOD /path"` route.
/// Queued responses are served in order; once a queue runs dry the
/// route falls back to its `always` response, else `200 null`.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    always: Mutex<HashMap<String, ApiResponse>>,
    log: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enqueue(&self, route: &str, status: u16, body: Value) {
        self.queued
            .lock()
            .expect("lock")
            .entry(route.to_string())
            .or_default()
            .push_back(ApiResponse { status, body });
    }

    pub fn respond_always(&self, route: &str, status: u16, body: Value) {
        self.always
            .lock()
            .expect("lock")
            .insert(route.to_string(), ApiResponse { status, body });
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.log.lock().expect("lock").clone()
    }

    pub fn calls(&self, route: &str) -> usize {
        self.log
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| route_key(r) == route)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: RequestDescriptor) -> SendFuture {
        let route = route_key(&request);
        self.log.lock().expect("lock").push(request);

        let response = self
            .queued
            .lock()
            .expect("lock")
            .get_mut(&route)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.always.lock().expect("lock").get(&route).cloned())
            .unwrap_or(ApiResponse {
                status: 200,
                body: Value::Null,
            });

        Box::pin(async move { Ok(response) })
    }
}

/// A request held by [`ManualTransport`] until the test resolves it.
pub struct PendingRequest {
    pub request: RequestDescriptor,
    responder: oneshot::Sender<Result<ApiResponse, TransportError>>,
}

impl PendingRequest {
    pub fn route(&self) -> String {
        route_key(&self.request)
    }

    pub fn respond_json(self, status: u16, body: Value) {
        let _ = self.responder.send(Ok(ApiResponse { status, body }));
    }

    pub fn fail(self, message: &str) {
        let _ = self
            .responder
            .send(Err(TransportError::Message(message.to_string())));
    }
}

/// Transport that parks every request on a channel so tests control
/// response order exactly.
pub struct ManualTransport {
    tx: mpsc::UnboundedSender<PendingRequest>,
}

impl ManualTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Transport for ManualTransport {
    fn send(&self, request: RequestDescriptor) -> SendFuture {
        let (responder, rx) = oneshot::channel();
        let _ = self.tx.send(PendingRequest { request, responder });
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(TransportError::Message("request dropped".to_string())))
        })
    }
}
