//! Transports that execute an `HttpRequest`.
//!
//! # Design
//! The client builds requests and interprets response bodies; a `Transport`
//! only moves bytes. `UreqTransport` is the blocking network implementation.
//! `ScriptedTransport` replays canned responses so callers can exercise the
//! client without a server.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ureq::tls::TlsConfig;
use ureq::{Agent, Proxy, RequestBuilder};

use crate::config::ClientOptions;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP exchange.
///
/// Implementations must return non-2xx responses as `Ok`; only failures of
/// the exchange itself (DNS, TLS, timeout, refused connection) are `Err`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Build an agent honouring `verify_ssl` and `proxy`.
    ///
    /// # Errors
    /// `ClientError::TransportUnavailable` if the proxy URI is unusable.
    pub fn new(options: &ClientOptions) -> ClientResult<Self> {
        let proxy = match options.proxy.as_deref() {
            Some(uri) => Some(Proxy::new(uri).map_err(|e| ClientError::TransportUnavailable(e.to_string()))?),
            None => None,
        };

        let tls = TlsConfig::builder()
            .disable_verification(!options.verify_ssl)
            .build();

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(tls)
            .proxy(proxy)
            .build()
            .new_agent();

        Ok(Self { agent })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(url), request).call(),
            (HttpMethod::Delete, _) => prepare(self.agent.delete(url), request).call(),
            (HttpMethod::Post, Some(body)) => prepare(self.agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => prepare(self.agent.put(url), request).send(body.as_bytes()),
            (HttpMethod::Put, None) => prepare(self.agent.put(url), request).send_empty(),
            (HttpMethod::Patch, Some(body)) => prepare(self.agent.patch(url), request).send(body.as_bytes()),
            (HttpMethod::Patch, None) => prepare(self.agent.patch(url), request).send_empty(),
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Attach headers and the per-call timeout to a ureq request.
fn prepare<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(Some(request.timeout)).build()
}

/// In-memory transport that replays a queue of results.
///
/// Every executed request is recorded and available through `requests()`.
/// Once the queue is exhausted, calls fail with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful exchange.
    pub fn respond(self, response: HttpResponse) -> Self {
        lock(&self.script).push_back(Ok(response));
        self
    }

    /// Queue a 200 response with a JSON body.
    pub fn respond_json(self, body: impl Into<String>) -> Self {
        self.respond(HttpResponse::json(200, body))
    }

    /// Queue a transport-level failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(TransportError(message.into())));
        self
    }

    /// Requests executed so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of queued results not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted response left".to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
