//! Request dispatch, outcome tracking and lookup helpers.
//!
//! # Design
//! `MailchimpClient` splits each call into three steps, as plain functions
//! over plain data: `build_request` turns a verb, path and args into an
//! `HttpRequest`; a `Transport` executes it; `parse_body` interprets what
//! came back. The caller receives the resulting `Exchange`.
//!
//! The client also remembers the latest `Exchange` so `success()`,
//! `last_error()`, `last_request()` and `last_response()` can be polled after
//! the fact. Concurrent calls are safe: each caller still gets its own
//! `Exchange`, and the remembered one is whichever finished last.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientOptions;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpMethod, HttpRequest, ResponseSnapshot};
use crate::query::encode_query;
use crate::response::{parse_body, Exchange, Outcome};
use crate::subscriber;
use crate::transport::{Transport, UreqTransport};
use crate::types::{InterestCategories, Interests, Lists};

const ACCEPT: &str = "application/vnd.api+json";
const CONTENT_TYPE: &str = "application/vnd.api+json";

/// An API key split into its secret and data-center parts.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    key: String,
    data_center: String,
}

impl ApiKey {
    /// Parse a key of the form `<secret>-<data center>`.
    ///
    /// # Errors
    /// - `ClientError::MissingCredential` if the key is empty
    /// - `ClientError::InvalidCredential` if there is no `-` or nothing after it
    pub fn parse(key: &str) -> ClientResult<Self> {
        if key.is_empty() {
            return Err(ClientError::MissingCredential);
        }
        let Some((_, data_center)) = key.rsplit_once('-') else {
            return Err(ClientError::InvalidCredential("missing data center suffix".to_string()));
        };
        if data_center.is_empty() {
            return Err(ClientError::InvalidCredential("empty data center suffix".to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            data_center: data_center.to_string(),
        })
    }

    pub fn data_center(&self) -> &str {
        &self.data_center
    }

    fn authorization(&self) -> String {
        format!("apikey {}", self.key)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"[REDACTED]")
            .field("data_center", &self.data_center)
            .finish()
    }
}

/// State of the most recent call, as exposed by the polling accessors.
#[derive(Debug, Clone, Default)]
struct LastCall {
    request: Option<HttpRequest>,
    response: ResponseSnapshot,
    successful: bool,
    error: String,
}

/// Blocking client for the Mailchimp marketing API 3.0.
pub struct MailchimpClient<T = UreqTransport> {
    key: ApiKey,
    endpoint: String,
    options: ClientOptions,
    transport: T,
    last: Mutex<LastCall>,
}

impl<T> fmt::Debug for MailchimpClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailchimpClient")
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("verify_ssl", &self.options.verify_ssl)
            .finish()
    }
}

impl MailchimpClient<UreqTransport> {
    /// Create a client with default options.
    ///
    /// # Errors
    /// `MissingCredential` or `InvalidCredential` for a bad key.
    pub fn new(api_key: &str) -> ClientResult<Self> {
        Self::with_options(api_key, ClientOptions::default())
    }

    /// Create a client with explicit options.
    ///
    /// # Errors
    /// Credential errors as for `new`, or `TransportUnavailable` if the
    /// HTTP agent cannot be configured.
    pub fn with_options(api_key: &str, options: ClientOptions) -> ClientResult<Self> {
        let key = ApiKey::parse(api_key)?;
        let transport = UreqTransport::new(&options)?;
        Ok(Self::assemble(key, options, transport))
    }

    /// Create a client from `MAILCHIMP_API_KEY` and the variables read by
    /// `ClientOptions::from_env`.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = env::var("MAILCHIMP_API_KEY").map_err(|_| ClientError::MissingCredential)?;
        Self::with_options(&api_key, ClientOptions::from_env()?)
    }
}

impl<T: Transport> MailchimpClient<T> {
    /// Create a client that sends requests through `transport`.
    pub fn with_transport(api_key: &str, options: ClientOptions, transport: T) -> ClientResult<Self> {
        let key = ApiKey::parse(api_key)?;
        Ok(Self::assemble(key, options, transport))
    }

    fn assemble(key: ApiKey, options: ClientOptions, transport: T) -> Self {
        let endpoint = options.endpoint_for(key.data_center());
        Self {
            key,
            endpoint,
            options,
            transport,
            last: Mutex::new(LastCall::default()),
        }
    }

    pub fn data_center(&self) -> &str {
        self.key.data_center()
    }

    /// Base endpoint, e.g. `https://us6.api.mailchimp.com/3.0`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------------

    /// `GET {endpoint}/{path}?{args}`, with the default timeout. Use
    /// [`request`](Self::request) for a per-call timeout.
    pub fn get<A: Serialize + ?Sized>(&self, path: &str, args: &A) -> Exchange {
        self.request(HttpMethod::Get, path, args, self.options.timeout)
    }

    /// `POST {endpoint}/{path}` with `args` as the JSON body. See `get` for
    /// timeouts.
    pub fn post<A: Serialize + ?Sized>(&self, path: &str, args: &A) -> Exchange {
        self.request(HttpMethod::Post, path, args, self.options.timeout)
    }

    /// `PUT {endpoint}/{path}` with `args` as the JSON body.
    pub fn put<A: Serialize + ?Sized>(&self, path: &str, args: &A) -> Exchange {
        self.request(HttpMethod::Put, path, args, self.options.timeout)
    }

    /// `PATCH {endpoint}/{path}` with `args` as the JSON body.
    pub fn patch<A: Serialize + ?Sized>(&self, path: &str, args: &A) -> Exchange {
        self.request(HttpMethod::Patch, path, args, self.options.timeout)
    }

    /// `DELETE {endpoint}/{path}`. Args are ignored. See `get` for timeouts.
    pub fn delete<A: Serialize + ?Sized>(&self, path: &str, args: &A) -> Exchange {
        self.request(HttpMethod::Delete, path, args, self.options.timeout)
    }

    /// Send one request with an explicit timeout and record the result.
    #[instrument(skip(self, args))]
    pub fn request<A: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        args: &A,
        timeout: Duration,
    ) -> Exchange {
        let exchange = match serde_json::to_value(args) {
            Ok(args) => {
                let request = self.build_request(method, path, &args, timeout);
                self.dispatch(request)
            }
            Err(e) => {
                warn!(error = %e, "request arguments could not be encoded");
                Exchange {
                    request: self.build_request(method, path, &Value::Null, timeout),
                    response: ResponseSnapshot::default(),
                    outcome: Outcome::InvalidArgs(e.to_string()),
                }
            }
        };
        self.remember(&exchange);
        exchange
    }

    /// Describe a request without sending it.
    ///
    /// `path` is appended after a single `/`; no leading-slash normalization
    /// is performed.
    pub fn build_request(&self, method: HttpMethod, path: &str, args: &Value, timeout: Duration) -> HttpRequest {
        let mut url = format!("{}/{}", self.endpoint, path);
        let mut body = None;

        match method {
            HttpMethod::Get => {
                let query = encode_query(args);
                if !query.is_empty() {
                    url.push('?');
                    url.push_str(&query);
                }
            }
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                body = Some(match args {
                    Value::Null => "{}".to_string(),
                    other => other.to_string(),
                });
            }
            HttpMethod::Delete => {}
        }

        HttpRequest {
            method,
            path: path.to_string(),
            url,
            headers: vec![
                ("Accept".to_string(), ACCEPT.to_string()),
                ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
                ("Authorization".to_string(), self.key.authorization()),
                ("User-Agent".to_string(), self.options.user_agent.clone()),
            ],
            body,
            timeout,
        }
    }

    fn dispatch(&self, request: HttpRequest) -> Exchange {
        debug!(method = %request.method, path = %request.path, "dispatching request");

        match self.transport.execute(&request) {
            Ok(response) => {
                let outcome = parse_body(&response.body);
                if let Outcome::ApiError { status, detail, .. } = &outcome {
                    warn!(http_status = response.status, status, detail = %detail, "API returned an error document");
                }
                debug!(http_status = response.status, success = outcome.is_success(), "response received");
                Exchange {
                    response: ResponseSnapshot::from(&response),
                    request,
                    outcome,
                }
            }
            Err(e) => {
                warn!(error = %e, "transport failure");
                Exchange {
                    request,
                    response: ResponseSnapshot::default(),
                    outcome: Outcome::Transport(e.0),
                }
            }
        }
    }

    fn remember(&self, exchange: &Exchange) {
        let mut last = self.last_call();
        last.request = Some(exchange.request.clone());
        last.response = exchange.response.clone();
        last.successful = exchange.success();
        last.error = exchange.error();
    }

    fn last_call(&self) -> MutexGuard<'_, LastCall> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Polling accessors
    // -----------------------------------------------------------------------

    /// Whether the most recent call succeeded.
    pub fn success(&self) -> bool {
        self.last_call().successful
    }

    /// Error text of the most recent call; empty when there was none.
    pub fn last_error(&self) -> String {
        self.last_call().error.clone()
    }

    /// Headers and body of the most recent response.
    pub fn last_response(&self) -> ResponseSnapshot {
        self.last_call().response.clone()
    }

    /// The most recent request, `None` before the first call.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.last_call().request.clone()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Id of the list called `name`. When several lists share the name, the
    /// last one in the response wins.
    pub fn resolve_list_id(&self, name: &str) -> Option<String> {
        let page: Lists = self.get("lists", &Value::Null).data()?;
        page.lists
            .into_iter()
            .filter(|list| list.name == name)
            .last()
            .map(|list| list.id)
    }

    /// Id of the interest category titled `category_name` in `list_id`.
    pub fn resolve_interest_category_id(&self, category_name: &str, list_id: &str) -> Option<String> {
        let path = format!("lists/{list_id}/interest-categories");
        let page: InterestCategories = self.get(&path, &Value::Null).data()?;
        page.categories
            .into_iter()
            .filter(|category| category.title == category_name && category.list_id == list_id)
            .last()
            .map(|category| category.id)
    }

    /// Interest id → name for the interests of `category_id` in `list_id`.
    ///
    /// Entries belonging to another list or category are skipped; `None`
    /// when nothing is left.
    pub fn list_interests_in_category(&self, list_id: &str, category_id: &str) -> Option<BTreeMap<String, String>> {
        let path = format!("lists/{list_id}/interest-categories/{category_id}/interests");
        let page: Interests = self.get(&path, &Value::Null).data()?;
        let interests: BTreeMap<String, String> = page
            .interests
            .into_iter()
            .filter(|interest| interest.category_id == category_id && interest.list_id == list_id)
            .map(|interest| (interest.id, interest.name))
            .collect();
        (!interests.is_empty()).then_some(interests)
    }

    /// See [`subscriber::subscriber_hash`].
    pub fn subscriber_hash(email: &str) -> String {
        subscriber::subscriber_hash(email)
    }
}
