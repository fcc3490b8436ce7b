//! Blocking client for the Mailchimp marketing API 3.0.
//!
//! # Overview
//! `MailchimpClient` authenticates with an API key, derives the account's
//! data-center endpoint from the key's suffix, and sends GET/POST/PUT/PATCH/
//! DELETE requests with JSON bodies. Every call returns an `Exchange`
//! recording the request, the raw response and its interpreted `Outcome`;
//! the client additionally remembers the latest exchange for polling via
//! `success()` / `last_error()`.
//!
//! # Design
//! - Construction problems (missing or malformed key, unusable transport)
//!   are `Err(ClientError)`. Per-call problems never are; they live in
//!   `Outcome`.
//! - Outcomes are decided from the JSON body: an object with a non-200
//!   `status` and a `detail` is an API error, an empty body is `Empty`.
//! - I/O goes through the `Transport` trait. `UreqTransport` talks to the
//!   network; `ScriptedTransport` replays canned responses.
//!
//! # Example
//!
//! ```rust,no_run
//! use mailchimp_core::MailchimpClient;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MailchimpClient::new("0123456789abcdef-us6")?;
//!
//! if let Some(list_id) = client.resolve_list_id("Weekly") {
//!     let member = client.put(
//!         &mailchimp_core::member_path(&list_id, "ann@example.com"),
//!         &json!({"email_address": "ann@example.com", "status_if_new": "subscribed"}),
//!     );
//!     if !member.success() {
//!         eprintln!("subscribe failed: {}", member.error());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `MAILCHIMP_API_KEY`: API key (read by `MailchimpClient::from_env`)
//! - `MAILCHIMP_VERIFY_SSL`, `MAILCHIMP_TIMEOUT_SECS`, `MAILCHIMP_ENDPOINT`,
//!   `MAILCHIMP_PROXY`: see `ClientOptions::from_env`

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod response;
pub mod subscriber;
pub mod transport;
pub mod types;

pub use client::{ApiKey, MailchimpClient};
pub use config::ClientOptions;
pub use error::{ClientError, ClientResult, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseSnapshot};
pub use response::{parse_body, Exchange, Outcome};
pub use subscriber::{member_path, subscriber_hash};
pub use transport::{ScriptedTransport, Transport, UreqTransport};
pub use types::{Interest, InterestCategories, InterestCategory, Interests, ListSummary, Lists};
