//! Error types for the Mailchimp API client.
//!
//! # Design
//! Only construction and configuration problems are raised as `Err`. Once a
//! client exists, every call produces an `Exchange` whose `Outcome` carries
//! API errors and transport failures as data, so callers inspect the result
//! instead of matching on an error type.

use thiserror::Error;

/// Errors returned while building a `MailchimpClient` or its options.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No API key was supplied.
    #[error("Mailchimp API key is missing")]
    MissingCredential,

    /// The API key has no `-<data center>` suffix.
    #[error("Mailchimp API key is not valid: {0}")]
    InvalidCredential(String),

    /// The HTTP transport could not be set up.
    #[error("HTTP transport unavailable: {0}")]
    TransportUnavailable(String),

    /// An option read from the environment could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidConfig { name: String, value: String },
}

/// A network-level failure reported by a `Transport`.
///
/// Holds the transport's own description (TLS failure, timeout, refused
/// connection). The client records it in `Outcome::Transport`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Result type for client construction.
pub type ClientResult<T> = Result<T, ClientError>;
