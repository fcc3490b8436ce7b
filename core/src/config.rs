//! Client options and environment loading.

use std::env;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Endpoint template; `<dc>` is replaced with the key's data center.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://<dc>.api.mailchimp.com/3.0";

/// Placeholder substituted in `ClientOptions::endpoint_template`.
pub const DATA_CENTER_PLACEHOLDER: &str = "<dc>";

/// Per-call timeout used by the verb shortcuts.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("mailchimp-core/", env!("CARGO_PKG_VERSION"));

/// Options fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Verify the server's TLS certificate.
    pub verify_ssl: bool,
    /// Timeout for `get`/`post`/`put`/`patch`/`delete`.
    pub timeout: Duration,
    /// Base endpoint with a `<dc>` placeholder.
    pub endpoint_template: String,
    pub user_agent: String,
    /// Proxy URI, e.g. `http://proxy.local:3128`.
    pub proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl ClientOptions {
    /// Options pointing at a custom endpoint (useful for testing against a
    /// local server).
    pub fn with_endpoint(template: impl Into<String>) -> Self {
        Self {
            endpoint_template: template.into(),
            ..Self::default()
        }
    }

    /// Load options from environment variables.
    ///
    /// - `MAILCHIMP_VERIFY_SSL`: `true`/`false`/`1`/`0`/`yes`/`no`
    /// - `MAILCHIMP_TIMEOUT_SECS`: per-call timeout in seconds
    /// - `MAILCHIMP_ENDPOINT`: endpoint template
    /// - `MAILCHIMP_PROXY`: proxy URI
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup("MAILCHIMP_VERIFY_SSL") {
            options.verify_ssl = parse_bool("MAILCHIMP_VERIFY_SSL", &value)?;
        }
        if let Some(value) = lookup("MAILCHIMP_TIMEOUT_SECS") {
            let secs: u64 = value.trim().parse().map_err(|_| invalid("MAILCHIMP_TIMEOUT_SECS", &value))?;
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup("MAILCHIMP_ENDPOINT").filter(|v| !v.is_empty()) {
            options.endpoint_template = value;
        }
        options.proxy = lookup("MAILCHIMP_PROXY").filter(|v| !v.is_empty());

        Ok(options)
    }

    /// Substitute the data center into the endpoint template.
    pub fn endpoint_for(&self, data_center: &str) -> String {
        self.endpoint_template
            .replace(DATA_CENTER_PLACEHOLDER, data_center)
            .trim_end_matches('/')
            .to_string()
    }
}

fn parse_bool(name: &str, value: &str) -> ClientResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> ClientError {
    ClientError::InvalidConfig {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_verify_ssl_with_ten_second_timeout() {
        let options = ClientOptions::default();
        assert!(options.verify_ssl);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.endpoint_template, DEFAULT_ENDPOINT_TEMPLATE);
        assert!(options.proxy.is_none());
    }

    #[test]
    fn endpoint_substitutes_data_center() {
        let options = ClientOptions::default();
        assert_eq!(options.endpoint_for("us6"), "https://us6.api.mailchimp.com/3.0");
    }

    #[test]
    fn endpoint_without_placeholder_is_used_verbatim() {
        let options = ClientOptions::with_endpoint("http://127.0.0.1:3000/3.0/");
        assert_eq!(options.endpoint_for("us6"), "http://127.0.0.1:3000/3.0");
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let options = ClientOptions::from_lookup(|_| None).unwrap();
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let options = ClientOptions::from_lookup(lookup_from(&[
            ("MAILCHIMP_VERIFY_SSL", "no"),
            ("MAILCHIMP_TIMEOUT_SECS", "30"),
            ("MAILCHIMP_ENDPOINT", "http://localhost:3000/3.0"),
            ("MAILCHIMP_PROXY", "http://proxy.local:3128"),
        ]))
        .unwrap();

        assert!(!options.verify_ssl);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.endpoint_template, "http://localhost:3000/3.0");
        assert_eq!(options.proxy.as_deref(), Some("http://proxy.local:3128"));
    }

    #[test]
    fn malformed_verify_ssl_is_rejected() {
        let err = ClientOptions::from_lookup(lookup_from(&[("MAILCHIMP_VERIFY_SSL", "maybe")])).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig { ref name, .. } if name == "MAILCHIMP_VERIFY_SSL"));
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = ClientOptions::from_lookup(lookup_from(&[("MAILCHIMP_TIMEOUT_SECS", "ten")])).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig { .. }));
    }
}
