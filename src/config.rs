//! Client configuration.
//!
//! Every setting has a default and may be overridden through the environment:
//!
//! | variable                 | default                                  |
//! |--------------------------|------------------------------------------|
//! | `CRI_RUNTIME_ENDPOINT`   | `unix:///run/containerd/containerd.sock` |
//! | `CRI_CONTEXT_TIMEOUT_MS` | `10000`                                  |
//! | `CRI_DIAL_TIMEOUT_MS`    | `10000`                                  |
//! | `CRI_MAX_RECV_MSG_SIZE`  | `16777216`                               |
//! | `CRI_API_VERSION`        | `auto`                                   |
//!
//! `CRI_API_VERSION` accepts `auto` (same as `newest-first`), `oldest-first`,
//! or a single generation such as `v1` or `v1alpha2`.
use std::time::Duration;

use crate::cri::{ApiGeneration, NegotiationPolicy};

pub const DEFAULT_ENDPOINT: &str = "unix:///run/containerd/containerd.sock";
pub const DEFAULT_CONTEXT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RECV_MSG_SIZE: usize = 16 * 1024 * 1024;

const ENV_ENDPOINT: &str = "CRI_RUNTIME_ENDPOINT";
const ENV_CONTEXT_TIMEOUT: &str = "CRI_CONTEXT_TIMEOUT_MS";
const ENV_DIAL_TIMEOUT: &str = "CRI_DIAL_TIMEOUT_MS";
const ENV_MAX_RECV_MSG_SIZE: &str = "CRI_MAX_RECV_MSG_SIZE";
const ENV_API_VERSION: &str = "CRI_API_VERSION";

#[derive(Debug, thiserror::Error)]
#[error("invalid value `{value}` for `{key}`: {reason}")]
pub struct Error {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Runtime socket, `unix:///path` or an absolute path.
    pub endpoint: String,
    /// Bound of the version probe and default bound of every call.
    pub context_timeout: Duration,
    pub dial_timeout: Duration,
    /// Largest response message accepted from the runtime.
    pub max_recv_msg_size: usize,
    pub negotiation: NegotiationPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            context_timeout: DEFAULT_CONTEXT_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            max_recv_msg_size: DEFAULT_MAX_RECV_MSG_SIZE,
            negotiation: NegotiationPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration from `lookup`, falling back to defaults for
    /// unset or empty keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if a key holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.endpoint = endpoint.trim().to_owned();
        }
        if let Some(value) = get(ENV_CONTEXT_TIMEOUT) {
            config.context_timeout = parse_millis(ENV_CONTEXT_TIMEOUT, &value)?;
        }
        if let Some(value) = get(ENV_DIAL_TIMEOUT) {
            config.dial_timeout = parse_millis(ENV_DIAL_TIMEOUT, &value)?;
        }
        if let Some(value) = get(ENV_MAX_RECV_MSG_SIZE) {
            config.max_recv_msg_size = match value.trim().parse::<usize>() {
                Ok(0) => return Err(invalid(ENV_MAX_RECV_MSG_SIZE, &value, "must be positive")),
                Ok(size) => size,
                Err(err) => return Err(invalid(ENV_MAX_RECV_MSG_SIZE, &value, err)),
            };
        }
        if let Some(value) = get(ENV_API_VERSION) {
            config.negotiation = parse_policy(&value)?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Error {
    Error {
        key,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid(key, value, "must be positive")),
        Ok(millis) => Ok(Duration::from_millis(millis)),
        Err(err) => Err(invalid(key, value, err)),
    }
}

fn parse_policy(value: &str) -> Result<NegotiationPolicy> {
    match value.trim() {
        "auto" | "newest-first" => Ok(NegotiationPolicy::NewestFirst),
        "oldest-first" => Ok(NegotiationPolicy::OldestFirst),
        other => other
            .parse::<ApiGeneration>()
            .map(NegotiationPolicy::Only)
            .map_err(|err| invalid(ENV_API_VERSION, value, err)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.context_timeout, Duration::from_secs(10));
        assert_eq!(config.max_recv_msg_size, 16 * 1024 * 1024);
        assert_eq!(config.negotiation, NegotiationPolicy::NewestFirst);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CRI_RUNTIME_ENDPOINT", "unix:///var/run/crio/crio.sock"),
            ("CRI_CONTEXT_TIMEOUT_MS", "2500"),
            ("CRI_DIAL_TIMEOUT_MS", "500"),
            ("CRI_MAX_RECV_MSG_SIZE", "4194304"),
            ("CRI_API_VERSION", "v1alpha2"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "unix:///var/run/crio/crio.sock");
        assert_eq!(config.context_timeout, Duration::from_millis(2500));
        assert_eq!(config.dial_timeout, Duration::from_millis(500));
        assert_eq!(config.max_recv_msg_size, 4_194_304);
        assert_eq!(
            config.negotiation,
            NegotiationPolicy::Only(ApiGeneration::V1Alpha2)
        );
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CRI_RUNTIME_ENDPOINT", ""),
            ("CRI_CONTEXT_TIMEOUT_MS", "  "),
        ]))
        .unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_policy_values() {
        assert_eq!(parse_policy("auto").unwrap(), NegotiationPolicy::NewestFirst);
        assert_eq!(
            parse_policy("oldest-first").unwrap(),
            NegotiationPolicy::OldestFirst
        );
        assert_eq!(
            parse_policy("runtime.v1").unwrap(),
            NegotiationPolicy::Only(ApiGeneration::V1)
        );
        assert!(parse_policy("v2").is_err());
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[("CRI_CONTEXT_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert_eq!(err.key, "CRI_CONTEXT_TIMEOUT_MS");
        assert_eq!(err.value, "soon");

        let err = ClientConfig::from_lookup(lookup(&[("CRI_DIAL_TIMEOUT_MS", "0")])).unwrap_err();
        assert_eq!(err.reason, "must be positive");

        let err =
            ClientConfig::from_lookup(lookup(&[("CRI_MAX_RECV_MSG_SIZE", "-1")])).unwrap_err();
        assert_eq!(err.key, "CRI_MAX_RECV_MSG_SIZE");
    }
}
