use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::{DEFAULT_EVENT_TTL, StorageOptions};
use crate::storage::{DEFAULT_PREFIX, StoreConfig};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Process settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub bind_address: SocketAddr,
    pub key_prefix: String,
    /// `None` when `EVENT_TTL_SECONDS=0`
    pub ttl: Option<Duration>,
    pub request_timeout: Duration,
    pub store: StoreConfig,
}

impl RegistryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDRESS must be a socket address")?;

        let key_prefix = lookup("REGISTRY_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let ttl = match lookup("EVENT_TTL_SECONDS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .context("EVENT_TTL_SECONDS must be a whole number of seconds")?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(DEFAULT_EVENT_TTL),
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .context("REQUEST_TIMEOUT_MS must be a whole number of milliseconds")?,
            ),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            bind_address,
            key_prefix,
            ttl,
            request_timeout,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }

    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            key_prefix: self.key_prefix.clone(),
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.key_prefix, "/registry");
        assert_eq!(config.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.storage_options(), StorageOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = RegistryConfig::from_lookup(lookup(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("REGISTRY_PREFIX", ""),
            ("EVENT_TTL_SECONDS", "60"),
            ("REQUEST_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.key_prefix, "");
        assert_eq!(config.ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = RegistryConfig::from_lookup(lookup(&[("EVENT_TTL_SECONDS", "0")])).unwrap();
        assert_eq!(config.ttl, None);
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(RegistryConfig::from_lookup(lookup(&[("BIND_ADDRESS", "nowhere")])).is_err());
        assert!(RegistryConfig::from_lookup(lookup(&[("EVENT_TTL_SECONDS", "1h")])).is_err());
        assert!(RegistryConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_MS", "-5")])).is_err());
    }
}
