use serde::{Deserialize, Serialize};

/// Which store backs the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    /// Process-local object store; contents are lost on exit
    Memory,
    /// S3 bucket written with e-tag conditional puts
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        allow_http: bool,
    },
}

impl StoreConfig {
    pub fn s3(
        bucket: impl Into<String>,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        allow_http: bool,
    ) -> Self {
        Self::S3 {
            bucket: bucket.into(),
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            allow_http,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "memory".to_string());

        match backend.as_str() {
            "memory" => Ok(Self::Memory),
            "s3" => {
                let bucket = lookup("AWS_BUCKET")
                    .ok_or_else(|| anyhow::anyhow!("AWS_BUCKET is required for S3 backend"))?;
                let allow_http = lookup("AWS_ALLOW_HTTP")
                    .unwrap_or_else(|| "false".to_string())
                    .parse::<bool>()
                    .unwrap_or(false);

                Ok(Self::s3(
                    bucket,
                    lookup("AWS_REGION"),
                    lookup("AWS_ENDPOINT"),
                    lookup("AWS_ACCESS_KEY_ID"),
                    lookup("AWS_SECRET_ACCESS_KEY"),
                    allow_http,
                ))
            }
            _ => anyhow::bail!(
                "Unknown store backend: {}. Must be 'memory' or 's3'",
                backend
            ),
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
    fn test_defaults_to_memory() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::Memory);
    }

    #[test]
    fn test_s3_requires_bucket() {
        let result = StoreConfig::from_lookup(lookup(&[("STORE_BACKEND", "s3")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_s3_settings() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "s3"),
            ("AWS_BUCKET", "events"),
            ("AWS_ENDPOINT", "http://localhost:9000"),
            ("AWS_ALLOW_HTTP", "true"),
        ]))
        .unwrap();

        assert_eq!(
            config,
            StoreConfig::s3(
                "events",
                None,
                Some("http://localhost:9000".to_string()),
                None,
                None,
                true,
            )
        );
    }

    #[test]
    fn test_unknown_backend() {
        let result = StoreConfig::from_lookup(lookup(&[("STORE_BACKEND", "local")]));
        assert!(result.is_err());
    }
}
