//! Configuration for the object store target and the uploader.

use serde::Deserialize;
use std::time::Duration;

/// Errors detected before any network call is made.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn default_verify() -> bool {
    true
}

/// Where artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Verify TLS certificates of the endpoint. Only `true` is accepted;
    /// the S3 client always verifies certificates.
    #[serde(default = "default_verify")]
    pub verify: bool,

    /// Static credentials; used only when both halves are set.
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Upper bound for each existence check / write.
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            endpoint: None,
            verify: default_verify(),
            access_key_id: None,
            secret_access_key: None,
            operation_timeout_secs: None,
        }
    }
}

impl StoreConfig {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sub-second remainders round up to the next whole second.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.operation_timeout_secs = Some(secs);
        self
    }

    /// Fail fast on a config that cannot target a store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Missing("bucket"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing("region"));
        }
        if let Some(endpoint) = &self.endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "endpoint",
                reason: format!("expected an http(s) URL, got {endpoint:?}"),
            });
        }
        if !self.verify {
            return Err(ConfigError::Invalid {
                field: "verify",
                reason: "disabling TLS certificate verification is not supported; \
                         use an http:// endpoint for plain-text test stores"
                    .to_string(),
            });
        }
        if self.operation_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "operation_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Static credentials, if both halves are present and non-empty.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (self.access_key_id.as_deref(), self.secret_access_key.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

fn default_single_flight() -> bool {
    true
}

/// Behaviour of the upload coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploaderConfig {
    /// Serialize concurrent uploads of the same key inside this process.
    #[serde(default = "default_single_flight")]
    pub single_flight: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            single_flight: default_single_flight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn valid_config_passes() {
        let cfg = StoreConfig::new("artifacts", "eu-west-1");
        assert_eq!(cfg.validate(), Ok(()));
        assert!(cfg.verify);
    }

    #[rstest]
    #[case::no_bucket("", "eu-west-1", "bucket")]
    #[case::blank_bucket("  ", "eu-west-1", "bucket")]
    #[case::no_region("artifacts", "", "region")]
    fn missing_target_is_fatal(#[case] bucket: &str, #[case] region: &str, #[case] field: &str) {
        let cfg = StoreConfig::new(bucket, region);
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(f)) if f == field));
    }

    #[test]
    fn endpoint_must_be_http_url() {
        let cfg = StoreConfig::new("artifacts", "us-east-1").with_endpoint("localhost:9000");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "endpoint", .. })
        ));

        let cfg = StoreConfig::new("artifacts", "us-east-1").with_endpoint("http://localhost:9000");
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = StoreConfig::new("artifacts", "us-east-1").with_operation_timeout(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[rstest]
    #[case::half_second(Duration::from_millis(500), 1)]
    #[case::whole(Duration::from_secs(30), 30)]
    #[case::just_over(Duration::from_millis(30_001), 31)]
    fn sub_second_timeouts_round_up(#[case] timeout: Duration, #[case] secs: u64) {
        let cfg = StoreConfig::new("artifacts", "us-east-1").with_operation_timeout(timeout);
        assert_eq!(cfg.operation_timeout_secs, Some(secs));
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn disabling_tls_verification_is_rejected() {
        let mut cfg = StoreConfig::new("artifacts", "us-east-1").with_endpoint("https://minio.local:9000");
        cfg.verify = false;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "verify", .. })
        ));
    }

    #[rstest]
    #[case::both(Some("id"), Some("secret"), true)]
    #[case::only_id(Some("id"), None, false)]
    #[case::only_secret(None, Some("secret"), false)]
    #[case::empty_secret(Some("id"), Some(""), false)]
    #[case::neither(None, None, false)]
    fn static_credentials_need_both_halves(
        #[case] id: Option<&str>,
        #[case] secret: Option<&str>,
        #[case] expected: bool,
    ) {
        let mut cfg = StoreConfig::new("artifacts", "us-east-1");
        cfg.access_key_id = id.map(str::to_string);
        cfg.secret_access_key = secret.map(str::to_string);
        assert_eq!(cfg.static_credentials().is_some(), expected);
    }

    #[test]
    fn store_config_deserializes_with_defaults() {
        let cfg: StoreConfig =
            serde_json::from_str(r#"{"bucket":"artifacts","region":"us-east-1"}"#).unwrap();
        assert!(cfg.verify);
        assert_eq!(cfg.endpoint, None);
        assert_eq!(cfg.operation_timeout(), None);

        let cfg: StoreConfig = serde_json::from_str(
            r#"{"bucket":"a","region":"r","verify":false,"operation_timeout_secs":30}"#,
        )
        .unwrap();
        assert!(!cfg.verify);
        assert_eq!(cfg.operation_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn uploader_config_defaults_to_single_flight() {
        assert!(UploaderConfig::default().single_flight);
        let cfg: UploaderConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.single_flight);
    }
}
