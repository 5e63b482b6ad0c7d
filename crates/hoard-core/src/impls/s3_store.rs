//! S3-compatible object store
//!
//! Wraps the AWS SDK for the two calls the uploader needs.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    operation::head_object::HeadObjectError,
    primitives::ByteStream,
    Client,
};

use crate::config::{ConfigError, StoreConfig};
use crate::domain::RemoteKey;
use crate::ports::{ObjectStore, Presence, StoreError};

/// S3 (or S3-compatible) bucket client.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from configuration.
    ///
    /// Static credentials are used only when both halves are configured;
    /// otherwise the SDK's default credential chain applies. Certificates
    /// are always verified; `validate` rejects `verify = false`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        match config.static_credentials() {
            Some((access_key_id, secret_access_key)) => {
                let credentials =
                    Credentials::new(access_key_id, secret_access_key, None, None, "hoard");
                loader = loader.credentials_provider(credentials);
            }
            None => {
                tracing::info!("No static S3 credentials configured, using the default credential chain");
            }
        }

        if let Some(timeout) = config.operation_timeout() {
            loader = loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }

        let sdk_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            // MinIO など S3 互換サービスは path-style が必要
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket: config.bucket.clone(),
        })
    }

    /// Check that the bucket is reachable. Failures are only logged.
    pub async fn probe(&self) -> bool {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", self.bucket);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    self.bucket,
                    DisplayErrorContext(&e)
                );
                false
            }
        }
    }
}

fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

/// Map an SDK failure onto the store error taxonomy.
fn store_error<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> StoreError
where
    E: std::error::Error + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => StoreError::Timeout { operation },
        SdkError::DispatchFailure(failure) if failure.is_timeout() => StoreError::Timeout { operation },
        SdkError::DispatchFailure(_) | SdkError::ConstructionFailure(_) => {
            StoreError::Transport(format!("{operation}: {}", DisplayErrorContext(&err)))
        }
        _ => StoreError::Service {
            status: status_of(&err),
            message: format!("{operation}: {}", DisplayErrorContext(&err)),
        },
    }
}

/// A canonical not-found (modelled `NotFound` or a bare 404) means the object
/// is absent. Every other failure is an error; it must not be read as absent.
fn presence_from_head_error(err: SdkError<HeadObjectError, HttpResponse>) -> Result<Presence, StoreError> {
    let not_found =
        err.as_service_error().is_some_and(|e| e.is_not_found()) || status_of(&err) == Some(404);
    if not_found {
        Ok(Presence::NotFound)
    } else {
        Err(store_error("head_object", err))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head(&self, key: &RemoteKey) -> Result<Presence, StoreError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await;

        match result {
            Ok(_) => Ok(Presence::Found),
            Err(err) => presence_from_head_error(err),
        }
    }

    async fn put(&self, key: &RemoteKey, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| store_error("put_object", err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::NotFound;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use rstest::rstest;

    fn raw_response(status: u16) -> HttpResponse {
        HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    fn generic_error(code: &str) -> HeadObjectError {
        HeadObjectError::generic(ErrorMetadata::builder().code(code).build())
    }

    #[tokio::test]
    async fn connect_rejects_incomplete_config() {
        let err = S3ObjectStore::connect(&StoreConfig::new("", "us-east-1"))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("bucket"));

        let err = S3ObjectStore::connect(&StoreConfig::new("artifacts", ""))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("region"));
    }

    #[tokio::test]
    async fn connect_refuses_to_skip_certificate_checks() {
        let mut config = StoreConfig::new("artifacts", "us-east-1");
        config.verify = false;
        let err = S3ObjectStore::connect(&config).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "verify", .. }));
    }

    #[test]
    fn modelled_not_found_means_absent() {
        let err = SdkError::service_error(HeadObjectError::NotFound(NotFound::builder().build()), raw_response(404));
        assert_eq!(presence_from_head_error(err), Ok(Presence::NotFound));
    }

    #[test]
    fn bare_404_means_absent() {
        let err = SdkError::service_error(generic_error("NoSuchKey"), raw_response(404));
        assert_eq!(presence_from_head_error(err), Ok(Presence::NotFound));
    }

    #[rstest]
    #[case::access_denied("AccessDenied", 403)]
    #[case::internal_error("InternalError", 500)]
    #[case::slow_down("SlowDown", 503)]
    fn other_head_failures_are_errors(#[case] code: &str, #[case] status: u16) {
        let err = SdkError::service_error(generic_error(code), raw_response(status));
        match presence_from_head_error(err) {
            Err(StoreError::Service { status: got, .. }) => assert_eq!(got, Some(status)),
            other => panic!("expected a service error, got {other:?}"),
        }
    }

    #[test]
    fn head_timeout_is_an_error_not_absence() {
        let err = SdkError::<HeadObjectError, HttpResponse>::timeout_error("too slow");
        assert_eq!(
            presence_from_head_error(err),
            Err(StoreError::Timeout { operation: "head_object" })
        );
    }

    #[test]
    fn sdk_timeout_maps_to_timeout() {
        let err = SdkError::<HeadObjectError, HttpResponse>::timeout_error("too slow");
        assert_eq!(
            store_error("head_object", err),
            StoreError::Timeout { operation: "head_object" }
        );
    }

    #[test]
    fn construction_failure_maps_to_transport() {
        let err = SdkError::<HeadObjectError, HttpResponse>::construction_failure("bad request");
        assert!(matches!(store_error("head_object", err), StoreError::Transport(_)));
    }
}
