// ai
//! 🪣 S3 — the CSV lives in a bucket, and the bucket lives in a region.
//!
//! EXT. AWS CONSOLE — NIGHT. Someone typed `PUT` once and walked away.
//! The object has been waiting. We bring static keys, a region, and exactly
//! one `GetObject`. The body streams straight into the decoder without ever
//! being fully downloaded first.
//!
//! 🧠 Knowledge graph:
//! - Credentials come pre-resolved from the host (`awsS3` bundle): key id, secret, region
//! - Transport: `GetObject` → `ByteStream::into_async_read()` → boxed `AsyncRead`
//! - SDK retries are switched OFF: failures propagate, the host decides what happens next
//! - `endpoint_url` (optional) points the client at an S3-compatible store, path-style

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use serde::Deserialize;
use tracing::debug;

use crate::backends::ByteStream;
use crate::error::{AcquisitionFailure, NodeError};

/// 🔑 The `awsS3` credential bundle.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct S3Credentials {
    #[serde(alias = "accessKeyId")]
    pub access_key_id: String,
    #[serde(alias = "secretAccessKey")]
    pub secret_access_key: String,
    /// 🌎 defaults to "us-east-1", where data goes to retire
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// 🔧 Optional S3-compatible endpoint (MinIO, LocalStack, a mock server in tests)
    #[serde(default, alias = "endpointUrl")]
    pub endpoint_url: Option<String>,
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

impl S3Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            endpoint_url: None,
        }
    }
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// 🪣 Which object to stream, and with whose keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3SourceConfig {
    pub bucket: String,
    pub key: String,
    pub credentials: S3Credentials,
}

impl S3SourceConfig {
    pub fn label(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

fn classify(err: &SdkError<GetObjectError, HttpResponse>) -> AcquisitionFailure {
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => AcquisitionFailure::Network,
        SdkError::ServiceError(service) => {
            if service.err().is_no_such_key() {
                AcquisitionFailure::NotFound
            } else {
                AcquisitionFailure::from_http_status(service.raw().status().as_u16())
            }
        }
        _ => AcquisitionFailure::Other,
    }
}

async fn client_for(credentials: &S3Credentials) -> aws_sdk_s3::Client {
    let static_credentials = Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        None,
        None,
        "csvit-node-credentials",
    );
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(credentials.region.clone()))
        .credentials_provider(static_credentials)
        .retry_config(RetryConfig::disabled())
        .load()
        .await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &credentials.endpoint_url {
        s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(s3_config.build())
}

/// 🚪 Issue the `GetObject` and hand back its body as a stream.
pub(crate) async fn open(config: &S3SourceConfig) -> Result<ByteStream, NodeError> {
    let label = config.label();
    let client = client_for(&config.credentials).await;

    let response = client
        .get_object()
        .bucket(&config.bucket)
        .key(&config.key)
        .send()
        .await
        .map_err(|err| {
            let kind = classify(&err);
            let context = format!(
                "💀 GetObject failed for {label}: {}. Check: bucket name, key path, region, and credentials.",
                DisplayErrorContext(&err)
            );
            NodeError::acquisition(&label, kind, anyhow::Error::new(err).context(context))
        })?;

    debug!(
        "🪣 {label} opened, content length {:?}",
        response.content_length()
    );
    Ok(Box::new(response.body.into_async_read()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, key: &str) -> S3SourceConfig {
        S3SourceConfig {
            bucket: "rows".to_string(),
            key: key.to_string(),
            credentials: S3Credentials {
                endpoint_url: Some(server.uri()),
                ..S3Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI", "eu-west-1")
            },
        }
    }

    #[tokio::test]
    async fn the_one_where_the_bucket_hands_over_the_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows/exports/data.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
            .expect(1)
            .mount(&server)
            .await;

        let mut stream = open(&config_for(&server, "exports/data.csv"))
            .await
            .expect("💀 the mock bucket should have cooperated");
        let mut contents = String::new();
        stream
            .read_to_string(&mut contents)
            .await
            .expect("💀 the object body fell over");
        assert_eq!(contents, "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn the_one_where_a_missing_key_is_not_found_and_asked_only_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(
                        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                         <Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>",
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = match open(&config_for(&server, "nope.csv")).await {
            Ok(_) => panic!("💀 a missing key produced a stream"),
            Err(err) => err,
        };
        assert_eq!(err.acquisition_failure(), Some(AcquisitionFailure::NotFound));
        assert!(err.to_string().contains("s3://rows/nope.csv"));
    }

    #[tokio::test]
    async fn the_one_where_forbidden_means_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(
                        "<Error><Code>InvalidAccessKeyId</Code><Message>nope</Message></Error>",
                    ),
            )
            .mount(&server)
            .await;

        let err = match open(&config_for(&server, "data.csv")).await {
            Ok(_) => panic!("💀 a 403 produced a stream"),
            Err(err) => err,
        };
        assert_eq!(err.acquisition_failure(), Some(AcquisitionFailure::Auth));
    }

    #[test]
    fn the_one_where_region_defaults_to_the_florida_of_aws() {
        let credentials: S3Credentials =
            serde_json::from_str(r#"{ "accessKeyId": "AK", "secretAccessKey": "SK" }"#)
                .expect("💀 camelCase credential bundle should parse");
        assert_eq!(credentials.region, "us-east-1");
        assert!(credentials.endpoint_url.is_none());
        assert!(!format!("{credentials:?}").contains("SK\""));
    }
}
