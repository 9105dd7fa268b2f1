//! 🔌 Backends — where the bytes come from.
//!
//! 🚰 Every backend does exactly one thing: open ONE byte stream and hand it
//! over. No parsing. No buffering. No opinions about commas. The decoder
//! downstream does the thinking; we just turn the tap.
//!
//! 🎭 Local disk, Google Drive, S3. Three origin stories, one `ByteStream`.
//! Adding a fourth means a new `SourceDescriptor` variant and one more match
//! arm in `BackendResolver`. The decoder and the controller never find out.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::NodeError;

pub mod google_drive;
pub mod local;
pub mod s3;

pub use google_drive::{GoogleDriveCredentials, GoogleDriveSourceConfig};
pub use local::LocalSourceConfig;
pub use s3::{S3Credentials, S3SourceConfig};

/// 🚿 One open, readable byte stream. Type-erased because three backends
/// produce three different reader types and the decoder cares about none of them.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// 🎭 The closed set of places a CSV can live.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    Local(LocalSourceConfig),
    GoogleDrive(GoogleDriveSourceConfig),
    S3(S3SourceConfig),
}

impl SourceDescriptor {
    /// 🏷️ Human-readable location, used in logs and error messages.
    pub fn label(&self) -> String {
        match self {
            SourceDescriptor::Local(local) => local.label(),
            SourceDescriptor::GoogleDrive(drive) => drive.label(),
            SourceDescriptor::S3(s3) => s3.label(),
        }
    }
}

/// 🚰 Turns a descriptor into an open stream.
///
/// # Contract
/// - Exactly one stream is opened per successful call. The caller owns it. Closing it is
///   the caller's business (dropping it is closing it).
/// - Failures come back as `NodeError`, never retried here.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, descriptor: &SourceDescriptor) -> Result<ByteStream, NodeError>;
}

/// 🔌 The real resolver: local filesystem, Drive over HTTPS, S3 via the AWS SDK.
#[derive(Debug, Clone, Default)]
pub struct BackendResolver {
    // 📡 shared connection pool for Drive and its token endpoint
    http: reqwest::Client,
}

impl BackendResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceResolver for BackendResolver {
    async fn resolve(&self, descriptor: &SourceDescriptor) -> Result<ByteStream, NodeError> {
        debug!("🚪 opening byte stream from {}", descriptor.label());
        match descriptor {
            SourceDescriptor::Local(local) => local::open(local).await,
            SourceDescriptor::GoogleDrive(drive) => google_drive::open(&self.http, drive).await,
            SourceDescriptor::S3(s3) => s3::open(s3).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquisitionFailure;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn the_one_where_a_local_file_pours_its_bytes() {
        let mut file = tempfile::NamedTempFile::new().expect("💀 temp file refused to exist");
        file.write_all(b"a,b\n1,2\n").expect("💀 temp file refused to be written");

        let descriptor = SourceDescriptor::Local(LocalSourceConfig {
            file_path: file.path().to_path_buf(),
        });
        let mut stream = BackendResolver::new()
            .resolve(&descriptor)
            .await
            .expect("💀 the file is right there");
        let mut contents = String::new();
        stream
            .read_to_string(&mut contents)
            .await
            .expect("💀 read failed");
        assert_eq!(contents, "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn the_one_where_a_missing_file_is_reported_as_not_found() {
        let descriptor = SourceDescriptor::Local(LocalSourceConfig {
            file_path: "/definitely/not/here/rows.csv".into(),
        });
        let err = match BackendResolver::new().resolve(&descriptor).await {
            Ok(_) => panic!("💀 a file that doesn't exist just opened. call an exorcist."),
            Err(err) => err,
        };
        assert_eq!(err.acquisition_failure(), Some(AcquisitionFailure::NotFound));
        assert!(err.to_string().contains("/definitely/not/here/rows.csv"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn the_one_where_a_locked_file_is_reported_as_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let file = tempfile::NamedTempFile::new().expect("💀 temp file refused to exist");
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o000))
            .expect("💀 chmod 000 refused");
        // -- 👑 root walks through mode 000 like it isn't there; nothing to prove then
        if std::fs::File::open(file.path()).is_ok() {
            return;
        }

        let descriptor = SourceDescriptor::Local(LocalSourceConfig {
            file_path: file.path().to_path_buf(),
        });
        let err = match BackendResolver::new().resolve(&descriptor).await {
            Ok(_) => panic!("💀 mode 000 opened anyway"),
            Err(err) => err,
        };
        assert_eq!(
            err.acquisition_failure(),
            Some(AcquisitionFailure::PermissionDenied)
        );
    }

    #[test]
    fn the_one_where_labels_say_where_the_bytes_live() {
        let s3 = SourceDescriptor::S3(S3SourceConfig {
            bucket: "rows".to_string(),
            key: "2024/data.csv".to_string(),
            credentials: S3Credentials::new("AKID", "SECRET", "eu-west-1"),
        });
        assert_eq!(s3.label(), "s3://rows/2024/data.csv");

        let drive = SourceDescriptor::GoogleDrive(GoogleDriveSourceConfig {
            file_id: "abc123".to_string(),
            credentials: GoogleDriveCredentials::default(),
        });
        assert_eq!(drive.label(), "gdrive://abc123");
    }
}
