// ai
//! 🎛️ Node parameters — the per-instance configuration surface.
//!
//! The host sets these once per run. We read them every invocation, but only
//! turn them into a `SourceDescriptor` when there is no open stream yet.
//!
//! 🧠 Knowledge graph:
//! - `source` stays a raw string on purpose: "ftp" must surface as `UnsupportedSource`
//!   naming "ftp", not as a serde "unknown variant" buried in a figment error
//! - Keys are snake_case with camelCase aliases, so both `file_path` and `filePath` work
//! - `Credentials` is the host's pre-resolved bundle; we only read the fields we need

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::backends::{
    GoogleDriveCredentials, GoogleDriveSourceConfig, LocalSourceConfig, S3Credentials,
    S3SourceConfig, SourceDescriptor,
};
use crate::decoder::CsvOptions;
use crate::error::NodeError;

/// 🏷️ The three source kinds this node understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    GoogleDrive,
    S3,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::GoogleDrive => "googleDrive",
            Self::S3 => "s3",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = NodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Self::Local),
            "googleDrive" | "google_drive" => Ok(Self::GoogleDrive),
            "s3" => Ok(Self::S3),
            other => Err(NodeError::UnsupportedSource {
                source_kind: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 🎛️ Everything one CSV Iterator node instance is configured with.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeParameters {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, alias = "filePath")]
    pub file_path: Option<PathBuf>,
    #[serde(default, alias = "fileId")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    /// ⏱️ pause after each emitted row, in milliseconds
    #[serde(default)]
    pub delay: u64,
    #[serde(default, alias = "csvOptions")]
    pub csv_options: CsvOptions,
}

fn default_source() -> String {
    SourceKind::Local.as_str().to_string()
}

impl Default for NodeParameters {
    fn default() -> Self {
        Self {
            source: default_source(),
            file_path: None,
            file_id: None,
            bucket: None,
            key: None,
            delay: 0,
            csv_options: CsvOptions::default(),
        }
    }
}

/// 🔑 Credential bundles the host resolved before calling us.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default, alias = "googleDriveOAuth2Api")]
    pub google_drive_oauth2: Option<GoogleDriveCredentials>,
    #[serde(default, alias = "awsS3")]
    pub aws_s3: Option<S3Credentials>,
}

fn required_text(value: &Option<String>, parameter: &str, kind: SourceKind) -> Result<String, NodeError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(NodeError::missing(parameter, kind.as_str())),
    }
}

impl NodeParameters {
    /// 🏷️ Parse `source` into a known kind, or fail with `UnsupportedSource`.
    pub fn source_kind(&self) -> Result<SourceKind, NodeError> {
        self.source.trim().parse()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    /// 🎭 Build the descriptor for the configured source.
    ///
    /// 💀 `UnsupportedSource` for unknown kinds, `Configuration` for missing
    /// parameters or credentials. Touches nothing but `self`.
    pub fn source_descriptor(&self, credentials: &Credentials) -> Result<SourceDescriptor, NodeError> {
        let kind = self.source_kind()?;
        match kind {
            SourceKind::Local => {
                let file_path = self
                    .file_path
                    .as_ref()
                    .filter(|path| !path.as_os_str().is_empty())
                    .ok_or_else(|| NodeError::missing("filePath", kind.as_str()))?;
                Ok(SourceDescriptor::Local(LocalSourceConfig {
                    file_path: file_path.clone(),
                }))
            }
            SourceKind::GoogleDrive => {
                let file_id = required_text(&self.file_id, "fileId", kind)?;
                let credentials = credentials.google_drive_oauth2.clone().ok_or_else(|| {
                    NodeError::Configuration(
                        "source 'googleDrive' requires googleDriveOAuth2Api credentials".to_string(),
                    )
                })?;
                Ok(SourceDescriptor::GoogleDrive(GoogleDriveSourceConfig {
                    file_id,
                    credentials,
                }))
            }
            SourceKind::S3 => {
                let bucket = required_text(&self.bucket, "bucket", kind)?;
                let key = required_text(&self.key, "key", kind)?;
                let credentials = credentials.aws_s3.clone().ok_or_else(|| {
                    NodeError::Configuration("source 's3' requires awsS3 credentials".to_string())
                })?;
                Ok(SourceDescriptor::S3(S3SourceConfig {
                    bucket,
                    key,
                    credentials,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_ftp_is_politely_shown_the_door() {
        let parameters = NodeParameters {
            source: "ftp".to_string(),
            ..NodeParameters::default()
        };
        match parameters.source_descriptor(&Credentials::default()) {
            Err(NodeError::UnsupportedSource { source_kind }) => assert_eq!(source_kind, "ftp"),
            other => panic!("💀 expected UnsupportedSource, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_local_needs_a_path() {
        let parameters = NodeParameters::default();
        assert!(matches!(
            parameters.source_descriptor(&Credentials::default()),
            Err(NodeError::Configuration(_))
        ));
    }

    #[test]
    fn the_one_where_s3_without_credentials_is_a_configuration_error() {
        let parameters = NodeParameters {
            source: "s3".to_string(),
            bucket: Some("rows".to_string()),
            key: Some("data.csv".to_string()),
            ..NodeParameters::default()
        };
        assert!(matches!(
            parameters.source_descriptor(&Credentials::default()),
            Err(NodeError::Configuration(_))
        ));
    }

    #[test]
    fn the_one_where_blank_strings_count_as_missing() {
        let parameters = NodeParameters {
            source: "googleDrive".to_string(),
            file_id: Some("   ".to_string()),
            ..NodeParameters::default()
        };
        let credentials = Credentials {
            google_drive_oauth2: Some(GoogleDriveCredentials::default()),
            aws_s3: None,
        };
        match parameters.source_descriptor(&credentials) {
            Err(NodeError::Configuration(message)) => assert!(message.contains("fileId")),
            other => panic!("💀 expected a Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_a_full_s3_setup_becomes_a_descriptor() {
        let parameters = NodeParameters {
            source: "s3".to_string(),
            bucket: Some("rows".to_string()),
            key: Some("2024/data.csv".to_string()),
            ..NodeParameters::default()
        };
        let credentials = Credentials {
            google_drive_oauth2: None,
            aws_s3: Some(S3Credentials::new("AK", "SK", "eu-central-1")),
        };
        match parameters.source_descriptor(&credentials) {
            Ok(SourceDescriptor::S3(s3)) => {
                assert_eq!(s3.bucket, "rows");
                assert_eq!(s3.key, "2024/data.csv");
                assert_eq!(s3.credentials.region, "eu-central-1");
            }
            other => panic!("💀 expected an S3 descriptor, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_the_camel_case_surface_deserializes() {
        let parameters: NodeParameters = serde_json::from_str(
            r#"{
                "source": "googleDrive",
                "fileId": "abc",
                "delay": 250,
                "csvOptions": { "delimiter": ";", "skipEmptyLines": false }
            }"#,
        )
        .expect("💀 the camelCase surface should parse");
        assert_eq!(parameters.source_kind().ok(), Some(SourceKind::GoogleDrive));
        assert_eq!(parameters.file_id.as_deref(), Some("abc"));
        assert_eq!(parameters.delay(), Duration::from_millis(250));
        assert_eq!(parameters.csv_options.delimiter, ";");
        assert!(parameters.csv_options.has_header);
        assert!(!parameters.csv_options.skip_empty_lines);
    }

    #[test]
    fn the_one_where_negative_delays_do_not_sneak_in() {
        let result = serde_json::from_str::<NodeParameters>(r#"{ "delay": -5 }"#);
        assert!(result.is_err());
    }
}
