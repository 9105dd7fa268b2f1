//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::parameters::{Credentials, NodeParameters};

/// 📦 Everything a host needs to run one CSV Iterator node: its parameters,
/// the credential bundles it may ask for, and a couple of host-side knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🎛️ the node's own configuration surface
    pub node: NodeParameters,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🧵 Host-side knobs. The node never reads these; the loop around it does.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 🏷️ identity of the node instance in the context store
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// 🛑 stop after this many invocations even if the node never says done
    #[serde(default)]
    pub max_invocations: Option<u64>,
}

fn default_node_id() -> String {
    "csv-iterator".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            max_invocations: None,
        }
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`CSVIT_*`, nested keys split on `__`, e.g.
/// `CSVIT_NODE__FILE_PATH`) with an optional TOML file. TOML wins on conflicts.
///
/// 📐 If `config_file_name` is None → env vars only. If Some → env vars + TOML, merged.
///
/// 💀 Returns an error if config is unparseable, with a message that says which layer to blame.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CSVIT_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CSVIT_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CSVIT_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::SourceKind;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create test config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        file
    }

    #[test]
    fn the_one_where_an_s3_node_and_its_credentials_move_in_together() {
        let config_file = write_test_config(
            r#"
            [runtime]
            node_id = "orders-csv"
            max_invocations = 50

            [node]
            source = "s3"
            bucket = "exports"
            key = "orders.csv"
            delay = 100

            [node.csv_options]
            delimiter = ";"
            has_header = false

            [credentials.aws_s3]
            access_key_id = "AKID"
            secret_access_key = "SECRET"
            region = "eu-west-1"
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 S3 config should parse. The schema drift goblin does not get this win.");

        assert_eq!(app_config.runtime.node_id, "orders-csv");
        assert_eq!(app_config.runtime.max_invocations, Some(50));
        assert_eq!(app_config.node.source_kind().ok(), Some(SourceKind::S3));
        assert_eq!(app_config.node.delay, 100);
        assert_eq!(app_config.node.csv_options.delimiter, ";");
        assert!(!app_config.node.csv_options.has_header);
        assert!(app_config.node.csv_options.skip_empty_lines);
        let s3 = app_config
            .credentials
            .aws_s3
            .expect("💀 the awsS3 bundle went missing in transit");
        assert_eq!(s3.region, "eu-west-1");
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let config_file = write_test_config(
            r#"
            [node]
            file_path = "rows.csv"
            "#,
        );

        let app_config: AppConfig = Figment::new()
            .merge(Toml::file(config_file.path()))
            .extract()
            .expect("💀 Defaults should fill the gaps. Serde left us on read otherwise.");

        assert_eq!(app_config.runtime, RuntimeConfig::default());
        assert_eq!(app_config.node.source, "local");
        assert_eq!(app_config.node.delay, 0);
        assert_eq!(app_config.node.csv_options.delimiter, ",");
        assert!(app_config.node.csv_options.has_header);
        assert!(app_config.credentials.google_drive_oauth2.is_none());
    }

    #[test]
    fn the_one_where_camel_case_keys_from_the_node_editor_still_work() {
        let config_file = write_test_config(
            r#"
            [node]
            source = "googleDrive"
            fileId = "1AbC"

            [node.csvOptions]
            skipEmptyLines = false

            [credentials.googleDriveOAuth2Api]
            clientId = "id"
            clientSecret = "secret"
            redirectUri = "http://localhost/cb"
            accessToken = "ya29"
            refreshToken = "1//r"
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 camelCase aliases should parse. The witness protection paperwork was valid.");

        assert_eq!(app_config.node.file_id.as_deref(), Some("1AbC"));
        assert!(!app_config.node.csv_options.skip_empty_lines);
        let drive = app_config
            .credentials
            .google_drive_oauth2
            .expect("💀 the Drive bundle went missing in transit");
        assert_eq!(drive.client_id, "id");
        assert_eq!(drive.refresh_token, "1//r");
        assert_eq!(drive.api_base_url, "https://www.googleapis.com/drive/v3");
    }

    #[test]
    fn the_one_where_a_missing_node_table_is_a_loud_failure() {
        let config_file = write_test_config(
            r#"
            [runtime]
            node_id = "lonely"
            "#,
        );

        let err = Figment::new()
            .merge(Toml::file(config_file.path()))
            .extract::<AppConfig>();
        assert!(err.is_err());
    }
}
