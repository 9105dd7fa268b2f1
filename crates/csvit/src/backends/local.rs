// ai
//! 📂 Local files. The backend with the fewest excuses.
//!
//! The file didn't exist. Or it did, and the permissions said no. Either way
//! the filesystem's verdict is passed through as-is, classified, and the
//! next invocation gets to try again from scratch. 🦆

use std::path::PathBuf;

use serde::Deserialize;
use tokio::fs::File;

use crate::backends::ByteStream;
use crate::error::{AcquisitionFailure, NodeError};

/// 📂 Where on disk the CSV lives.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LocalSourceConfig {
    #[serde(alias = "filePath")]
    pub file_path: PathBuf,
}

impl LocalSourceConfig {
    pub fn label(&self) -> String {
        self.file_path.display().to_string()
    }
}

/// 🚪 Open the file for async reading.
pub(crate) async fn open(config: &LocalSourceConfig) -> Result<ByteStream, NodeError> {
    let label = config.label();
    let file_handle = match File::open(&config.file_path).await {
        Ok(file_handle) => file_handle,
        Err(err) => {
            let kind = AcquisitionFailure::from_io_kind(err.kind());
            let cause = anyhow::Error::new(err).context(format!(
                "💀 The door to '{label}' would not budge. We checked if it existed \
                 (it might not). We checked permissions (they might be wrong)."
            ));
            return Err(NodeError::acquisition(label, kind, cause));
        }
    };
    Ok(Box::new(file_handle))
}
