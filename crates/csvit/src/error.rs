// ai
//! 💀 Errors — the five stages of node grief, as a closed enum.
//!
//! The host engine gets exactly one of these back when an invocation fails,
//! and then it decides whether to page someone. We do not retry. We do not
//! back off. We report, with feeling, and let the grown-ups decide. 🦆
//!
//! 🧠 Knowledge graph:
//! - `UnsupportedSource` / `Configuration`: raised BEFORE the context slot is touched
//! - `SourceAcquisition`: the resolver could not open the stream; nothing was cached,
//!   so the next invocation starts from scratch
//! - `Decode`: a row the relaxed policy cannot save (fields that are not UTF-8)
//! - `StreamInterrupted`: the stream opened fine and then died mid-read
//! - `InvocationError`: the above, plus WHICH node instance was having a bad day

use std::fmt;
use std::io;

use thiserror::Error;

/// 🏷️ Why the resolver came back empty-handed.
///
/// Classified once at the backend boundary so callers (and tests) can match on
/// the flavor of failure without string-sniffing an `anyhow` chain at 3am.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionFailure {
    /// 🔍 file path, Drive file id, bucket or key does not exist
    NotFound,
    /// 🔒 the filesystem said no
    PermissionDenied,
    /// 🔑 credentials rejected, expired, or missing the right scopes
    Auth,
    /// 📡 could not even reach the thing
    Network,
    /// 🤷 everything else
    Other,
}

impl fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let the_label = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::Auth => "authentication failed",
            Self::Network => "network failure",
            Self::Other => "failed",
        };
        f.write_str(the_label)
    }
}

impl AcquisitionFailure {
    /// 📂 Maps a filesystem error onto the acquisition taxonomy.
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut => Self::Network,
            _ => Self::Other,
        }
    }

    /// 📡 Maps an HTTP status code onto the acquisition taxonomy.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            404 => Self::NotFound,
            _ => Self::Other,
        }
    }
}

/// 💀 Everything that can go wrong inside one node invocation.
#[derive(Debug, Error)]
pub enum NodeError {
    /// 🚫 `source` was not one of `local`, `googleDrive`, `s3`.
    #[error("Source {source_kind} is not supported")]
    UnsupportedSource { source_kind: String },

    /// 🔧 A required parameter or credential for the chosen source is missing or invalid.
    #[error("Invalid node configuration: {0}")]
    Configuration(String),

    /// 🚪 The resolver could not open the byte stream.
    #[error("Could not open {source_label}: {kind}")]
    SourceAcquisition {
        source_label: String,
        kind: AcquisitionFailure,
        #[source]
        cause: anyhow::Error,
    },

    /// 🧩 Malformed CSV the relaxed column-count policy cannot save.
    #[error("Malformed CSV at line {line}: {message}")]
    Decode { line: u64, message: String },

    /// 📉 The stream was open, then it wasn't.
    #[error("Stream interrupted while reading records: {0}")]
    StreamInterrupted(#[source] io::Error),
}

impl NodeError {
    /// 🔧 Shorthand for the most common config complaint.
    pub(crate) fn missing(parameter: &str, source_kind: &str) -> Self {
        Self::Configuration(format!(
            "parameter '{parameter}' is required when source is '{source_kind}'"
        ))
    }

    /// 🚪 Shorthand for wrapping a backend failure with its classification.
    pub(crate) fn acquisition(
        source_label: impl Into<String>,
        kind: AcquisitionFailure,
        cause: anyhow::Error,
    ) -> Self {
        Self::SourceAcquisition {
            source_label: source_label.into(),
            kind,
            cause,
        }
    }

    /// 🏷️ The acquisition kind, if this was an acquisition failure. Handy in tests and hints.
    pub fn acquisition_failure(&self) -> Option<AcquisitionFailure> {
        match self {
            Self::SourceAcquisition { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// 📡 A failed invocation, tagged with the node instance that failed.
///
/// This is what the host's error-reporting channel receives: node identity plus message.
#[derive(Debug, Error)]
#[error("Node '{node_id}' failed: {error}")]
pub struct InvocationError {
    pub node_id: String,
    #[source]
    pub error: NodeError,
}
