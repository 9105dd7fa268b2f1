//! 🔁 csvit — a CSV file, served one row per workflow-engine invocation.
//!
//! Local disk, Google Drive or S3 in; `{done}` + one record out; repeat until done.
//! The host owns the loop and the `ContextStore`; this crate owns everything between.

pub mod app_config;
pub mod backends;
pub mod context;
pub mod decoder;
pub mod error;
pub mod node;
pub mod parameters;
pub mod record;

pub use backends::{BackendResolver, ByteStream, SourceDescriptor, SourceResolver};
pub use context::{ContextStore, NodeContext, NodeInstanceId};
pub use decoder::{CsvOptions, DecodeOptions, RecordDecoder};
pub use error::{AcquisitionFailure, InvocationError, NodeError};
pub use node::CsvIteratorNode;
pub use parameters::{Credentials, NodeParameters, SourceKind};
pub use record::{Branch, DoneSignal, IterationResult, Record};
