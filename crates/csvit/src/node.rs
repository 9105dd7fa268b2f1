// ai
//! 🔁 The CSV Iterator node — one invocation in, one row (or "done") out.
//!
//! 🎬 *[the workflow engine taps the node on the shoulder]*
//! 🎬 "Got another one?"
//! 🎬 *[the node checks its pockets]* "...yeah. Here."
//! 🎬 *[repeat until the pockets are empty]* 🦆
//!
//! 🧠 Knowledge graph:
//! - First invocation: parameters → descriptor → resolver → stream → decoder → stored in the slot
//! - Every invocation: pull EXACTLY one record. Never two. That's the whole contract.
//! - Record → optional `tokio::time::sleep(delay)` → `{done:false}` + record
//! - Exhausted → decoder dropped (stream closed) → `finished = true` → `{done:true}`
//! - After finished: `{done:true}` again, no re-resolution, until the host resets the slot
//! - Resolution failures leave the slot empty, so the next invocation starts from scratch
//! - Decode / mid-stream failures abandon the stream the same way

use tracing::{debug, info, trace, warn};

use crate::backends::{BackendResolver, SourceResolver};
use crate::context::{ContextStore, NodeContext, NodeInstanceId};
use crate::decoder::RecordDecoder;
use crate::error::{InvocationError, NodeError};
use crate::parameters::{Credentials, NodeParameters};
use crate::record::IterationResult;

/// 🔁 The node itself. Stateless: all memory lives in the `NodeContext` it is handed.
#[derive(Debug, Clone, Default)]
pub struct CsvIteratorNode<S = BackendResolver> {
    resolver: S,
}

impl CsvIteratorNode<BackendResolver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SourceResolver> CsvIteratorNode<S> {
    /// 🔧 Same node, different way of getting bytes.
    pub fn with_resolver(resolver: S) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &S {
        &self.resolver
    }

    /// 🚀 Host entry point: one engine invocation for node instance `node_id`.
    ///
    /// Holds the instance's slot lock for the whole step (including the delay), so
    /// re-entrant calls for the same instance queue up instead of racing.
    pub async fn invoke(
        &self,
        store: &ContextStore,
        node_id: &NodeInstanceId,
        parameters: &NodeParameters,
        credentials: &Credentials,
    ) -> Result<IterationResult, InvocationError> {
        let slot = store.slot(node_id);
        let mut context = slot.lock().await;
        self.invoke_in_context(&mut context, node_id, parameters, credentials)
            .await
    }

    /// 🔐 `invoke` for hosts already holding the instance's slot guard, e.g. to read
    /// progress counters off the same context without locking twice.
    pub async fn invoke_in_context(
        &self,
        context: &mut NodeContext,
        node_id: &NodeInstanceId,
        parameters: &NodeParameters,
        credentials: &Credentials,
    ) -> Result<IterationResult, InvocationError> {
        self.execute(context, parameters, credentials)
            .await
            .map_err(|error| {
                warn!("💀 node '{node_id}' failed: {error}");
                InvocationError {
                    node_id: node_id.to_string(),
                    error,
                }
            })
    }

    /// 🔁 One step of the iteration against an explicit context.
    pub async fn execute(
        &self,
        context: &mut NodeContext,
        parameters: &NodeParameters,
        credentials: &Credentials,
    ) -> Result<IterationResult, NodeError> {
        if context.finished {
            trace!("🏁 already finished, repeating the done signal");
            return Ok(IterationResult::finished());
        }

        let decoder = match context.decoder {
            Some(ref mut decoder) => decoder,
            None => {
                // ⚠️ validate everything BEFORE touching the slot: a bad config caches nothing
                let descriptor = parameters.source_descriptor(credentials)?;
                let options = parameters.csv_options.decode_options()?;
                let stream = self.resolver.resolve(&descriptor).await?;
                debug!("🔗 decoder attached to {}", descriptor.label());
                context.finished = false;
                context.decoder.insert(RecordDecoder::new(stream, options))
            }
        };

        let pulled = decoder.next_record().await;
        let record = match pulled {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(
                    "🏁 source exhausted after {} records ({} bytes)",
                    decoder.records_emitted(),
                    decoder.bytes_consumed()
                );
                context.decoder = None;
                context.finished = true;
                return Ok(IterationResult::finished());
            }
            Err(err) => {
                // 🗑️ the stream is abandoned, not rewound
                context.decoder = None;
                return Err(err);
            }
        };

        trace!(
            "📄 record #{} pulled ({} fields)",
            decoder.records_emitted(),
            record.len()
        );

        let delay = parameters.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(IterationResult::next_item(record))
    }
}
