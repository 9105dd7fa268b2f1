// ai
//! 🗄️ Per-instance context — the node's memory between invocations.
//!
//! The workflow engine calls us, forgets us, and calls us again. Whatever must
//! survive in between (the open stream, the decoder cursor, the finished flag)
//! lives in a `NodeContext`, and every `NodeContext` lives in the host-owned
//! `ContextStore`, keyed by node instance id. No globals. No statics. The host
//! holds the store and passes it in. 🦆
//!
//! 🔒 Each slot sits behind a `tokio::sync::Mutex`, so two concurrent
//! invocations of the SAME instance serialize on "check handle / create handle
//! / pull", while different instances never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::backends::ByteStream;
use crate::decoder::RecordDecoder;

/// 🏷️ Stable identity of one configured node occurrence in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeInstanceId(String);

impl NodeInstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeInstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 🧠 What one node instance remembers between invocations.
#[derive(Debug, Default)]
pub struct NodeContext {
    /// 🔗 open stream + parser cursor. `None` before the first successful resolution
    /// and again after exhaustion.
    pub(crate) decoder: Option<RecordDecoder<ByteStream>>,
    pub(crate) finished: bool,
}

impl NodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 📊 rows handed out so far by the live decoder (0 once it is gone)
    pub fn records_emitted(&self) -> u64 {
        self.decoder.as_ref().map_or(0, |d| d.records_emitted())
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.decoder.as_ref().map_or(0, |d| d.bytes_consumed())
    }
}

pub type ContextSlot = Arc<AsyncMutex<NodeContext>>;

/// 🗄️ Host-owned map of node instance → context slot, for one workflow run.
#[derive(Debug, Default)]
pub struct ContextStore {
    slots: Mutex<HashMap<NodeInstanceId, ContextSlot>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🔑 The slot for `id`, created empty on first use.
    pub fn slot(&self, id: &NodeInstanceId) -> ContextSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id.clone()).or_default().clone()
    }

    /// 🧹 Forget one instance. Its stream closes once nobody holds the slot anymore.
    pub fn reset(&self, id: &NodeInstanceId) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(id);
    }

    /// 🏁 The run is over. Every slot goes, every stream with it.
    pub fn end_run(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_the_same_id_gets_the_same_slot() {
        let store = ContextStore::new();
        let id = NodeInstanceId::from("csv-1");
        let first = store.slot(&id);
        first.lock().await.finished = true;
        let second = store.slot(&id);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.lock().await.is_finished());
    }

    #[tokio::test]
    async fn the_one_where_instances_do_not_share_memories() {
        let store = ContextStore::new();
        store.slot(&"a".into()).lock().await.finished = true;
        assert!(!store.slot(&"b".into()).lock().await.is_finished());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn the_one_where_reset_and_end_run_wipe_the_slate() {
        let store = ContextStore::new();
        let id = NodeInstanceId::from("csv-1");
        store.slot(&id).lock().await.finished = true;
        store.reset(&id);
        assert!(!store.slot(&id).lock().await.is_finished());

        store.slot(&"other".into());
        store.end_run();
        assert!(store.is_empty());
    }
}
