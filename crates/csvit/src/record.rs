// ai
//! 📦 Records and iteration results — the stuff that actually leaves this node.
//!
//! A `Record` is one decoded CSV row: an ordered list of `(key, value)` pairs,
//! every value a string, because CSV has exactly one type and it's vibes.
//! Column counts may differ row to row. We don't judge. We tolerate. 🦆
//!
//! An `IterationResult` is what one invocation hands back to the host: a
//! `done` branch (always exactly one control item) and a `loop` branch
//! (zero or one record). The host wires `loop` back into this node and exits
//! on `{done: true}`.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

/// 📄 One decoded row, keys in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🔧 Sets `key` to `value`. A repeated key overwrites in place, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 🦆 Serializes into a JSON object, column order preserved.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// 🎭 hand-rolled so the map comes out in column order, not hash order
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 🏁 The control item carried on the `done` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DoneSignal {
    pub done: bool,
}

/// 🔀 One named output branch, items already shaped as JSON for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: &'static str,
    pub items: Vec<Value>,
}

pub const DONE_BRANCH: &str = "done";
pub const LOOP_BRANCH: &str = "loop";

/// 📦 What one invocation returns: finished, or one more row.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    pub done: DoneSignal,
    pub looped: Option<Record>,
}

impl IterationResult {
    /// ✅ One more row. `{done: false}` on the done branch, the record on the loop branch.
    pub fn next_item(record: Record) -> Self {
        Self {
            done: DoneSignal { done: false },
            looped: Some(record),
        }
    }

    /// 🏁 No more rows. `{done: true}` and an empty loop branch.
    pub fn finished() -> Self {
        Self {
            done: DoneSignal { done: true },
            looped: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.done.done
    }

    /// 🔀 Ordered `[done, loop]` branches — the binding shape the host routes on.
    pub fn into_branches(self) -> [Branch; 2] {
        let done_item = serde_json::json!({ "done": self.done.done });
        [
            Branch {
                name: DONE_BRANCH,
                items: vec![done_item],
            },
            Branch {
                name: LOOP_BRANCH,
                items: self.looped.map(|r| r.to_json()).into_iter().collect(),
            },
        ]
    }
}
