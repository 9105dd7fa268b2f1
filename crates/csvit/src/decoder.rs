// ai
//! 🧩 The Streaming Record Decoder — a forward-only cursor over CSV rows.
//!
//! INT. WORKFLOW ENGINE — SOME UNKNOWABLE TIME LATER
//!
//! The engine pokes the node. The node pokes the decoder. The decoder pulls
//! exactly one row off the stream, names its columns, and goes back to sleep
//! with the stream still open. Minutes may pass. Hours, even. The decoder
//! does not mind. The decoder has no concept of time. The decoder is at peace.
//!
//! 🧠 Knowledge graph:
//! - `CsvOptions`: what the config file says (strings, optional-ish)
//! - `DecodeOptions`: what the row reader needs (validated, a single delimiter byte)
//! - `RecordDecoder`: `csv-core` rows + header memory + empty-line policy + relaxed column counts
//! - Ragged rows never error: missing columns are absent, extras get their column index as key
//!   (underscore-prefixed until it no longer clashes with a header name)

mod rows;

use serde::Deserialize;
use tokio::io::{AsyncRead, BufReader};
use tracing::trace;

use crate::error::NodeError;
use crate::record::Record;
use rows::{RawRow, RowReader};

// -- 📏 64 KiB: enough to keep syscalls rare, small enough to keep a thousand idle nodes cheap
const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// 🔧 The `csvOptions` block, exactly as the node configuration spells it.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// ✂️ Field separator. Empty means "the usual".
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_true", alias = "hasHeader")]
    pub has_header: bool,
    #[serde(default = "default_true", alias = "skipEmptyLines")]
    pub skip_empty_lines: bool,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: true,
            skip_empty_lines: true,
        }
    }
}

impl CsvOptions {
    /// ✅ Validate into the options the row reader can actually use.
    ///
    /// 💀 Fails with `Configuration` for multi-character delimiters, non-ASCII
    /// delimiters, and the three characters that already mean something in CSV.
    pub fn decode_options(&self) -> Result<DecodeOptions, NodeError> {
        let delimiter = match self.delimiter.as_bytes() {
            [] => b',',
            [b'"' | b'\r' | b'\n'] => {
                return Err(NodeError::Configuration(format!(
                    "delimiter {:?} collides with CSV quoting or line breaks",
                    self.delimiter
                )));
            }
            [single] if single.is_ascii() => *single,
            _ => {
                return Err(NodeError::Configuration(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                )));
            }
        };
        Ok(DecodeOptions {
            delimiter,
            has_header: self.has_header,
            skip_empty_lines: self.skip_empty_lines,
        })
    }
}

/// 🎛️ Validated decoder settings. Defaults: `,`, header on, skip empty lines on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub skip_empty_lines: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            skip_empty_lines: true,
        }
    }
}

/// 🧩 Pull-based CSV record cursor. One `next_record()` = one record, or `None` forever after.
pub struct RecordDecoder<R> {
    rows: RowReader<R>,
    options: DecodeOptions,
    headers: Option<Vec<String>>,
    records_emitted: u64,
}

impl<R> std::fmt::Debug for RecordDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDecoder")
            .field("options", &self.options)
            .field("headers", &self.headers)
            .field("records_emitted", &self.records_emitted)
            .field("rows", &self.rows)
            .finish()
    }
}

impl<R: AsyncRead + Unpin> RecordDecoder<R> {
    pub fn new(reader: R, options: DecodeOptions) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, reader, options)
    }

    /// 🔧 Same as `new`, with an explicit read-buffer size.
    pub fn with_capacity(capacity: usize, reader: R, options: DecodeOptions) -> Self {
        let buf_reader = BufReader::with_capacity(capacity, reader);
        Self {
            rows: RowReader::new(buf_reader, options.delimiter),
            options,
            headers: None,
            records_emitted: 0,
        }
    }

    /// 📄 Advance the cursor by one record.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, and keeps returning it.
    /// The header row and skipped empty lines are consumed silently on the way.
    pub async fn next_record(&mut self) -> Result<Option<Record>, NodeError> {
        loop {
            let Some(row) = self.rows.next_row().await? else {
                return Ok(None);
            };

            let fields = match row {
                RawRow::Empty if self.options.skip_empty_lines => continue,
                // -- 🫥 degenerate record: one empty field, keyed like any other first column
                RawRow::Empty => vec![String::new()],
                RawRow::Fields(fields) => fields,
            };

            if self.options.has_header && self.headers.is_none() {
                trace!("🏷️ header row claimed {} column names", fields.len());
                self.headers = Some(fields);
                continue;
            }

            let record = self.keyed(fields);
            self.records_emitted += 1;
            return Ok(Some(record));
        }
    }

    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.rows.bytes_consumed()
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    fn keyed(&self, fields: Vec<String>) -> Record {
        let Some(headers) = &self.headers else {
            return fields
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect();
        };

        if fields.len() != headers.len() {
            trace!(
                "🧮 ragged row near line {}: {} fields vs {} headers — relaxed policy, carrying on",
                self.rows.line(),
                fields.len(),
                headers.len()
            );
        }

        fields
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let key = headers
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| fallback_key(index, headers));
                (key, value)
            })
            .collect()
    }
}

/// 🔑 Key for a field past the last header: its column index, underscore-prefixed
/// until no header already answers to that name.
fn fallback_key(index: usize, headers: &[String]) -> String {
    let mut key = index.to_string();
    while headers.iter().any(|header| *header == key) {
        key.insert(0, '_');
    }
    key
}
