// ai
//! 🔪 Physical rows off an async stream, tokenized by `csv-core`.
//!
//! `csv-core` owns quoting, escaped quotes, delimiters and embedded newlines.
//! It is a push parser with no I/O of its own, so we feed it from a tokio
//! `BufReader` one `fill_buf` at a time, the same dance the `csv` crate does over
//! `std::io::BufRead`. Only as many bytes as one row needs get consumed, so the
//! stream can sit idle between pulls for as long as the workflow engine likes.
//!
//! 🧠 Knowledge graph:
//! - Terminator is `\n`. A CRLF row ends with a stray `\r` on its last field, which we trim
//! - `csv-core` silently eats blank lines, so we peek for `\n` at every row boundary first
//! - UTF-8 BOM: sniffed across refills, dropped only when all three bytes match;
//!   anything else is replayed to the parser untouched
//! - Fields must be valid UTF-8, otherwise `Decode` with the row's starting line
//! - Header semantics, empty-line policy, keys: NOT our problem. See `decoder.rs`.

use csv_core::{ReadRecordResult, Reader as CoreReader, ReaderBuilder, Terminator};
use memchr::memchr_iter;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::NodeError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 📄 One physical row, before anybody assigns it keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawRow {
    /// A line with nothing on it. Not even a delimiter.
    Empty,
    Fields(Vec<String>),
}

pub(crate) struct RowReader<R> {
    reader: BufReader<R>,
    core: CoreReader,
    // 🧾 bytes pulled while sniffing for a BOM that was not one; parsed before the reader
    pending: Vec<u8>,
    bom_checked: bool,
    // 📏 1-based physical line of the next unread byte
    line: u64,
    bytes_consumed: u64,
    eof: bool,
    output: Vec<u8>,
    ends: Vec<usize>,
}

impl<R> std::fmt::Debug for RowReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("line", &self.line)
            .field("eof", &self.eof)
            .field("bytes_consumed", &self.bytes_consumed)
            .finish()
    }
}

impl<R: AsyncRead + Unpin> RowReader<R> {
    pub(crate) fn new(reader: BufReader<R>, delimiter: u8) -> Self {
        let core = ReaderBuilder::new()
            .delimiter(delimiter)
            .terminator(Terminator::Any(b'\n'))
            .build();
        Self {
            reader,
            core,
            pending: Vec::new(),
            bom_checked: false,
            line: 1,
            bytes_consumed: 0,
            eof: false,
            output: vec![0; 1024],
            ends: vec![0; 16],
        }
    }

    pub(crate) fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub(crate) fn line(&self) -> u64 {
        self.line
    }

    /// 🔪 Cut the next physical row off the front of the stream. `None` at end-of-data, forever.
    pub(crate) async fn next_row(&mut self) -> Result<Option<RawRow>, NodeError> {
        if self.eof {
            return Ok(None);
        }
        if !self.bom_checked {
            self.sniff_bom().await?;
        }

        // 🫥 a bare `\n` at a row boundary is an empty line; csv-core would swallow it
        if self.peek_byte().await? == Some(b'\n') {
            self.consume_one();
            self.line += 1;
            return Ok(Some(RawRow::Empty));
        }

        let starts_on = self.line;
        let (mut outlen, mut endlen) = (0usize, 0usize);
        loop {
            let (result, nin, nout, nend) = if self.pending.is_empty() {
                let input = self
                    .reader
                    .fill_buf()
                    .await
                    .map_err(NodeError::StreamInterrupted)?;
                let step = self.core.read_record(
                    input,
                    &mut self.output[outlen..],
                    &mut self.ends[endlen..],
                );
                self.line += memchr_iter(b'\n', &input[..step.1]).count() as u64;
                self.reader.consume(step.1);
                step
            } else {
                let step = self.core.read_record(
                    &self.pending,
                    &mut self.output[outlen..],
                    &mut self.ends[endlen..],
                );
                self.line += memchr_iter(b'\n', &self.pending[..step.1]).count() as u64;
                self.pending.drain(..step.1);
                step
            };
            self.bytes_consumed += nin as u64;
            outlen += nout;
            endlen += nend;

            match result {
                ReadRecordResult::InputEmpty => continue,
                ReadRecordResult::OutputFull => {
                    let grown = self.output.len() * 2;
                    self.output.resize(grown, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let grown = self.ends.len() * 2;
                    self.ends.resize(grown, 0);
                }
                ReadRecordResult::Record => return self.finish_row(outlen, endlen, starts_on).map(Some),
                ReadRecordResult::End => {
                    self.eof = true;
                    return Ok(None);
                }
            }
        }
    }

    /// 🧾 Read up to three bytes; drop them only if they spell the BOM.
    async fn sniff_bom(&mut self) -> Result<(), NodeError> {
        self.bom_checked = true;
        while self.pending.len() < UTF8_BOM.len() {
            let buf = self
                .reader
                .fill_buf()
                .await
                .map_err(NodeError::StreamInterrupted)?;
            if buf.is_empty() {
                break;
            }
            let take = (UTF8_BOM.len() - self.pending.len()).min(buf.len());
            self.pending.extend_from_slice(&buf[..take]);
            self.reader.consume(take);
            if !UTF8_BOM.starts_with(&self.pending) {
                break;
            }
        }
        if self.pending == UTF8_BOM {
            self.pending.clear();
            self.bytes_consumed += UTF8_BOM.len() as u64;
        }
        Ok(())
    }

    async fn peek_byte(&mut self) -> Result<Option<u8>, NodeError> {
        if let Some(&first) = self.pending.first() {
            return Ok(Some(first));
        }
        let buf = self
            .reader
            .fill_buf()
            .await
            .map_err(NodeError::StreamInterrupted)?;
        Ok(buf.first().copied())
    }

    fn consume_one(&mut self) {
        if self.pending.is_empty() {
            self.reader.consume(1);
        } else {
            self.pending.remove(0);
        }
        self.bytes_consumed += 1;
    }

    fn finish_row(&self, outlen: usize, endlen: usize, starts_on: u64) -> Result<RawRow, NodeError> {
        let record = &self.output[..outlen];
        // -- 🪟 "\r\n" alone on a line: csv-core sees one field holding the CR
        if endlen == 1 && record == b"\r" {
            return Ok(RawRow::Empty);
        }

        let mut fields = Vec::with_capacity(endlen);
        let mut start = 0;
        for (index, &end) in self.ends[..endlen].iter().enumerate() {
            let mut raw = &record[start..end];
            start = end;
            if index + 1 == endlen {
                raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            }
            let text = std::str::from_utf8(raw).map_err(|err| NodeError::Decode {
                line: starts_on,
                message: format!("field {} is not valid UTF-8: {err}", index + 1),
            })?;
            fields.push(text.to_string());
        }
        Ok(RawRow::Fields(fields))
    }
}
