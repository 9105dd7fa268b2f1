// AI
//! 📊 progress.rs — "Are we there yet?" — every iteration loop, every time, forever.
//!
//! 🚀 The node hands out one row per invocation and never tells us how many are
//! left, so there is no bar here. Just a spinner that keeps count, and a comfy
//! table at the end with the receipts.
//!
//! ⚠️  Warning: Watching this spinner will not make it go faster.
//! Neither will the `delay` parameter. That one does the opposite. On purpose.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte — not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 📦 Raw bytes to something a human can read without squinting.
fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small files need love too.
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000" → "1,000,000" — you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if somebody set `delay` to something heroic.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Counts invocations, rows and bytes while the host loop spins.
pub(crate) struct ProgressMetrics {
    /// 🏷️ where the rows come from, for the spinner message
    source_name: String,
    invocations: u64,
    rows: u64,
    /// 📦 high-water mark of bytes the decoder consumed. The decoder forgets on
    /// exhaustion, we don't.
    bytes: u64,
    spinner: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("source_name", &self.source_name)
            .field("invocations", &self.invocations)
            .field("rows", &self.rows)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(source_name: String) -> Self {
        let spinner = ProgressBar::new_spinner();
        // -- 🎨 hardcoded template; if indicatif ever rejects it we fall back to the plain spinner
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let metrics = Self {
            source_name,
            invocations: 0,
            rows: 0,
            bytes: 0,
            spinner,
            start_time: Instant::now(),
        };
        metrics.render();
        metrics
    }

    /// 🔄 One invocation went by. `emitted_row` says whether it carried a record,
    /// `bytes_consumed` is the decoder's running total right now.
    pub(crate) fn update(&mut self, emitted_row: bool, bytes_consumed: u64) {
        self.invocations += 1;
        if emitted_row {
            self.rows += 1;
        }
        self.bytes = self.bytes.max(bytes_consumed);
        self.render();
    }

    /// ✅ Stop spinning and leave the receipt on screen.
    pub(crate) fn finish(&self) {
        self.spinner.finish_and_clear();
        eprintln!("{}", self.summary_table());
    }

    fn render(&self) {
        self.spinner.set_message(format!(
            "source: {} | {} rows | {}",
            self.source_name,
            format_number(self.rows),
            format_bytes(self.bytes)
        ));
    }

    /// 🍽️ Two columns, right-aligned, no borders (preset: NOTHING).
    fn summary_table(&self) -> Table {
        let elapsed = self.start_time.elapsed();
        let rows_per_sec = if elapsed.as_secs_f64() > 0.0 {
            self.rows as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new("source").set_alignment(CellAlignment::Right),
            Cell::new(&self.source_name).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} Rows", format_number(self.rows)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Invocations", format_number(self.invocations)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} Rows/s", rows_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(self.bytes)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed)))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
        table
    }
}
