//! 🏎️ Decoder throughput — how fast can we turn bytes into rows when nobody is sleeping?
//!
//! In-memory input, so this measures csv-core row splitting and record building only.
//! No disks, no networks, no excuses.

use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use csvit::{DecodeOptions, RecordDecoder};
use tokio::runtime::Runtime;

/// 📄 `rows` lines of a plain five-column file, header included.
fn plain_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("id,name,city,amount,note\n");
    for i in 0..rows {
        csv.push_str(&format!("{i},user-{i},Berlin,{}.50,nothing to see\n", i * 3));
    }
    csv.into_bytes()
}

/// 🧩 Same shape, but every field quoted and every tenth one with an embedded newline.
fn quoted_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("\"id\",\"name\",\"comment\"\r\n");
    for i in 0..rows {
        let comment = if i % 10 == 0 {
            "line one\nline \"\"two\"\""
        } else {
            "a, b, c"
        };
        csv.push_str(&format!("\"{i}\",\"user-{i}\",\"{comment}\"\r\n"));
    }
    csv.into_bytes()
}

async fn drain(bytes: &[u8]) -> u64 {
    let mut decoder = RecordDecoder::new(Cursor::new(bytes.to_vec()), DecodeOptions::default());
    while let Ok(Some(record)) = decoder.next_record().await {
        black_box(record);
    }
    decoder.records_emitted()
}

fn decoder_throughput(c: &mut Criterion) {
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => panic!("💀 no tokio runtime, no benchmark: {err}"),
    };

    let mut group = c.benchmark_group("record_decoder");
    for rows in [1_000usize, 10_000] {
        for (flavor, bytes) in [("plain", plain_csv(rows)), ("quoted", quoted_csv(rows))] {
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(BenchmarkId::new(flavor, rows), &bytes, |b, bytes| {
                b.to_async(&runtime).iter(|| drain(bytes));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, decoder_throughput);
criterion_main!(benches);
