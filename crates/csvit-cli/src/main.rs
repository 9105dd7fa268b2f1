//! 🚀 csvit-cli — the front door, the bouncer, the maitre d' of csvit.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary plays the part of a workflow engine with exactly one node in
//! its graph: load config, call the CSV Iterator until it says done, print every
//! row as one NDJSON line on stdout. Logs and the spinner go to stderr so the
//! rows can be piped somewhere useful. 🦆

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csvit::app_config::AppConfig;
use csvit::{ContextStore, CsvIteratorNode, NodeInstanceId};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod progress;

use progress::ProgressMetrics;

/// 🔁 Drive a CSV Iterator node from the command line.
#[derive(Debug, Parser)]
#[command(name = "csvit-cli", version, about)]
struct Args {
    /// 📄 TOML config file. Missing file means env vars (CSVIT_*) only.
    #[arg(long, default_value = "csvit.toml")]
    config: PathBuf,
    /// 🏷️ node instance id, overrides `runtime.node_id`
    #[arg(long)]
    node_id: Option<String>,
}

/// 🧾 What the loop did, for the final log line.
#[derive(Debug, Default)]
struct RunSummary {
    invocations: u64,
    rows: u64,
    finished: bool,
}

/// 🔁 The host loop: invoke, print, repeat until `{done: true}` or the invocation cap.
async fn run(app_config: AppConfig, node_id: NodeInstanceId) -> Result<RunSummary> {
    let node = CsvIteratorNode::new();
    let store = ContextStore::new();

    // -- 🏷️ a label for the spinner; a broken config fails properly on the first invoke
    let source_name = app_config
        .node
        .source_descriptor(&app_config.credentials)
        .map(|descriptor| descriptor.label())
        .unwrap_or_else(|_| app_config.node.source.clone());
    let mut metrics = ProgressMetrics::new(source_name);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut summary = RunSummary::default();
    let slot = store.slot(&node_id);

    loop {
        if let Some(cap) = app_config.runtime.max_invocations {
            if summary.invocations >= cap {
                info!("🛑 stopping after {} invocations (runtime.max_invocations)", cap);
                break;
            }
        }

        // -- 🔐 one lock per invocation: the step and the byte counter read share it
        let (result, bytes_consumed) = {
            let mut context = slot.lock().await;
            let result = node
                .invoke_in_context(&mut context, &node_id, &app_config.node, &app_config.credentials)
                .await?;
            (result, context.bytes_consumed())
        };
        summary.invocations += 1;
        metrics.update(result.looped.is_some(), bytes_consumed);

        if result.is_finished() {
            summary.finished = true;
            break;
        }

        if let Some(record) = result.looped {
            serde_json::to_writer(&mut out, &record)
                .context("💀 Failed to serialize a row to JSON. Serde blinked first.")?;
            writeln!(out).context("💀 stdout closed on us mid-row")?;
            summary.rows += 1;
        }
    }

    out.flush().context("💀 Failed to flush stdout")?;
    metrics.finish();
    // -- 🧹 end of the run: every slot goes, every open stream with it
    drop(slot);
    store.end_run();
    Ok(summary)
}

/// 🚀 main() — where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (stderr, RUST_LOG decides how chatty)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the loop (send it and pray 🙏)
/// 5. Handle errors (cry)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 stderr, because stdout belongs to the rows
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // 🔒 Validate the config file exists before we get too emotionally attached
    let config_file_path_which_is_validated_to_exist = match args.config.try_exists()
        .context(format!("💀 Couldn't check whether the configuration file exists. Maybe it's an issue with pwd/cwd and relative paths; use an absolute path to be absolutely certain. Was checking here: '{}'", args.config.display()))?
    {
        true => Some(args.config.as_path()),
        false => None, // 💤 env vars only, then
    };

    let mut app_config = csvit::app_config::load_config(config_file_path_which_is_validated_to_exist)
        .context("💀 In csvit-cli, main, we couldn't load the config. Take a look at the file and the CSVIT_* env vars, make sure you didn't forget something obvious")?;
    if let Some(node_id) = args.node_id {
        app_config.runtime.node_id = node_id;
    }
    let node_id = NodeInstanceId::new(app_config.runtime.node_id.clone());

    let result = run(app_config, node_id).await;

    match result {
        Ok(summary) => {
            info!(
                "✅ {} rows in {} invocations (finished: {})",
                summary.rows, summary.invocations, summary.finished
            );
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("error sending request")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                    || cause_str.contains("dispatch failure")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }

            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like the source isn't reachable. \
                    Double-check the network path to Google Drive / S3, or the \
                    endpoint_url if you point at a local S3 stand-in. ☕"
                );
            }

            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}
