//! `reassemble` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chunk_store::FileChunkStore;
use contracts::{SessionChunkKey, SessionRecord};
use reassembly::{ChunkGap, ChunkReassembler, SessionSummary};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ReassembleArgs;
use crate::error::CliError;

#[derive(Serialize)]
struct ReassemblyOutput {
    chunks: usize,
    chunk_counts: Vec<usize>,
    gaps: Vec<ChunkGap>,
    summary: SessionSummary,
}

/// Execute the `reassemble` command
pub async fn run_reassemble(args: &ReassembleArgs) -> Result<()> {
    if !args.store.is_dir() {
        anyhow::bail!("Store directory not found: {}", args.store.display());
    }
    let store = Arc::new(
        FileChunkStore::new("file", &args.store)
            .with_context(|| format!("Failed to open store at {}", args.store.display()))?,
    );

    let keys = resolve_keys(&store, args)?;
    info!(store = %args.store.display(), chunks = keys.len(), "Reassembling session");

    let reassembler = ChunkReassembler::with_timeout(Arc::clone(&store), Duration::from_millis(args.timeout_ms));
    let session = reassembler.reassemble(&keys).await?;
    for gap in &session.gaps {
        warn!(index = gap.index, key = %gap.key, reason = %gap.reason, "Chunk missing from session");
    }

    let output = ReassemblyOutput {
        chunks: keys.len(),
        chunk_counts: session.chunk_counts.clone(),
        summary: SessionSummary::from_samples(&session.samples, args.sample_rate),
        gaps: session.gaps,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize reassembly output")?
        );
    } else {
        print_output(&output);
    }
    Ok(())
}

/// Keys from the record file, the command line, or every chunk in the store
fn resolve_keys(store: &FileChunkStore, args: &ReassembleArgs) -> crate::error::Result<Vec<SessionChunkKey>> {
    if let Some(path) = &args.record {
        let body = std::fs::read_to_string(path)?;
        let record: SessionRecord = serde_json::from_str(&body)
            .map_err(|e| CliError::invalid_key(path.display().to_string(), e.to_string()))?;
        return Ok(record.chunk_keys);
    }

    if args.keys.is_empty() {
        warn!("No keys given, using every chunk in the store in key order");
        return Ok(store.list_keys()?);
    }

    args.keys
        .iter()
        .map(|raw| {
            let key = SessionChunkKey::from(raw.as_str());
            store
                .path_for(&key)
                .map(|_| key)
                .map_err(|e| CliError::invalid_key(raw.clone(), e.to_string()))
        })
        .collect()
}

fn print_output(output: &ReassemblyOutput) {
    let s = &output.summary;
    println!("\nReassembled session");
    println!("   ├─ Chunks: {} ({} missing)", output.chunks, output.gaps.len());
    println!("   ├─ Samples: {}", s.sample_count);
    println!("   ├─ Duration: {}", s.duration);
    println!("   ├─ Distance: {:.1} m ({:.0} ft)", s.distance_m, s.distance_ft);
    println!(
        "   ├─ Final location: {:.6}, {:.6}",
        s.final_location.latitude, s.final_location.longitude
    );
    println!("   └─ Path: {}", s.polyline);

    for gap in &output.gaps {
        println!("   ! chunk {} ({}): {}", gap.index, gap.key, gap.reason);
    }
    println!();
}
