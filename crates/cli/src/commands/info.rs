//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{Sensitivity, WalkerConfig};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    detection: DetectionInfo,
    recorder: RecorderInfo,
    reassembly_fetch_timeout_ms: u64,
    notifications: NotificationInfo,
    store: StoreInfo,
}

#[derive(Serialize)]
struct DetectionInfo {
    enabled: bool,
    trigger_threshold_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensitivity: Option<Sensitivity>,
}

#[derive(Serialize)]
struct RecorderInfo {
    flush_threshold: usize,
    sample_rate_hz: f64,
    chunk_span_secs: f64,
    cancel_policy: String,
    write_timeout_ms: u64,
}

#[derive(Serialize)]
struct NotificationInfo {
    detection_events: bool,
    errors: bool,
    advisory_rate_limit_secs: u64,
    disconnect_rate_limit_secs: u64,
}

#[derive(Serialize)]
struct StoreInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_path: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else if args.effective {
        print!("{}", config_loader::ConfigLoader::to_toml(&config)?);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &WalkerConfig) -> ConfigInfo {
    let recorder = &config.recorder;
    let notifications = &config.notifications;

    ConfigInfo {
        detection: DetectionInfo {
            enabled: config.detection.enabled,
            trigger_threshold_secs: config.detection.trigger_threshold_secs,
            sensitivity: Sensitivity::from_threshold_secs(config.detection.trigger_threshold_secs),
        },
        recorder: RecorderInfo {
            flush_threshold: recorder.flush_threshold,
            sample_rate_hz: recorder.sample_rate_hz,
            chunk_span_secs: recorder.flush_threshold as f64 / recorder.sample_rate_hz,
            cancel_policy: format!("{:?}", recorder.cancel_policy),
            write_timeout_ms: recorder.write_timeout_ms,
        },
        reassembly_fetch_timeout_ms: config.reassembly.fetch_timeout_ms,
        notifications: NotificationInfo {
            detection_events: notifications.detection_events,
            errors: notifications.errors,
            advisory_rate_limit_secs: notifications.advisory_rate_limit_secs,
            disconnect_rate_limit_secs: notifications.disconnect_rate_limit_secs,
        },
        store: StoreInfo {
            kind: format!("{:?}", config.store.kind),
            base_path: config
                .store
                .base_path
                .as_ref()
                .map(|p| p.display().to_string()),
        },
    }
}

fn print_config_info(config: &WalkerConfig) {
    let info = build_config_info(config);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  walksense Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let d = &info.detection;
    println!("Detection");
    println!("   ├─ Enabled: {}", d.enabled);
    match d.sensitivity {
        Some(preset) => println!("   └─ Trigger: {}s ({:?})", d.trigger_threshold_secs, preset),
        None => println!("   └─ Trigger: {}s (custom)", d.trigger_threshold_secs),
    }

    let r = &info.recorder;
    println!("\nRecorder");
    println!(
        "   ├─ Flush threshold: {} samples (~{:.0}s at {} Hz)",
        r.flush_threshold, r.chunk_span_secs, r.sample_rate_hz
    );
    println!("   ├─ Cancel policy: {}", r.cancel_policy);
    println!("   └─ Write timeout: {} ms", r.write_timeout_ms);

    println!("\nReassembly");
    println!("   └─ Fetch timeout: {} ms", info.reassembly_fetch_timeout_ms);

    let n = &info.notifications;
    println!("\nNotifications");
    println!("   ├─ Detection events: {}", n.detection_events);
    println!("   ├─ Errors: {}", n.errors);
    println!("   ├─ Advisory interval: {}s", n.advisory_rate_limit_secs);
    println!("   └─ Disconnect interval: {}s", n.disconnect_rate_limit_secs);

    println!("\nStore");
    match &info.store.base_path {
        Some(path) => println!("   └─ {} ({})", info.store.kind, path),
        None => println!("   └─ {}", info.store.kind),
    }

    println!();
}
