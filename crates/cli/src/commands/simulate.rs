//! `simulate` command implementation.

use anyhow::{Context, Result};
use contracts::{Location, StoreKind, WalkerConfig};
use tracing::info;

use super::load_config;
use crate::cli::SimulateArgs;
use crate::pipeline::{standard_script, Simulation, SimulationConfig};

/// Starting point of the simulated walk
const START_LOCATION: Location = Location {
    latitude: 42.2808,
    longitude: -83.7430,
    altitude: 256.0,
};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut walker = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            load_config(path)?
        }
        None => WalkerConfig::default(),
    };
    apply_overrides(&mut walker, args);
    config_loader::ConfigLoader::validate(&walker).context("Invalid configuration after overrides")?;

    let record_dir = args.store_dir.as_ref().map(|dir| dir.join("records"));

    let config = SimulationConfig {
        walker,
        script: standard_script(args.idle_before, args.walk, args.idle_after),
        start_location: START_LOCATION,
        speed_mps: args.speed,
        location_permission: !args.deny_location,
        record_dir,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let stats = Simulation::new(config).run().await.context("Simulation failed")?;

    info!(
        sessions = stats.sessions.len(),
        samples = stats.recorder.samples_appended,
        chunks = stats.recorder.chunks_flushed,
        duration_secs = stats.duration.as_secs_f64(),
        "Simulation completed"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&stats.sessions)
            .context("Failed to serialize session summaries")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }

    Ok(())
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(walker: &mut WalkerConfig, args: &SimulateArgs) {
    if let Some(secs) = args.threshold_secs {
        info!(secs, "Overriding detection threshold from CLI");
        walker.detection.trigger_threshold_secs = secs;
    }
    if let Some(threshold) = args.flush_threshold {
        info!(threshold, "Overriding flush threshold from CLI");
        walker.recorder.flush_threshold = threshold;
    }
    if let Some(dir) = &args.store_dir {
        info!(dir = %dir.display(), "Using file store from CLI");
        walker.store.kind = StoreKind::File;
        walker.store.base_path = Some(dir.join("chunks"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> SimulateArgs {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SimulateArgs,
        }
        let argv = std::iter::once("simulate").chain(extra.iter().copied());
        Wrapper::parse_from(argv).args
    }

    #[test]
    fn test_overrides_applied() {
        let mut walker = WalkerConfig::default();
        apply_overrides(
            &mut walker,
            &args(&["--threshold-secs", "15", "--flush-threshold", "500", "--store-dir", "/tmp/ws"]),
        );
        assert_eq!(walker.detection.trigger_threshold_secs, 15);
        assert_eq!(walker.recorder.flush_threshold, 500);
        assert_eq!(walker.store.kind, StoreKind::File);
        assert_eq!(
            walker.store.base_path.as_deref(),
            Some(std::path::Path::new("/tmp/ws/chunks"))
        );
    }

    #[tokio::test]
    async fn test_simulate_into_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_string_lossy().to_string();
        let args = args(&[
            "--idle-before", "2",
            "--walk", "20",
            "--idle-after", "8",
            "--threshold-secs", "5",
            "--flush-threshold", "100",
            "--store-dir", &dir_arg,
            "--json",
        ]);
        run_simulate(&args).await.unwrap();

        let records: Vec<_> = std::fs::read_dir(dir.path().join("records")).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert!(std::fs::read_dir(dir.path().join("chunks")).unwrap().count() > 1);
    }
}
