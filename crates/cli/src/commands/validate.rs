//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CancelPolicy, Sensitivity, StoreKind, WalkerConfig};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    trigger_threshold_secs: u32,
    flush_threshold: usize,
    chunk_span_secs: f64,
    store: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    trigger_threshold_secs: config.detection.trigger_threshold_secs,
                    flush_threshold: config.recorder.flush_threshold,
                    chunk_span_secs: config.recorder.flush_threshold as f64
                        / config.recorder.sample_rate_hz,
                    store: format!("{:?}", config.store.kind),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &WalkerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.detection.enabled {
        warnings.push("detection.enabled is false - sessions will never start automatically".to_string());
    }

    if Sensitivity::from_threshold_secs(config.detection.trigger_threshold_secs).is_none() {
        warnings.push(format!(
            "detection.trigger_threshold_secs = {} matches no sensitivity preset",
            config.detection.trigger_threshold_secs
        ));
    }

    if config.store.kind == StoreKind::Memory {
        warnings.push("store.kind is memory - chunks are lost when the process exits".to_string());
    }

    if config.recorder.cancel_policy == CancelPolicy::DiscardRemainder {
        warnings.push("recorder.cancel_policy discards buffered samples on cancel".to_string());
    }

    if !config.notifications.errors {
        warnings.push("notifications.errors is false - blocked starts are silent".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Trigger threshold: {}s", summary.trigger_threshold_secs);
            println!(
                "  Flush threshold: {} samples (~{:.0}s per chunk)",
                summary.flush_threshold, summary.chunk_span_secs
            );
            println!("  Store: {}", summary.store);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config("[detection]\ntrigger_threshold_secs = 45\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("no sensitivity preset")));
        assert!(warnings.iter().any(|w| w.contains("memory")));
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config("[recorder]\nflush_threshold = 0\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/walksense.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
