//! Configuration validation
//!
//! Rules:
//! - declarative field rules from `WalkerConfig`'s `Validate` derive
//!   (thresholds and timeouts > 0, sample rate >= 1 Hz)
//! - file store requires `base_path`
//! - flush threshold leaves at least one second of samples per chunk

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};

use contracts::{ContractError, StoreKind, WalkerConfig};

/// Validate WalkerConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &WalkerConfig) -> Result<(), ContractError> {
    validate_field_rules(config)?;
    validate_store(config)?;
    validate_chunk_span(config)?;
    Ok(())
}

/// Run derive-generated rules
fn validate_field_rules(config: &WalkerConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("<unknown>".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// Depth-first walk to the first violated rule, in field-name order
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    let message = match (err.params.get("min"), err.params.get("value")) {
                        (Some(min), Some(value)) => format!("must be >= {min}, got {value}"),
                        _ => format!("failed '{}' rule", err.code),
                    };
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// File store needs somewhere to write
fn validate_store(config: &WalkerConfig) -> Result<(), ContractError> {
    if config.store.kind == StoreKind::File && config.store.base_path.is_none() {
        return Err(ContractError::config_validation(
            "store.base_path",
            "base_path is required when store.kind = \"file\"",
        ));
    }
    Ok(())
}

/// A chunk shorter than one second of samples would flood the store
fn validate_chunk_span(config: &WalkerConfig) -> Result<(), ContractError> {
    let recorder = &config.recorder;
    if (recorder.flush_threshold as f64) < recorder.sample_rate_hz {
        return Err(ContractError::config_validation(
            "recorder.flush_threshold",
            format!(
                "flush_threshold ({}) must cover at least one second of samples at {} Hz",
                recorder.flush_threshold, recorder.sample_rate_hz
            ),
        ));
    }
    Ok(())
}
