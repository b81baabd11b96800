//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{FeedSourceKind, StreamBlueprint, WorkerKind};

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
    version: String,
    feed: String,
    pool_count: usize,
    worker_count: usize,
    follow_count: usize,
    track_count: usize,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    feed: format!("{:?}", blueprint.feed.source),
                    pool_count: blueprint.workers.len(),
                    worker_count: blueprint.total_workers(),
                    follow_count: blueprint.stream.follow.len(),
                    track_count: blueprint.stream.track.len(),
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
fn collect_warnings(blueprint: &StreamBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.stream.is_empty() {
        warnings.push("No follow ids or track terms - every status is admitted".to_string());
    }

    if blueprint.pipeline.daemon && blueprint.feed.source == FeedSourceKind::Replay {
        warnings.push(
            "daemon = true with a replay feed - queued statuses are dropped when the file ends"
                .to_string(),
        );
    }

    if blueprint.worker(WorkerKind::Mirror).is_some() && !blueprint.pipeline.dry_run {
        warnings.push("mirror workers post through the logging backend only".to_string());
    }

    for worker in &blueprint.workers {
        if worker.filters.as_ref().is_some_and(|f| f.is_empty()) {
            warnings.push(format!(
                "Worker '{}' has an empty filter chain - every status passes",
                worker.kind
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Feed: {}", summary.feed);
            println!("  Pools: {}", summary.pool_count);
            println!("  Workers: {}", summary.worker_count);
            println!("  Follow ids: {}", summary.follow_count);
            println!("  Track terms: {}", summary.track_count);
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

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config("[[workers]]\nkind = \"writer\"\nfilters = []\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("every status is admitted")));
        assert!(warnings.iter().any(|w| w.contains("empty filter chain")));
        assert_eq!(result.summary.unwrap().worker_count, 2);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[[workers]]\nkind = \"writer\"\npool_size = 0\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("pool_size"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/stream.toml".into(),
            json: false,
        });
        assert!(!result.valid);
    }
}
