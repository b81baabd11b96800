//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use contracts::{FeedSourceKind, StreamBlueprint};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Queue depth / worker counter sampling period
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.clone()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(CliError::from)
        .context("Command line overrides produced an invalid configuration")?;

    info!(
        kinds = ?blueprint.worker_kinds(),
        workers = blueprint.total_workers(),
        follow = blueprint.stream.follow.len(),
        track = blueprint.stream.track.len(),
        daemon = blueprint.pipeline.daemon,
        dry_run = blueprint.pipeline.dry_run,
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        sample_interval: SAMPLE_INTERVAL,
    });

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        received = stats.dispatch.received,
        enqueued = stats.dispatch.enqueued,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Pipeline completed"
    );
    stats.print_summary();

    let faulted = stats.faulted_workers();
    if faulted > 0 {
        anyhow::bail!("{} worker(s) exited with an error", faulted);
    }

    info!("twitstream finished");
    Ok(())
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(blueprint: &mut StreamBlueprint, args: &RunArgs) {
    if args.dry_run {
        info!("Dry run enabled from CLI");
        blueprint.pipeline.dry_run = true;
        // CLI flag beats per-worker `dry_run = false`
        for worker in &mut blueprint.workers {
            worker.dry_run = Some(true);
        }
    }
    if let Some(size) = args.workers {
        info!(size, "Overriding every pool size from CLI");
        for worker in &mut blueprint.workers {
            worker.pool_size = size;
        }
    }
    if let Some(ref path) = args.replay {
        info!(path = %path.display(), "Replaying feed file from CLI");
        blueprint.feed.source = FeedSourceKind::Replay;
        blueprint.feed.path = Some(path.clone());
    }
    if args.stdin {
        blueprint.feed.source = FeedSourceKind::Stdin;
    }
    if let Some(ref follow) = args.follow {
        blueprint.stream.follow = follow.clone();
    }
    if let Some(ref track) = args.track {
        blueprint.stream.track = track.clone();
    }
    if let Some(max) = args.max_statuses {
        blueprint.pipeline.max_statuses = (max != 0).then_some(max);
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use contracts::{WorkerConfig, WorkerKind};

    fn args(extra: &[&str]) -> RunArgs {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            run: RunArgs,
        }
        let mut argv = vec!["twitstream"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().run
    }

    fn blueprint() -> StreamBlueprint {
        config_loader::ConfigLoader::load_from_str(
            "[[workers]]\nkind = \"writer\"\n\n[[workers]]\nkind = \"mirror\"\npool_size = 1\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let mut bp = blueprint();
        apply_overrides(
            &mut bp,
            &args(&[
                "--dry-run",
                "--workers",
                "4",
                "--replay",
                "feed.ndjson",
                "--follow",
                "7,8",
                "--max-statuses",
                "0",
            ]),
        );

        assert!(bp.pipeline.dry_run);
        assert!(bp.workers.iter().all(|w| w.pool_size == 4));
        assert_eq!(bp.feed.source, FeedSourceKind::Replay);
        assert_eq!(bp.feed.path.as_deref(), Some(std::path::Path::new("feed.ndjson")));
        assert_eq!(bp.stream.follow, vec![7, 8]);
        assert_eq!(bp.pipeline.max_statuses, None);
        assert!(config_loader::ConfigLoader::validate(&bp).is_ok());
    }

    #[test]
    fn test_dry_run_flag_overrides_worker_setting() {
        let mut bp = config_loader::ConfigLoader::load_from_str(
            "[[workers]]\nkind = \"mirror\"\npool_size = 1\ndry_run = false\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(!bp.workers[0].effective_dry_run(bp.pipeline.dry_run));

        apply_overrides(&mut bp, &args(&["--dry-run"]));
        let options = dispatcher::WorkerOptions::from_config::<
            dispatcher::MirrorProcessor<clients::MockStatusApi, clients::MockMediaFetcher>,
        >(&bp.workers[0], bp.pipeline.dry_run)
        .unwrap();
        assert!(options.dry_run);
    }

    #[test]
    fn test_out_of_range_workers_fail_revalidation() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &args(&["--workers", "12"]));
        assert!(config_loader::ConfigLoader::validate(&bp).is_err());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut bp = blueprint();
        bp.workers.push(WorkerConfig::new(WorkerKind::MediaDownloader));
        let before = bp.worker_kinds();
        apply_overrides(&mut bp, &args(&[]));
        assert_eq!(bp.worker_kinds(), before);
        assert!(!bp.pipeline.dry_run);
    }
}
