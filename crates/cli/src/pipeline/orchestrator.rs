//! Pipeline orchestrator - wires feed, dispatcher and worker pools.
//!
//! Startup order:
//! 1. one queue + pool per configured worker kind (configuration order)
//! 2. dispatcher over those queues, same order
//! 3. feed driver until the feed ends, the listener disconnects, or shutdown
//!
//! Afterwards pools are detached (`daemon = true`) or stopped and joined.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clients::{HttpMediaFetcher, LoggingStatusApi};
use contracts::{PostBackend, StreamBlueprint, WorkerConfig, WorkerKind};
use dispatcher::{
    Dispatcher, DispatcherError, MediaDownloadProcessor, MirrorProcessor, QueueRegistry,
    StatusProcessor, WorkerOptions, WorkerPool, WriterProcessor,
};
use feed::{ConfiguredFeed, FeedDriver, FeedStats, Subscription};
use observability::record_feed_skipped;
use tracing::{error, info, warn};

use super::{MetricsSampler, PipelineStats, PoolReport};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated stream blueprint, CLI overrides applied
    pub blueprint: StreamBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// How often queue depth and worker counters are sampled
    pub sample_interval: Duration,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the feed stops or `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let mut registry = QueueRegistry::new();
        let pools = spawn_pools(blueprint, &mut registry)?;
        let dispatcher = Dispatcher::from_registry(&registry, &blueprint.worker_kinds())
            .map_err(CliError::from)?;
        info!(
            kinds = ?dispatcher.kinds(),
            workers = blueprint.total_workers(),
            dry_run = blueprint.pipeline.dry_run,
            "Dispatcher ready"
        );

        let mut sampler = MetricsSampler::new(&pools);
        let driver = FeedDriver::new()
            .with_subscription(Subscription::new(&blueprint.stream))
            .with_max_statuses(blueprint.pipeline.max_statuses);
        let mut source = ConfiguredFeed::open(&blueprint.feed)
            .await
            .map_err(CliError::from)?;

        info!(source = ?blueprint.feed.source, "Streaming...");
        let (feed_stats, interrupted) = {
            let feed = driver.run(&mut source, &dispatcher);
            tokio::pin!(feed);
            tokio::pin!(shutdown);
            let mut ticker = tokio::time::interval(self.config.sample_interval);

            loop {
                tokio::select! {
                    result = &mut feed => break (result.map_err(CliError::from)?, false),
                    _ = &mut shutdown => {
                        warn!("Received shutdown signal, stopping feed...");
                        break (FeedStats::default(), true);
                    }
                    _ = ticker.tick() => sampler.sample(&dispatcher),
                }
            }
        };
        record_skipped(&feed_stats);

        let daemon = blueprint.pipeline.daemon;
        let mut reports = Vec::with_capacity(pools.len());
        if daemon {
            for pool in pools {
                reports.push(PoolReport {
                    kind: pool.kind(),
                    size: pool.size(),
                    processed: 0,
                    faulted: 0,
                    detached: true,
                });
                pool.detach();
            }
        } else {
            info!("Stopping worker pools...");
            for pool in &pools {
                pool.stop().map_err(CliError::from)?;
            }
            for pool in pools {
                reports.push(join_pool(pool).await);
            }
        }

        sampler.sample(&dispatcher);
        let pending = sampler.pending();
        if pending > 0 {
            warn!(pending, daemon, "Exiting with statuses still queued");
        }

        let stats = PipelineStats {
            feed: feed_stats,
            dispatch: dispatcher.stats(),
            pools: reports,
            interrupted,
            pending,
            duration: start_time.elapsed(),
            worker_metrics: sampler.into_aggregator(),
        };

        info!(
            received = stats.dispatch.received,
            duration_secs = stats.duration.as_secs_f64(),
            faulted_workers = stats.faulted_workers(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Spawn one pool per worker entry, in configuration order
fn spawn_pools(
    blueprint: &StreamBlueprint,
    registry: &mut QueueRegistry,
) -> Result<Vec<WorkerPool>, CliError> {
    let dry_run = blueprint.pipeline.dry_run;
    let fetcher = Arc::new(HttpMediaFetcher::new(&blueprint.http)?);
    let api = Arc::new(match blueprint.pipeline.post_backend {
        PostBackend::Logging => LoggingStatusApi::new(),
    });

    let mut pools = Vec::with_capacity(blueprint.workers.len());
    for config in &blueprint.workers {
        let pool = match config.kind {
            WorkerKind::Writer => {
                spawn_pool(WriterProcessor::from_config(config), config, registry, dry_run)?
            }
            WorkerKind::Mirror => spawn_pool(
                MirrorProcessor::from_config(Arc::clone(&api), Arc::clone(&fetcher), config),
                config,
                registry,
                dry_run,
            )?,
            WorkerKind::MediaDownloader => spawn_pool(
                MediaDownloadProcessor::from_config(Arc::clone(&fetcher), config),
                config,
                registry,
                dry_run,
            )?,
        };
        pools.push(pool);
    }
    Ok(pools)
}

fn spawn_pool<P>(
    processor: P,
    config: &WorkerConfig,
    registry: &mut QueueRegistry,
    global_dry_run: bool,
) -> Result<WorkerPool, DispatcherError>
where
    P: StatusProcessor + Clone,
{
    let options = WorkerOptions::from_config::<P>(config, global_dry_run)?;
    WorkerPool::spawn(processor, config.pool_size, registry, options)
}

/// Join a stopped pool; worker faults are logged and counted
async fn join_pool(pool: WorkerPool) -> PoolReport {
    let kind = pool.kind();
    let size = pool.size();
    let names: Vec<String> = pool.names().into_iter().map(String::from).collect();

    let mut report = PoolReport {
        kind,
        size,
        processed: 0,
        faulted: 0,
        detached: false,
    };
    let mut first_fault = None;
    for (name, exit) in names.iter().zip(pool.join().await) {
        match exit {
            Ok(exit) => report.processed += exit.processed(),
            Err(e) => {
                report.faulted += 1;
                error!(worker = %name, error = %e, "Worker exited with an error");
                first_fault.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if let Some(first) = first_fault {
        let summary = CliError::worker_faults(kind, report.faulted, first);
        warn!(%summary, "Pool finished with faults");
    }
    report
}

fn record_skipped(stats: &FeedStats) {
    record_feed_skipped("empty", stats.empty);
    record_feed_skipped("filtered", stats.filtered);
    record_feed_skipped("invalid", stats.invalid);
    record_feed_skipped("limit", stats.limits);
    record_feed_skipped("direct_message", stats.direct_messages);
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FeedConfig, FeedSourceKind};
    use std::io::Write;

    fn blueprint(feed_path: &std::path::Path, out: &std::path::Path) -> StreamBlueprint {
        let toml = format!(
            r#"
[feed]
source = "replay"
path = "{}"

[pipeline]
daemon = false

[[workers]]
kind = "writer"
pool_size = 2
dirname = "{}"
encoding = "utf8"
"#,
            feed_path.display(),
            out.display()
        );
        config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    #[tokio::test]
    async fn test_replay_run_writes_and_joins() {
        let dir = tempfile::tempdir().unwrap();
        let feed_path = dir.path().join("feed.ndjson");
        let mut file = std::fs::File::create(&feed_path).unwrap();
        writeln!(file, r#"{{"id": 1, "text": "first"}}"#).unwrap();
        writeln!(file, r#"{{"id": 2, "text": "second"}}"#).unwrap();
        writeln!(file, r#"{{"limit": {{"track": 3}}}}"#).unwrap();
        drop(file);

        let out = dir.path().join("out");
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(&feed_path, &out),
            metrics_port: None,
            sample_interval: Duration::from_millis(50),
        });
        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.dispatch.received, 2);
        assert_eq!(stats.feed.limits, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.pools.len(), 1);
        assert_eq!(stats.pools[0].processed, 2);
        assert_eq!(stats.faulted_workers(), 0);
        assert!(out.join("status_1.json").exists());
        assert!(out.join("status_2.json").exists());
    }

    #[tokio::test]
    async fn test_missing_replay_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint(&dir.path().join("nope.ndjson"), dir.path());
        bp.feed = FeedConfig {
            source: FeedSourceKind::Replay,
            path: Some(dir.path().join("nope.ndjson")),
            interval_ms: 0,
        };
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: bp,
            metrics_port: None,
            sample_interval: Duration::from_millis(50),
        });
        assert!(pipeline.run(std::future::pending()).await.is_err());
    }
}
