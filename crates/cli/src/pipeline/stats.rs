//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::WorkerKind;
use dispatcher::DispatchStats;
use feed::{FeedStats, StopReason};
use observability::PipelineMetricsAggregator;

/// Outcome of one worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    pub kind: WorkerKind,
    pub size: usize,
    /// Statuses processed by workers that exited normally
    pub processed: u64,
    /// Workers that exited with an error
    pub faulted: usize,
    /// Pool was left running at exit
    pub detached: bool,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Feed side counters
    pub feed: FeedStats,

    /// Dispatcher counters
    pub dispatch: DispatchStats,

    /// Per-pool outcome, in configuration order
    pub pools: Vec<PoolReport>,

    /// Feed ended because of a shutdown signal
    pub interrupted: bool,

    /// Statuses still queued when the pipeline returned
    pub pending: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Sampled queue / worker metrics
    pub worker_metrics: PipelineMetricsAggregator,
}

impl PipelineStats {
    /// Dispatched statuses per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Workers that exited with an error, over all pools
    pub fn faulted_workers(&self) -> usize {
        self.pools.iter().map(|p| p.faulted).sum()
    }

    fn stop_description(&self) -> String {
        if self.interrupted {
            return "shutdown signal".to_string();
        }
        match self.feed.stop_reason {
            StopReason::Exhausted => "feed exhausted".to_string(),
            StopReason::Disconnected { code } => format!("disconnected (code {code})"),
            StopReason::MaxStatuses => "status cap reached".to_string(),
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped: {}", self.stop_description());
        println!("   ├─ Statuses received: {}", self.dispatch.received);
        println!("   ├─ Enqueued: {} (failed {})", self.dispatch.enqueued, self.dispatch.failed);
        println!("   ├─ Throughput: {:.2}/s", self.throughput());
        println!("   └─ Still queued: {}", self.pending);

        let feed = &self.feed;
        println!("\n📥 Feed");
        println!("   ├─ Payloads: {}", feed.payloads);
        println!("   ├─ Empty: {}", feed.empty);
        println!("   ├─ Filtered by subscription: {}", feed.filtered);
        println!("   ├─ Invalid: {}", feed.invalid);
        println!("   ├─ Limit notices: {}", feed.limits);
        println!("   ├─ Direct messages: {}", feed.direct_messages);
        println!("   └─ Timeouts / errors: {} / {}", feed.timeouts, feed.errors);

        if !self.pools.is_empty() {
            println!("\n👷 Pools ({})", self.pools.len());
            for (i, pool) in self.pools.iter().enumerate() {
                let prefix = if i == self.pools.len() - 1 { "└─" } else { "├─" };
                let state = if pool.detached { " [detached]" } else { "" };
                println!(
                    "   {} {} x{}: processed={}, faulted={}{}",
                    prefix, pool.kind, pool.size, pool.processed, pool.faulted, state
                );
            }
        }

        println!("\n{}", self.worker_metrics.summary());
    }
}
