//! Periodic metrics sampling of queues and workers.

use std::sync::Arc;

use dispatcher::{Dispatcher, WorkQueue, WorkerMetrics, WorkerPool};
use observability::{
    record_dispatch_totals, record_queue_depth, record_worker_totals, PipelineMetricsAggregator,
};

use contracts::WorkerKind;

struct SampledWorker {
    name: String,
    kind: WorkerKind,
    metrics: Arc<WorkerMetrics>,
}

/// Samples dispatcher, queue and worker state into Prometheus and an
/// in-memory aggregate
pub struct MetricsSampler {
    queues: Vec<Arc<WorkQueue>>,
    workers: Vec<SampledWorker>,
    aggregator: PipelineMetricsAggregator,
}

impl MetricsSampler {
    /// Capture the queues and worker metrics of `pools`
    pub fn new(pools: &[WorkerPool]) -> Self {
        let queues = pools.iter().map(|p| Arc::clone(p.queue())).collect();
        let workers = pools
            .iter()
            .flat_map(|pool| {
                let kind = pool.kind();
                pool.metric_handles()
                    .into_iter()
                    .map(move |(name, metrics)| SampledWorker {
                        name,
                        kind,
                        metrics,
                    })
            })
            .collect();

        Self {
            queues,
            workers,
            aggregator: PipelineMetricsAggregator::new(),
        }
    }

    /// Take one sample
    pub fn sample(&mut self, dispatcher: &Dispatcher) {
        self.aggregator.begin_sample();

        let stats = dispatcher.stats();
        record_dispatch_totals(stats.received, stats.enqueued, stats.failed);

        for queue in &self.queues {
            record_queue_depth(queue.kind(), queue.len());
            self.aggregator.update_queue_depth(queue.kind(), queue.len());
        }

        for worker in &self.workers {
            let snapshot = worker.metrics.snapshot();
            record_worker_totals(
                &worker.name,
                worker.kind,
                snapshot.processed_count,
                snapshot.failure_count,
                snapshot.finished,
            );
            self.aggregator.update_worker(
                &worker.name,
                snapshot.processed_count,
                snapshot.failure_count,
            );
        }
    }

    /// Statuses still waiting in any queue
    pub fn pending(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    /// Consume the sampler, returning the aggregate
    pub fn into_aggregator(self) -> PipelineMetricsAggregator {
        self.aggregator
    }
}
