//! Status pipeline 指标收集模块
//!
//! 采样 dispatcher、队列与 worker 的运行状态并导出为 Prometheus 指标。

use std::collections::BTreeMap;

use contracts::WorkerKind;
use metrics::{counter, gauge, histogram};

/// 记录 dispatcher 的累计计数
///
/// 取值来自 dispatcher 的累计计数，因此使用 absolute。
pub fn record_dispatch_totals(received: u64, enqueued: u64, failed: u64) {
    counter!("twitstream_statuses_received_total").absolute(received);
    counter!("twitstream_statuses_enqueued_total").absolute(enqueued);
    counter!("twitstream_enqueue_failures_total").absolute(failed);
}

/// 记录队列深度
pub fn record_queue_depth(kind: WorkerKind, depth: usize) {
    gauge!("twitstream_queue_depth", "kind" => kind.as_str()).set(depth as f64);
    histogram!("twitstream_queue_depth_hist", "kind" => kind.as_str()).record(depth as f64);
}

/// 记录单个 worker 的累计处理结果
pub fn record_worker_totals(
    worker: &str,
    kind: WorkerKind,
    processed: u64,
    failures: u64,
    finished: bool,
) {
    counter!(
        "twitstream_statuses_processed_total",
        "worker" => worker.to_string(),
        "kind" => kind.as_str()
    )
    .absolute(processed);

    counter!(
        "twitstream_worker_faults_total",
        "worker" => worker.to_string(),
        "kind" => kind.as_str()
    )
    .absolute(failures);

    gauge!(
        "twitstream_worker_alive",
        "worker" => worker.to_string(),
        "kind" => kind.as_str()
    )
    .set(if finished { 0.0 } else { 1.0 });
}

/// 记录 feed 侧被跳过的 payload
pub fn record_feed_skipped(reason: &'static str, count: u64) {
    if count > 0 {
        counter!("twitstream_feed_skipped_total", "reason" => reason).increment(count);
    }
}

/// Pipeline 指标聚合器
///
/// 在内存中聚合采样结果，便于退出时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PipelineMetricsAggregator {
    /// 采样次数
    pub samples: u64,

    /// 各队列深度统计
    pub queue_depth: BTreeMap<WorkerKind, RunningStats>,

    /// 各 worker 最近一次的 (processed, failures)
    pub workers: BTreeMap<String, (u64, u64)>,
}

impl PipelineMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一次新的采样
    pub fn begin_sample(&mut self) {
        self.samples += 1;
    }

    /// 记录队列深度采样
    pub fn update_queue_depth(&mut self, kind: WorkerKind, depth: usize) {
        self.queue_depth
            .entry(kind)
            .or_default()
            .push(depth as f64);
    }

    /// 记录 worker 的累计值
    pub fn update_worker(&mut self, worker: &str, processed: u64, failures: u64) {
        self.workers
            .insert(worker.to_string(), (processed, failures));
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            samples: self.samples,
            total_processed: self.workers.values().map(|(p, _)| p).sum(),
            total_failures: self.workers.values().map(|(_, f)| f).sum(),
            queue_depth: self
                .queue_depth
                .iter()
                .map(|(kind, stats)| (kind.as_str().to_string(), StatsSummary::from(stats)))
                .collect(),
            workers: self.workers.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub samples: u64,
    pub total_processed: u64,
    pub total_failures: u64,
    pub queue_depth: BTreeMap<String, StatsSummary>,
    pub workers: BTreeMap<String, (u64, u64)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Metrics Summary ===")?;
        writeln!(f, "Samples: {}", self.samples)?;
        writeln!(f, "Statuses processed: {}", self.total_processed)?;
        writeln!(f, "Worker faults: {}", self.total_failures)?;

        if !self.queue_depth.is_empty() {
            writeln!(f, "Queue depth:")?;
            for (kind, stats) in &self.queue_depth {
                writeln!(f, "  {}: {}", kind, stats)?;
            }
        }

        if !self.workers.is_empty() {
            writeln!(f, "Workers:")?;
            for (worker, (processed, failures)) in &self.workers {
                writeln!(f, "  {}: processed={}, faults={}", worker, processed, failures)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.0}, max={:.0}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
