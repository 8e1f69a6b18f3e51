//! 分发指标收集模块
//!
//! 记录每次分发的最终结果、每个 route 的调用结果，并在内存中聚合统计。

use std::collections::HashMap;

use contracts::Protocol;
use metrics::{counter, gauge, histogram};

/// 一次分发的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    /// 某个 route 返回了成功响应
    Success,
    /// 所有候选 route 都失败或超时
    Unavailable,
    /// 调用方取消
    Cancelled,
    /// 策略或候选列表错误
    Error,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Success => "success",
            DispatchStatus::Unavailable => "unavailable",
            DispatchStatus::Cancelled => "cancelled",
            DispatchStatus::Error => "error",
        }
    }
}

/// 单个 route 调用的结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteOutcomeKind {
    /// 成功响应
    Success,
    /// 收到响应但状态码非成功
    NonSuccess,
    /// 传输/协议错误
    Failed,
    /// 超时
    Timeout,
    /// 被取消
    Cancelled,
}

impl RouteOutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteOutcomeKind::Success => "success",
            RouteOutcomeKind::NonSuccess => "non_success",
            RouteOutcomeKind::Failed => "failed",
            RouteOutcomeKind::Timeout => "timeout",
            RouteOutcomeKind::Cancelled => "cancelled",
        }
    }
}

/// 记录一次分发结果
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_dispatch, DispatchStatus};
///
/// record_dispatch(Protocol::Rpc, DispatchStatus::Unavailable, 250.0);
/// ```
pub fn record_dispatch(protocol: Protocol, status: DispatchStatus, latency_ms: f64) {
    let protocol = protocol.to_string();
    counter!(
        "switchyard_dispatch_total",
        "protocol" => protocol.clone(),
        "result" => status.as_str()
    )
    .increment(1);

    histogram!("switchyard_dispatch_latency_ms", "protocol" => protocol).record(latency_ms);
}

/// 记录单个 route 的调用结果
pub fn record_route_outcome(route: &str, kind: RouteOutcomeKind, latency_ms: f64) {
    counter!(
        "switchyard_route_outcomes_total",
        "route" => route.to_string(),
        "outcome" => kind.as_str()
    )
    .increment(1);

    histogram!("switchyard_route_latency_ms", "route" => route.to_string()).record(latency_ms);
}

/// 记录 route 当前在途请求数
pub fn record_route_in_flight(route: &str, in_flight: usize) {
    gauge!("switchyard_routes_in_flight", "route" => route.to_string()).set(in_flight as f64);
}

/// 聚合器的一条输入
#[derive(Debug, Clone)]
pub struct DispatchSample {
    pub status: DispatchStatus,
    /// 成功时响应来自的 route
    pub backend: Option<String>,
    pub latency_ms: f64,
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 总分发次数
    pub total: u64,

    /// 各状态次数
    pub status_counts: HashMap<DispatchStatus, u64>,

    /// 各 backend 胜出次数
    pub backend_counts: HashMap<String, u64>,

    /// 延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &DispatchSample) {
        self.total += 1;
        *self.status_counts.entry(sample.status).or_insert(0) += 1;

        if let Some(backend) = &sample.backend {
            *self.backend_counts.entry(backend.clone()).or_insert(0) += 1;
        }

        self.latency_stats.push(sample.latency_ms);
    }

    /// 某个状态的次数
    pub fn count(&self, status: DispatchStatus) -> u64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        let successes = self.count(DispatchStatus::Success);
        DispatchSummary {
            total: self.total,
            successes,
            unavailable: self.count(DispatchStatus::Unavailable),
            cancelled: self.count(DispatchStatus::Cancelled),
            errors: self.count(DispatchStatus::Error),
            success_rate: if self.total > 0 {
                successes as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            backend_counts: self.backend_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    pub successes: u64,
    pub unavailable: u64,
    pub cancelled: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub backend_counts: HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Total dispatches: {}", self.total)?;
        writeln!(
            f,
            "Successful: {} ({:.2}%)",
            self.successes, self.success_rate
        )?;
        writeln!(f, "Unavailable: {}", self.unavailable)?;
        writeln!(f, "Cancelled: {}", self.cancelled)?;
        if self.errors > 0 {
            writeln!(f, "Errors: {}", self.errors)?;
        }
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.backend_counts.is_empty() {
            writeln!(f, "Responses per backend:")?;
            let mut backends: Vec<_> = self.backend_counts.iter().collect();
            backends.sort();
            for (backend, count) in backends {
                writeln!(f, "  {}: {}", backend, count)?;
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
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
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

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
