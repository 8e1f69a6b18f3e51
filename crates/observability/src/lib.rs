//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 分发结果与 route 结果的指标记录及统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{metrics, LogFormat, ObservabilityConfig};
//!
//! // 初始化（Pretty 格式，stderr）
//! observability::init()?;
//!
//! // 或按 CLI 选项初始化
//! observability::init_with_config(
//!     ObservabilityConfig::from_verbosity(1, false).with_format(LogFormat::Json),
//! )?;
//!
//! // 记录一次分发结果
//! metrics::record_dispatch(Protocol::Http, DispatchStatus::Success, 12.5);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_dispatch, record_route_in_flight, record_route_outcome, DispatchSample,
    DispatchStatsAggregator, DispatchStatus, DispatchSummary, RouteOutcomeKind, RunningStats,
    StatsSummary,
};

/// 以默认配置初始化（Pretty 日志到 stderr，不启用 Prometheus）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别（`RUST_LOG` 未设置时生效）
    pub level: String,
    /// 忽略 `RUST_LOG`，强制使用 `level`
    pub override_env: bool,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: "info".to_string(),
            override_env: false,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// 由 `-v` 次数与 `--quiet` 推导级别；`quiet` 时忽略 `RUST_LOG`
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            level: level.to_string(),
            override_env: quiet,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    /// 解析后的过滤指令：`env` 为 `RUST_LOG` 的值
    fn directive(&self, env: Option<&str>) -> String {
        match env {
            Some(env) if !self.override_env && !env.trim().is_empty() => env.to_string(),
            _ => self.level.clone(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化
///
/// 日志写到 stderr，stdout 留给命令输出。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(config.directive(env.as_deref()))
        .context("Invalid log filter directive")?;

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于按需开启指标导出的场景，例如 `switchyard dispatch --metrics-port`。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
