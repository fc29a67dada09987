//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 监控和追踪模块
//!
//! - `telemetry` feature：基于 tracing-subscriber 的日志初始化
//! - `monitoring` feature：Prometheus 指标
//!
//! # 示例
//!
//! ```rust,ignore
//! use chatguard::telemetry::{init_tracing, Metrics};
//!
//! init_tracing("info");
//! let metrics = Metrics::new().unwrap();
//! metrics.evaluations_total.inc();
//! println!("{}", metrics.gather());
//! ```

#[cfg(feature = "monitoring")]
use crate::error::Decision;
#[cfg(feature = "monitoring")]
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
#[cfg(feature = "monitoring")]
use std::time::Duration;
#[cfg(feature = "monitoring")]
use tracing::error;

/// 初始化全局 tracing 订阅者
///
/// 优先使用 `RUST_LOG` 环境变量，未设置时使用 `default_filter`。
/// 重复调用不会报错，只有第一次生效。
#[cfg(feature = "telemetry")]
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// 监控指标
#[cfg(feature = "monitoring")]
#[derive(Clone)]
pub struct Metrics {
    /// 准入检查总数
    pub evaluations_total: Counter,
    /// 允许数
    pub allowed_total: Counter,
    /// 拒绝数（消息本身不可接受）
    pub rejected_total: Counter,
    /// 节流数
    pub throttled_total: Counter,
    /// 封禁数
    pub banned_total: Counter,
    /// 检查延迟分布
    pub evaluation_duration: Histogram,
    /// 预算使用率（0-100）
    pub budget_usage_percent: Gauge,
    /// 黑名单大小
    pub blacklist_size: Gauge,
    /// 指标注册表
    registry: Registry,
}

#[cfg(feature = "monitoring")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter, prometheus::Error> {
    let counter = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

#[cfg(feature = "monitoring")]
fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let gauge = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

#[cfg(feature = "monitoring")]
impl Metrics {
    /// 创建新的监控指标，并注册到私有注册表
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let evaluation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "chatguard_evaluation_duration_seconds",
                "Duration of admission checks in seconds",
            )
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01]),
        )?;
        registry.register(Box::new(evaluation_duration.clone()))?;

        Ok(Self {
            evaluations_total: counter(
                &registry,
                "chatguard_evaluations_total",
                "Total number of admission checks",
            )?,
            allowed_total: counter(
                &registry,
                "chatguard_allowed_total",
                "Total number of admitted messages",
            )?,
            rejected_total: counter(
                &registry,
                "chatguard_rejected_total",
                "Total number of rejected messages",
            )?,
            throttled_total: counter(
                &registry,
                "chatguard_throttled_total",
                "Total number of throttled messages",
            )?,
            banned_total: counter(
                &registry,
                "chatguard_banned_total",
                "Total number of messages refused because the sender is blacklisted",
            )?,
            evaluation_duration,
            budget_usage_percent: gauge(
                &registry,
                "chatguard_budget_usage_percent",
                "Daily token budget usage as percentage",
            )?,
            blacklist_size: gauge(
                &registry,
                "chatguard_blacklist_size",
                "Current number of blacklisted users",
            )?,
            registry,
        })
    }

    /// 记录一次准入检查
    pub fn record_decision(&self, decision: &Decision, duration: Duration) {
        self.evaluation_duration.observe(duration.as_secs_f64());
        self.evaluations_total.inc();
        match decision {
            Decision::Allowed => self.allowed_total.inc(),
            Decision::Rejected(_) => self.rejected_total.inc(),
            Decision::Throttled(_) => self.throttled_total.inc(),
            Decision::Banned(_) => self.banned_total.inc(),
        }
    }

    /// 更新预算使用率
    pub fn update_budget_usage(&self, percent: f64) {
        self.budget_usage_percent.set(percent);
    }

    /// 更新黑名单大小
    pub fn update_blacklist_size(&self, size: usize) {
        self.blacklist_size.set(size as f64);
    }

    /// 收集所有指标并返回Prometheus格式的文本
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

// ============================================================================
// 单元测试
// ============================================================================
