//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 配额控制器模块
//!
//! 全进程共享的每日令牌预算：
//! - 准入时按预估值检查下一次调用是否会超出预算
//! - 生成完成后单独提交实际用量
//! - 截止时间过后在下一次访问时惰性重置（没有后台定时器）
//! - 使用率告警，每个周期每个阈值只告警一次

use crate::config::{BudgetConfig, ResetAnchor};
use crate::constants::CHARS_PER_TOKEN;
use crate::error::GuardError;
use crate::limiters::to_std;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// 估算文本的令牌数
///
/// 近似值：字符数除以 4（按 Unicode 标量计数）。
///
/// # 示例
/// ```rust
/// use chatguard::quota_controller::estimate_tokens;
///
/// assert_eq!(estimate_tokens("12345678"), 2);
/// assert_eq!(estimate_tokens("abc"), 0);
/// ```
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN) as u64
}

/// 预算不足
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetExceeded {
    /// 本周期已用
    pub used: u64,
    /// 每日上限
    pub limit: u64,
    /// 本次预估
    pub estimated: u64,
    /// 下次重置时间
    pub resets_at: DateTime<Utc>,
    /// 距离重置的时间
    pub retry_after: std::time::Duration,
}

/// 用量提交结果
#[derive(Debug, Clone, PartialEq)]
pub struct UsageCommit {
    /// 本次提交的令牌数
    pub committed: u64,
    /// 提交后本周期总用量
    pub total_used: u64,
    /// 剩余预算（不低于0）
    pub remaining: u64,
    /// 本次提交触发的告警阈值
    pub alert_threshold: Option<u8>,
}

/// 预算快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percentage: f64,
    pub resets_at: DateTime<Utc>,
}

/// 预算状态
#[derive(Debug)]
struct QuotaState {
    /// 已消费量
    consumed: u64,
    /// 周期截止时间
    resets_at: DateTime<Utc>,
    /// 本周期已触发的最高告警阈值
    alerted_upto: u8,
}

/// 配额控制器
///
/// 检查、提交和重置都在同一把锁内完成，跨越截止时间的重置只会发生一次。
pub struct QuotaController {
    config: BudgetConfig,
    period: Duration,
    /// 升序排列的告警阈值
    thresholds: Vec<u8>,
    state: Mutex<QuotaState>,
}

impl QuotaController {
    /// 创建新的配额控制器
    ///
    /// # 参数
    /// - `config`: 已校验的预算配置
    /// - `now`: 当前时间，用于确定第一个截止时间
    ///
    /// 预算周期超出可表示范围时返回 `GuardError::ConfigError`。
    pub fn new(config: BudgetConfig, now: DateTime<Utc>) -> Result<Self, GuardError> {
        let period = config.period()?;
        let resets_at = first_deadline(config.anchor, period, now);
        let mut thresholds = config.alert_thresholds.clone();
        thresholds.sort_unstable();
        thresholds.dedup();

        Ok(Self {
            config,
            period,
            thresholds,
            state: Mutex::new(QuotaState {
                consumed: 0,
                resets_at,
                alerted_upto: 0,
            }),
        })
    }

    /// 每日上限
    pub fn limit(&self) -> u64 {
        self.config.daily_tokens
    }

    /// 准入预估值
    pub fn admission_estimate(&self) -> u64 {
        self.config.admission_estimate
    }

    fn roll_over(&self, state: &mut QuotaState, now: DateTime<Utc>) {
        if now > state.resets_at {
            let previous = state.consumed;
            state.resets_at = next_deadline(state.resets_at, self.period, now);
            state.consumed = 0;
            state.alerted_upto = 0;
            info!(
                "Daily token budget reset (previous usage: {}, next reset: {})",
                previous,
                state.resets_at.to_rfc3339()
            );
        }
    }

    /// 检查预估用量是否会超出预算
    ///
    /// 只检查不预留；实际用量通过 [`commit`](Self::commit) 提交。
    pub fn check(&self, estimated: u64, now: DateTime<Utc>) -> Result<(), BudgetExceeded> {
        let mut state = self.state.lock();
        self.roll_over(&mut state, now);

        if state.consumed.saturating_add(estimated) > self.config.daily_tokens {
            warn!(
                "Daily budget exceeded! Used: {}, Estimated: {}, Budget: {}",
                state.consumed, estimated, self.config.daily_tokens
            );
            return Err(BudgetExceeded {
                used: state.consumed,
                limit: self.config.daily_tokens,
                estimated,
                resets_at: state.resets_at,
                retry_after: to_std(state.resets_at - now),
            });
        }

        Ok(())
    }

    /// 使用配置的准入预估值检查
    pub fn check_admission(&self, now: DateTime<Utc>) -> Result<(), BudgetExceeded> {
        self.check(self.admission_estimate(), now)
    }

    /// 提交实际用量
    pub fn commit(&self, tokens: u64, now: DateTime<Utc>) -> UsageCommit {
        let mut state = self.state.lock();
        self.roll_over(&mut state, now);

        state.consumed = state.consumed.saturating_add(tokens);
        let limit = self.config.daily_tokens;
        let percent = (state.consumed as u128 * 100 / limit as u128).min(u8::MAX as u128) as u8;

        let alert_threshold = self
            .thresholds
            .iter()
            .copied()
            .filter(|t| *t <= percent && *t > state.alerted_upto)
            .max();

        if let Some(threshold) = alert_threshold {
            state.alerted_upto = threshold;
            warn!(
                "Token budget usage reached {}% ({}/{})",
                threshold, state.consumed, limit
            );
        }

        debug!("Tokens used today: {}/{}", state.consumed, limit);

        UsageCommit {
            committed: tokens,
            total_used: state.consumed,
            remaining: limit.saturating_sub(state.consumed),
            alert_threshold,
        }
    }

    /// 读取快照（不修改状态）
    ///
    /// 已过截止时间但尚未被访问的周期按已重置报告。
    pub fn snapshot(&self, now: DateTime<Utc>) -> QuotaSnapshot {
        let state = self.state.lock();
        let (used, resets_at) = if now > state.resets_at {
            (0, next_deadline(state.resets_at, self.period, now))
        } else {
            (state.consumed, state.resets_at)
        };
        drop(state);

        let limit = self.config.daily_tokens;
        QuotaSnapshot {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            percentage: used as f64 / limit as f64 * 100.0,
            resets_at,
        }
    }

    /// 清零用量（保留截止时间）
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.consumed = 0;
        state.alerted_upto = 0;
    }
}

/// 第一个周期的截止时间
fn first_deadline(anchor: ResetAnchor, period: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    match anchor {
        ResetAnchor::Rolling => now + period,
        ResetAnchor::UtcMidnight => now
            .date_naive()
            .succ_opt()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .unwrap_or(now + period),
    }
}

/// 把截止时间推进整数个周期，使其严格晚于 `now`
fn next_deadline(resets_at: DateTime<Utc>, period: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    let period_ms = period.num_milliseconds().max(1);
    let overdue_ms = (now - resets_at).num_milliseconds().max(0);
    let periods = overdue_ms / period_ms + 1;
    resets_at + Duration::milliseconds(period_ms.saturating_mul(periods))
}

// ============================================================================
// 单元测试
// ============================================================================
