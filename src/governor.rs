//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Governor 主控制器
//!
//! 聊天消息准入控制的核心，按顺序执行：
//! 1. 黑名单检查
//! 2. 消息长度检查
//! 3. 可疑消息检测（累计达到阈值后自动拉黑）
//! 4. 多窗口滑动限流
//! 5. 冷却检查
//! 6. 全局令牌预算检查
//!
//! 第3-5步在该用户的 DashMap 条目锁内执行，同一用户的并发消息串行化，
//! 限流上限是严格上界。锁顺序：可以在持有用户条目锁时获取预算锁，反之不行。

use crate::ban_manager::{Blacklist, BlacklistEntry};
use crate::config::{AdmissionMode, GuardConfig};
use crate::constants::{AUTO_BAN_REASON, DEFAULT_PURGE_INTERVAL_SECS};
use crate::detector::{HeuristicDetector, SuspicionDetector};
use crate::error::{Decision, Denial, DenialCause, GuardError};
use crate::identifier::UserId;
use crate::limiters::{to_std, ActivityWindow, CooldownGate, WindowLimiter, WindowUsage};
use crate::log_redaction::{display_user, preview_text};
use crate::quota_controller::{estimate_tokens, QuotaController, UsageCommit};
#[cfg(feature = "monitoring")]
use crate::telemetry::Metrics;
use ahash::RandomState;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 单个用户的准入状态
#[derive(Debug, Default)]
struct UserState {
    /// 被接受消息的时间戳
    window: ActivityWindow,
    /// 最后一次通过冷却检查的时间
    last_accepted: Option<DateTime<Utc>>,
    /// 可疑消息计数
    suspicion: u32,
}

/// 配置的限制值（用于展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitSummary {
    pub messages_per_minute: u32,
    pub messages_per_hour: u32,
    pub messages_per_day: u32,
    pub cooldown_secs: f64,
    pub max_message_length: usize,
}

/// 统计快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernorStats {
    /// 本周期已用令牌
    pub tokens_used_today: u64,
    /// 每日预算
    pub daily_budget: u64,
    /// 剩余预算（不低于0）
    pub budget_remaining: u64,
    /// 预算使用率
    pub budget_percentage: f64,
    /// 黑名单人数
    pub blacklisted_users: usize,
    /// 至少有一次可疑记录的用户数
    pub suspicious_users: usize,
    /// 当前持有状态的用户数
    pub tracked_users: usize,
    /// 统计起点
    pub stats_since: DateTime<Utc>,
    /// 预算下次重置时间
    pub budget_resets_at: DateTime<Utc>,
    pub limits: LimitSummary,
}

impl GovernorStats {
    /// 序列化为 JSON
    pub fn to_json(&self) -> Result<String, GuardError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 单个用户的状态报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReport {
    pub user: UserId,
    /// 各窗口内被接受的消息数
    pub usage: WindowUsage,
    pub last_accepted: Option<DateTime<Utc>>,
    /// 剩余冷却时间
    pub cooldown_remaining: Option<std::time::Duration>,
    /// 可疑消息计数
    pub suspicion: u32,
    /// 黑名单条目
    pub blacklist: Option<BlacklistEntry>,
}

/// Governor 主控制器
///
/// 所有共享状态都在实例内，测试可以创建相互隔离的实例。
///
/// # 示例
/// ```rust
/// use chatguard::config::GuardConfig;
/// use chatguard::governor::Governor;
/// use chatguard::identifier::UserId;
///
/// let governor = Governor::new(GuardConfig::default()).unwrap();
/// let user = UserId::from(42_i64);
///
/// let decision = governor.evaluate(&user, "Hello!");
/// assert!(decision.is_allowed());
///
/// // 生成回复后提交实际用量
/// governor.commit_usage(&user, "Hello!", "You are a helpful assistant.", "Hi there!");
/// ```
pub struct Governor {
    config: GuardConfig,
    limiter: WindowLimiter,
    cooldown: CooldownGate,
    detector: Arc<dyn SuspicionDetector>,
    users: DashMap<UserId, UserState, RandomState>,
    blacklist: Blacklist,
    quota: QuotaController,
    stats_since: RwLock<DateTime<Utc>>,
    #[cfg(feature = "monitoring")]
    metrics: Option<Arc<Metrics>>,
}

impl Governor {
    /// 创建新的 Governor 实例
    ///
    /// 配置无效时返回 `GuardError::ConfigError`。
    pub fn new(config: GuardConfig) -> Result<Self, GuardError> {
        Self::new_at(config, Utc::now())
    }

    /// 以指定时间作为统计起点和预算周期起点创建实例
    pub fn new_at(config: GuardConfig, now: DateTime<Utc>) -> Result<Self, GuardError> {
        config.validate().map_err(GuardError::ConfigError)?;

        let detector = Arc::new(HeuristicDetector::new(
            &config.spam,
            config.max_message_length,
        ));

        info!(
            "Governor initialized: {}/{}/{} messages per minute/hour/day, cooldown {}s, budget {} tokens",
            config.rate_limits.messages_per_minute,
            config.rate_limits.messages_per_hour,
            config.rate_limits.messages_per_day,
            config.cooldown_secs,
            config.budget.daily_tokens
        );

        Ok(Self {
            limiter: WindowLimiter::new(&config.rate_limits)?,
            cooldown: CooldownGate::new(config.cooldown()?),
            detector,
            users: DashMap::with_hasher(RandomState::new()),
            blacklist: Blacklist::new(),
            quota: QuotaController::new(config.budget.clone(), now)?,
            stats_since: RwLock::new(now),
            #[cfg(feature = "monitoring")]
            metrics: None,
            config,
        })
    }

    /// 替换可疑消息检测器
    pub fn with_detector(mut self, detector: Arc<dyn SuspicionDetector>) -> Self {
        debug!("Using suspicion detector: {}", detector.name());
        self.detector = detector;
        self
    }

    /// 挂载监控指标
    #[cfg(feature = "monitoring")]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 当前配置
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    fn display(&self, user: &UserId) -> String {
        display_user(user, self.config.redact_identities)
    }

    fn preview(&self, text: &str) -> String {
        if self.config.redact_identities {
            format!("<{} chars>", text.chars().count())
        } else {
            preview_text(text)
        }
    }

    fn denial(&self, cause: DenialCause, retry_after: Option<std::time::Duration>) -> Denial {
        Denial {
            reason: self.config.locale.render(&cause),
            cause,
            retry_after,
        }
    }

    // ==================== 准入检查 ====================

    /// 检查一条消息是否可以处理
    pub fn evaluate(&self, user: &UserId, text: &str) -> Decision {
        self.evaluate_at(user, text, Utc::now())
    }

    /// 以指定时间检查一条消息
    #[instrument(level = "debug", skip_all, fields(user = %self.display(user)))]
    pub fn evaluate_at(&self, user: &UserId, text: &str, now: DateTime<Utc>) -> Decision {
        #[cfg(feature = "monitoring")]
        let start = std::time::Instant::now();

        let decision = self.admit(user, text, now);

        #[cfg(feature = "monitoring")]
        self.record_metrics(&decision, start.elapsed());

        decision
    }

    fn admit(&self, user: &UserId, text: &str, now: DateTime<Utc>) -> Decision {
        let who = self.display(user);

        if self.blacklist.contains(user) {
            warn!("Blacklisted user attempted access: {}", who);
            return Decision::Banned(self.denial(DenialCause::Blacklisted, None));
        }

        let length = text.chars().count();
        if length > self.config.max_message_length {
            warn!("Message too long from user {}: {} chars", who, length);
            return Decision::Rejected(self.denial(
                DenialCause::MessageTooLong {
                    limit: self.config.max_message_length,
                    actual: length,
                },
                None,
            ));
        }

        let suspicious = self.detector.is_suspicious(text);
        let sequential = self.config.admission == AdmissionMode::Sequential;
        let threshold = self.config.spam.suspicion_threshold;

        let mut state = self.users.entry(user.clone()).or_default();

        if suspicious {
            state.suspicion = state.suspicion.saturating_add(1);
            let strikes = state.suspicion;
            warn!(
                "Suspicious message from user {} ({}/{}): {}",
                who,
                strikes,
                threshold,
                self.preview(text)
            );

            if strikes >= threshold {
                drop(state);
                if self.blacklist.ban_auto(user, AUTO_BAN_REASON, now) {
                    warn!("User {} auto-blacklisted for suspicious activity", who);
                }
                return Decision::Banned(
                    self.denial(DenialCause::SuspiciousActivity { strikes }, None),
                );
            }
        }

        let rate = if sequential {
            self.limiter.check_and_record(&mut state.window, now)
        } else {
            self.limiter.check(&mut state.window, now)
        };
        if let Err(breach) = rate {
            warn!(
                "Rate limit exceeded for user {}: {} messages per {} (limit {})",
                who, breach.count, breach.window, breach.limit
            );
            return Decision::Throttled(self.denial(
                DenialCause::RateLimited {
                    window: breach.window,
                    limit: breach.limit,
                },
                Some(breach.retry_after),
            ));
        }

        if let Err(remaining) = self.cooldown.check(&mut state.last_accepted, now) {
            debug!(
                "Cooldown active for user {}: {:.1}s remaining",
                who,
                remaining.as_secs_f64()
            );
            return Decision::Throttled(
                self.denial(DenialCause::Cooldown { remaining }, Some(remaining)),
            );
        }
        if sequential {
            state.last_accepted = Some(now);
        }

        if let Err(exceeded) = self.quota.check_admission(now) {
            return Decision::Throttled(self.denial(
                DenialCause::BudgetExhausted {
                    used: exceeded.used,
                    limit: exceeded.limit,
                },
                Some(exceeded.retry_after),
            ));
        }

        if !sequential {
            state.window.record(now);
            state.last_accepted = Some(now);
        }

        debug!("Message admitted for user {}", who);
        Decision::Allowed
    }

    #[cfg(feature = "monitoring")]
    fn record_metrics(&self, decision: &Decision, elapsed: std::time::Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision, elapsed);
            metrics.update_blacklist_size(self.blacklist.len());
        }
    }

    // ==================== 用量提交 ====================

    /// 生成完成后提交本次调用的令牌用量
    pub fn commit_usage(
        &self,
        user: &UserId,
        user_text: &str,
        system_prompt: &str,
        reply: &str,
    ) -> UsageCommit {
        self.commit_usage_at(user, user_text, system_prompt, reply, Utc::now())
    }

    /// 以指定时间提交用量
    #[instrument(level = "debug", skip_all, fields(user = %self.display(user)))]
    pub fn commit_usage_at(
        &self,
        user: &UserId,
        user_text: &str,
        system_prompt: &str,
        reply: &str,
        now: DateTime<Utc>,
    ) -> UsageCommit {
        let tokens =
            estimate_tokens(user_text) + estimate_tokens(system_prompt) + estimate_tokens(reply);
        self.add_tokens_at(tokens, now)
    }

    /// 直接累加令牌数
    pub fn add_tokens(&self, tokens: u64) -> UsageCommit {
        self.add_tokens_at(tokens, Utc::now())
    }

    /// 以指定时间累加令牌数
    pub fn add_tokens_at(&self, tokens: u64, now: DateTime<Utc>) -> UsageCommit {
        let commit = self.quota.commit(tokens, now);

        #[cfg(feature = "monitoring")]
        self.record_budget_usage(&commit);

        commit
    }

    #[cfg(feature = "monitoring")]
    fn record_budget_usage(&self, commit: &UsageCommit) {
        if let Some(metrics) = &self.metrics {
            metrics.update_budget_usage(
                commit.total_used as f64 / self.quota.limit() as f64 * 100.0,
            );
        }
    }

    // ==================== 管理操作 ====================

    /// 手动拉黑用户
    ///
    /// 返回是否为新增；已在黑名单中的用户保留原条目。
    #[instrument(skip_all, fields(user = %self.display(user)))]
    pub fn blacklist_user(
        &self,
        user: &UserId,
        reason: &str,
        operator: &str,
    ) -> Result<bool, GuardError> {
        let added = self
            .blacklist
            .ban_manual(user, reason, operator, Utc::now())?;
        if added {
            info!(
                "User {} blacklisted by {}: {}",
                self.display(user),
                operator.trim(),
                reason.trim()
            );
        }
        Ok(added)
    }

    /// 解除拉黑
    ///
    /// 不影响该用户的可疑计数。
    #[instrument(skip_all, fields(user = %self.display(user)))]
    pub fn unblacklist_user(&self, user: &UserId) -> bool {
        let removed = self.blacklist.remove(user).is_some();
        if removed {
            info!("User {} removed from blacklist", self.display(user));
        }
        removed
    }

    /// 是否在黑名单中
    pub fn is_blacklisted(&self, user: &UserId) -> bool {
        self.blacklist.contains(user)
    }

    /// 黑名单列表（按封禁时间排序）
    pub fn blacklisted_users(&self) -> Vec<BlacklistEntry> {
        self.blacklist.list()
    }

    /// 清零单个用户的可疑计数，返回原值
    pub fn pardon(&self, user: &UserId) -> u32 {
        let previous = self
            .users
            .get_mut(user)
            .map(|mut state| std::mem::take(&mut state.suspicion))
            .unwrap_or(0);
        if previous > 0 {
            info!(
                "Suspicion counter cleared for user {} (was {})",
                self.display(user),
                previous
            );
        }
        previous
    }

    /// 查看单个用户的状态
    pub fn inspect_user(&self, user: &UserId) -> UserReport {
        self.inspect_user_at(user, Utc::now())
    }

    /// 以指定时间查看单个用户的状态
    pub fn inspect_user_at(&self, user: &UserId, now: DateTime<Utc>) -> UserReport {
        let (usage, last_accepted, suspicion) = match self.users.get(user) {
            Some(state) => (
                self.limiter.usage(&state.window, now),
                state.last_accepted,
                state.suspicion,
            ),
            None => (WindowUsage::default(), None, 0),
        };

        let cooldown_remaining = last_accepted
            .map(|last| to_std(self.cooldown.cooldown() - (now - last)))
            .filter(|remaining| !remaining.is_zero());

        UserReport {
            user: user.clone(),
            usage,
            last_accepted,
            cooldown_remaining,
            suspicion,
            blacklist: self.blacklist.get(user),
        }
    }

    /// 清空所有计数（滑动窗口、冷却、可疑计数、黑名单、令牌用量）
    ///
    /// 预算截止时间保持不变。
    pub fn reset_all(&self) {
        self.reset_all_at(Utc::now())
    }

    /// 以指定时间清空所有计数，统计起点设为 `now`
    #[instrument(skip(self))]
    pub fn reset_all_at(&self, now: DateTime<Utc>) {
        self.users.clear();
        self.blacklist.clear();
        self.quota.reset();
        *self.stats_since.write() = now;
        info!("All admission counters reset");
    }

    /// 统计快照
    pub fn stats(&self) -> GovernorStats {
        self.stats_at(Utc::now())
    }

    /// 以指定时间生成统计快照
    pub fn stats_at(&self, now: DateTime<Utc>) -> GovernorStats {
        let budget = self.quota.snapshot(now);
        let suspicious_users = self
            .users
            .iter()
            .filter(|entry| entry.value().suspicion > 0)
            .count();

        GovernorStats {
            tokens_used_today: budget.used,
            daily_budget: budget.limit,
            budget_remaining: budget.remaining,
            budget_percentage: budget.percentage,
            blacklisted_users: self.blacklist.len(),
            suspicious_users,
            tracked_users: self.users.len(),
            stats_since: *self.stats_since.read(),
            budget_resets_at: budget.resets_at,
            limits: LimitSummary {
                messages_per_minute: self.config.rate_limits.messages_per_minute,
                messages_per_hour: self.config.rate_limits.messages_per_hour,
                messages_per_day: self.config.rate_limits.messages_per_day,
                cooldown_secs: self.config.cooldown_secs,
                max_message_length: self.config.max_message_length,
            },
        }
    }

    // ==================== 维护 ====================

    /// 清理空闲用户状态
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Utc::now())
    }

    /// 以指定时间清理空闲用户状态
    ///
    /// 只移除窗口为空、没有可疑记录且冷却已结束的用户，
    /// 移除后与从未出现过的用户行为一致。
    pub fn purge_idle_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.limiter.horizon();
        let mut purged = 0;

        self.users.retain(|_, state| {
            state.window.evict(cutoff);
            let idle = state.window.is_empty()
                && state.suspicion == 0
                && self.cooldown.is_expired(state.last_accepted, now);
            if idle {
                purged += 1;
            }
            !idle
        });

        if purged > 0 {
            debug!("Purged {} idle user states", purged);
        }
        purged
    }

    /// 启动后台清理任务
    ///
    /// 任务只持有弱引用，Governor 被释放后自动退出。预算重置仍在访问时惰性完成。
    pub fn spawn_maintenance(
        self: &Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let governor = Arc::downgrade(self);
        let interval = interval.max(std::time::Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(governor) = governor.upgrade() else {
                    debug!("Governor dropped, maintenance task exiting");
                    break;
                };
                governor.purge_idle();
            }
        })
    }

    /// 以默认间隔启动后台清理任务
    pub fn spawn_default_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.spawn_maintenance(std::time::Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS))
    }
}

// ============================================================================
// 单元测试
// ============================================================================
