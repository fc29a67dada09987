//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 配置模块
//!
//! 定义准入控制的配置结构，支持 YAML / TOML / JSON 加载与校验。

use crate::constants::*;
use crate::error::GuardError;
use crate::messages::Locale;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 准入控制配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// 滑动窗口限流
    pub rate_limits: RateLimitConfig,
    /// 同一用户两条被接受消息之间的最小间隔（秒）
    pub cooldown_secs: f64,
    /// 最大消息长度（字符）
    pub max_message_length: usize,
    /// 全局令牌预算
    pub budget: BudgetConfig,
    /// 垃圾消息启发式
    pub spam: SpamConfig,
    /// 状态变更时机
    pub admission: AdmissionMode,
    /// 拒绝消息语言
    pub locale: Locale,
    /// 日志中是否脱敏用户ID
    pub redact_identities: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitConfig::default(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            budget: BudgetConfig::default(),
            spam: SpamConfig::default(),
            admission: AdmissionMode::default(),
            locale: Locale::default(),
            redact_identities: true,
        }
    }
}

impl GuardConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        self.rate_limits
            .validate()
            .map_err(|e| format!("rate_limits: {}", e))?;

        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return Err(format!(
                "冷却时间必须是非负有限数: {}",
                self.cooldown_secs
            ));
        }

        if self.cooldown_secs > MAX_DURATION_SECS as f64 {
            return Err(format!(
                "冷却时间超出上限 {}s: {}",
                MAX_DURATION_SECS, self.cooldown_secs
            ));
        }

        if self.max_message_length == 0 {
            return Err("最大消息长度不能为0".to_string());
        }

        self.budget
            .validate()
            .map_err(|e| format!("budget: {}", e))?;
        self.spam.validate().map_err(|e| format!("spam: {}", e))?;

        Ok(())
    }

    /// 冷却时间
    ///
    /// 超出可表示范围时返回 `GuardError::ConfigError`。
    pub fn cooldown(&self) -> Result<Duration, GuardError> {
        let secs = self.cooldown_secs;
        if !secs.is_finite() || secs < 0.0 || secs > MAX_DURATION_SECS as f64 {
            return Err(GuardError::ConfigError(format!(
                "cooldown_secs 超出范围: {}",
                secs
            )));
        }

        Duration::try_milliseconds((secs * 1000.0).round() as i64).ok_or_else(|| {
            GuardError::ConfigError(format!("cooldown_secs 超出范围: {}", secs))
        })
    }

    /// 从 YAML 字符串加载并校验
    pub fn from_yaml_str(s: &str) -> Result<Self, GuardError> {
        let config: GuardConfig = serde_yaml::from_str(s)?;
        config.validate().map_err(GuardError::ConfigError)?;
        Ok(config)
    }

    /// 从 TOML 字符串加载并校验
    pub fn from_toml_str(s: &str) -> Result<Self, GuardError> {
        let config: GuardConfig = toml::from_str(s)?;
        config.validate().map_err(GuardError::ConfigError)?;
        Ok(config)
    }

    /// 从 JSON 字符串加载并校验
    pub fn from_json_str(s: &str) -> Result<Self, GuardError> {
        let config: GuardConfig = serde_json::from_str(s)?;
        config.validate().map_err(GuardError::ConfigError)?;
        Ok(config)
    }

    /// 从文件加载，按扩展名选择格式
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(GuardError::ConfigError(format!(
                "不支持的配置文件格式: {:?}",
                other
            ))),
        }
    }
}

/// 滑动窗口限流配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub messages_per_minute: u32,
    pub messages_per_hour: u32,
    pub messages_per_day: u32,
    pub minute_window_secs: u64,
    pub hour_window_secs: u64,
    pub day_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_minute: DEFAULT_MESSAGES_PER_MINUTE,
            messages_per_hour: DEFAULT_MESSAGES_PER_HOUR,
            messages_per_day: DEFAULT_MESSAGES_PER_DAY,
            minute_window_secs: DEFAULT_MINUTE_WINDOW_SECS,
            hour_window_secs: DEFAULT_HOUR_WINDOW_SECS,
            day_window_secs: DEFAULT_DAY_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    /// 校验限流配置
    pub fn validate(&self) -> Result<(), String> {
        if self.messages_per_minute == 0
            || self.messages_per_hour == 0
            || self.messages_per_day == 0
        {
            return Err("消息上限不能为0".to_string());
        }

        if self.minute_window_secs == 0 || self.hour_window_secs == 0 || self.day_window_secs == 0
        {
            return Err("窗口大小不能为0".to_string());
        }

        if self.minute_window_secs > self.hour_window_secs
            || self.hour_window_secs > self.day_window_secs
        {
            return Err(format!(
                "窗口大小必须递增: {}s / {}s / {}s",
                self.minute_window_secs, self.hour_window_secs, self.day_window_secs
            ));
        }

        // 窗口已递增，只需检查最长窗口
        if self.day_window_secs > MAX_DURATION_SECS {
            return Err(format!(
                "窗口大小超出上限 {}s: {}s",
                MAX_DURATION_SECS, self.day_window_secs
            ));
        }

        Ok(())
    }

    /// 各窗口大小，顺序为 分钟 / 小时 / 天
    pub fn window_sizes(&self) -> Result<[Duration; 3], GuardError> {
        Ok([
            duration_from_secs("minute_window_secs", self.minute_window_secs)?,
            duration_from_secs("hour_window_secs", self.hour_window_secs)?,
            duration_from_secs("day_window_secs", self.day_window_secs)?,
        ])
    }
}

/// 预算周期起点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetAnchor {
    /// 从创建时刻起算一个周期
    #[default]
    Rolling,
    /// 下一个 UTC 零点
    UtcMidnight,
}

/// 全局令牌预算配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// 每日令牌上限
    pub daily_tokens: u64,
    /// 准入时为下一次调用预估的令牌数
    pub admission_estimate: u64,
    /// 预算周期（秒）
    pub reset_period_secs: u64,
    /// 第一个周期的截止时间如何确定
    pub anchor: ResetAnchor,
    /// 使用率告警阈值（百分比）
    pub alert_thresholds: Vec<u8>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_tokens: DEFAULT_DAILY_TOKEN_BUDGET,
            admission_estimate: DEFAULT_ADMISSION_TOKEN_ESTIMATE,
            reset_period_secs: DEFAULT_BUDGET_PERIOD_SECS,
            anchor: ResetAnchor::default(),
            alert_thresholds: DEFAULT_BUDGET_ALERT_THRESHOLDS.to_vec(),
        }
    }
}

impl BudgetConfig {
    /// 校验预算配置
    pub fn validate(&self) -> Result<(), String> {
        if self.daily_tokens == 0 {
            return Err("每日令牌上限不能为0".to_string());
        }

        if self.admission_estimate > self.daily_tokens {
            return Err(format!(
                "准入预估 {} 超过每日上限 {}",
                self.admission_estimate, self.daily_tokens
            ));
        }

        if self.reset_period_secs == 0 {
            return Err("预算周期不能为0".to_string());
        }

        if self.reset_period_secs > MAX_DURATION_SECS {
            return Err(format!(
                "预算周期超出上限 {}s: {}s",
                MAX_DURATION_SECS, self.reset_period_secs
            ));
        }

        if let Some(t) = self
            .alert_thresholds
            .iter()
            .find(|t| **t == 0 || **t > 100)
        {
            return Err(format!("告警阈值必须在 1-100 之间: {}", t));
        }

        Ok(())
    }

    /// 预算周期
    pub fn period(&self) -> Result<Duration, GuardError> {
        duration_from_secs("reset_period_secs", self.reset_period_secs)
    }
}

/// 秒数转换为 `Duration`，超过 [`MAX_DURATION_SECS`] 时返回配置错误
fn duration_from_secs(field: &str, secs: u64) -> Result<Duration, GuardError> {
    if secs > MAX_DURATION_SECS {
        return Err(GuardError::ConfigError(format!(
            "{} 超出上限 {}s: {}s",
            field, MAX_DURATION_SECS, secs
        )));
    }

    Duration::try_seconds(secs as i64)
        .ok_or_else(|| GuardError::ConfigError(format!("{} 超出范围: {}s", field, secs)))
}

/// 垃圾消息启发式配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamConfig {
    /// 可疑消息累计多少条后拉黑
    pub suspicion_threshold: u32,
    /// 超过最大长度的该比例即可疑
    pub long_message_ratio: f64,
    /// 不同字符数低于此值可能是重复刷屏
    pub min_distinct_chars: usize,
    /// 低字符多样性仅对长于此值的消息生效
    pub low_entropy_min_length: usize,
    /// 纯数字消息长于此值即可疑
    pub digit_spam_min_length: usize,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: DEFAULT_SUSPICION_THRESHOLD,
            long_message_ratio: DEFAULT_LONG_MESSAGE_RATIO,
            min_distinct_chars: DEFAULT_MIN_DISTINCT_CHARS,
            low_entropy_min_length: DEFAULT_LOW_ENTROPY_MIN_LENGTH,
            digit_spam_min_length: DEFAULT_DIGIT_SPAM_MIN_LENGTH,
        }
    }
}

impl SpamConfig {
    /// 校验启发式配置
    pub fn validate(&self) -> Result<(), String> {
        if self.suspicion_threshold == 0 {
            return Err("可疑阈值不能为0".to_string());
        }

        if !(self.long_message_ratio > 0.0 && self.long_message_ratio <= 1.0) {
            return Err(format!(
                "长消息比例必须在 (0, 1] 之间: {}",
                self.long_message_ratio
            ));
        }

        Ok(())
    }
}

/// 准入状态变更时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// 每项检查通过后立即记录（滑动窗口追加、冷却刷新），
    /// 即使后续检查拒绝了该消息
    #[default]
    Sequential,
    /// 所有检查通过后才记录
    Transactional,
}
