//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型与决策结果定义
//!
//! 使用thiserror定义所有错误类型。准入结果不是错误：每次检查要么通过，
//! 要么返回带原因的 [`Decision`]。

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Chatguard 错误类型
#[derive(Error, Debug)]
pub enum GuardError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 验证错误
    #[error("验证错误: {0}")]
    ValidationError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML解析错误
    #[error("TOML解析错误: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// 滑动窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RateWindow {
    /// 短窗口（默认1分钟）
    Minute,
    /// 中窗口（默认1小时）
    Hour,
    /// 长窗口（默认24小时）
    Day,
}

impl RateWindow {
    /// 按检查顺序排列的所有窗口
    pub const ALL: [RateWindow; 3] = [RateWindow::Minute, RateWindow::Hour, RateWindow::Day];

    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            RateWindow::Minute => "minute",
            RateWindow::Hour => "hour",
            RateWindow::Day => "day",
        }
    }
}

impl fmt::Display for RateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拒绝原因（结构化）
#[derive(Debug, Clone, PartialEq)]
pub enum DenialCause {
    /// 用户在黑名单中
    Blacklisted,
    /// 消息过长
    MessageTooLong { limit: usize, actual: usize },
    /// 可疑消息累计达到阈值，用户已被拉黑
    SuspiciousActivity { strikes: u32 },
    /// 超出滑动窗口限制
    RateLimited { window: RateWindow, limit: u32 },
    /// 冷却期未结束
    Cooldown { remaining: Duration },
    /// 全局每日令牌预算耗尽
    BudgetExhausted { used: u64, limit: u64 },
}

impl DenialCause {
    /// 用于日志和指标的简短标签
    pub fn label(&self) -> &'static str {
        match self {
            DenialCause::Blacklisted => "blacklisted",
            DenialCause::MessageTooLong { .. } => "message_too_long",
            DenialCause::SuspiciousActivity { .. } => "suspicious_activity",
            DenialCause::RateLimited { .. } => "rate_limited",
            DenialCause::Cooldown { .. } => "cooldown",
            DenialCause::BudgetExhausted { .. } => "budget_exhausted",
        }
    }
}

/// 拒绝详情
///
/// `reason` 是面向最终用户的完整句子，调用方应原样转发。
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub cause: DenialCause,
    pub reason: String,
    pub retry_after: Option<Duration>,
}

/// 决策结果
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// 允许
    Allowed,
    /// 拒绝：消息本身不可接受，原样重试不会成功
    Rejected(Denial),
    /// 节流：暂时拒绝，随时间自动恢复
    Throttled(Denial),
    /// 封禁：需要管理员解除
    Banned(Denial),
}

impl Decision {
    /// 是否允许
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// 是否为可自愈的暂时拒绝
    pub fn is_transient(&self) -> bool {
        matches!(self, Decision::Throttled(_))
    }

    /// 是否为需要管理员处理的封禁
    pub fn is_sticky(&self) -> bool {
        matches!(self, Decision::Banned(_))
    }

    /// 拒绝详情
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allowed => None,
            Decision::Rejected(d) | Decision::Throttled(d) | Decision::Banned(d) => Some(d),
        }
    }

    /// 面向用户的拒绝原因
    pub fn reason(&self) -> Option<&str> {
        self.denial().map(|d| d.reason.as_str())
    }

    /// 结构化拒绝原因
    pub fn cause(&self) -> Option<&DenialCause> {
        self.denial().map(|d| &d.cause)
    }

    /// 建议的重试等待时间
    pub fn retry_after(&self) -> Option<Duration> {
        self.denial().and_then(|d| d.retry_after)
    }

    /// 转换为 `(allowed, reason)` 二元组
    pub fn into_verdict(self) -> (bool, Option<String>) {
        match self {
            Decision::Allowed => (true, None),
            Decision::Rejected(d) | Decision::Throttled(d) | Decision::Banned(d) => {
                (false, Some(d.reason))
            }
        }
    }
}
