//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 测试通用工具模块
//!
//! 提供测试中常用的工具函数和辅助结构。

#![allow(dead_code)]

use chatguard::{
    config::GuardConfig,
    governor::Governor,
    identifier::UserId,
};
use chrono::{DateTime, TimeZone, Utc};

/// 测试使用的固定起始时间
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

/// 关闭冷却的配置，便于测试滑动窗口
pub fn no_cooldown_config() -> GuardConfig {
    GuardConfig {
        cooldown_secs: 0.0,
        ..GuardConfig::default()
    }
}

/// 创建测试用的Governor（统计起点和预算周期从 t0 开始）
pub fn create_test_governor(config: GuardConfig) -> Governor {
    Governor::new_at(config, t0()).unwrap()
}

/// 创建测试用户
pub fn user(id: i64) -> UserId {
    UserId::from(id)
}

/// 触发低字符多样性信号的消息
pub fn repeated_spam() -> String {
    "a".repeat(60)
}

/// 触发纯数字信号的消息
pub fn digit_spam() -> String {
    "0123456789 ".repeat(11)
}

/// 正常消息
pub fn normal_message() -> &'static str {
    "Hello! Could you tell me more about the pricing of your service?"
}
