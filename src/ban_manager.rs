//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 黑名单管理
//!
//! 黑名单是粘性的：条目只能由管理员移除或批量重置清除，不会随时间过期。
//!
//! # 功能
//!
//! - 自动封禁（可疑消息累计达到阈值）与手动封禁
//! - 封禁原因与操作人校验
//! - 按封禁时间排序的列表查询

use crate::constants::{MAX_BAN_REASON_LENGTH, MAX_OPERATOR_LENGTH};
use crate::error::GuardError;
use crate::identifier::UserId;
use ahash::RandomState;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// 验证宏
// ============================================================================

/// 字符串验证宏
macro_rules! validate_string {
    ($value:expr, $name:expr, $max_len:expr) => {
        if $value.trim().is_empty() {
            return Err(GuardError::ValidationError(
                concat!($name, "不能为空").to_string(),
            ));
        }
        if $value.chars().count() > $max_len {
            return Err(GuardError::ValidationError(format!(
                concat!($name, "过长，最大长度为 {} 字符"),
                $max_len
            )));
        }
    };
}

/// 封禁来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanSource {
    /// 自动封禁
    Auto,
    /// 手动封禁
    Manual { operator: String },
}

/// 黑名单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// 被封禁用户
    pub user: UserId,
    /// 封禁原因
    pub reason: String,
    /// 封禁来源
    pub source: BanSource,
    /// 封禁时间
    pub banned_at: DateTime<Utc>,
}

/// 黑名单
///
/// 使用 DashMap 保存条目，成员检查为 O(1)。
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: DashMap<UserId, BlacklistEntry, RandomState>,
}

impl Blacklist {
    /// 创建空黑名单
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否在黑名单中
    pub fn contains(&self, user: &UserId) -> bool {
        self.entries.contains_key(user)
    }

    /// 获取条目
    pub fn get(&self, user: &UserId) -> Option<BlacklistEntry> {
        self.entries.get(user).map(|e| e.clone())
    }

    /// 自动封禁
    ///
    /// 已在黑名单中的用户保留原条目。返回是否为新增。
    pub fn ban_auto(&self, user: &UserId, reason: &str, now: DateTime<Utc>) -> bool {
        self.insert(BlacklistEntry {
            user: user.clone(),
            reason: reason.to_string(),
            source: BanSource::Auto,
            banned_at: now,
        })
    }

    /// 手动封禁
    ///
    /// # 参数
    /// - `user`: 用户
    /// - `reason`: 封禁原因（非空，最长 500 字符）
    /// - `operator`: 操作人
    ///
    /// # 返回
    /// - `Ok(true)`: 新增封禁
    /// - `Ok(false)`: 用户已在黑名单中
    /// - `Err(_)`: 参数校验失败
    pub fn ban_manual(
        &self,
        user: &UserId,
        reason: &str,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, GuardError> {
        validate_string!(reason, "封禁原因", MAX_BAN_REASON_LENGTH);
        validate_string!(operator, "操作人", MAX_OPERATOR_LENGTH);

        Ok(self.insert(BlacklistEntry {
            user: user.clone(),
            reason: reason.trim().to_string(),
            source: BanSource::Manual {
                operator: operator.trim().to_string(),
            },
            banned_at: now,
        }))
    }

    fn insert(&self, entry: BlacklistEntry) -> bool {
        let mut inserted = false;
        self.entries.entry(entry.user.clone()).or_insert_with(|| {
            inserted = true;
            entry
        });
        inserted
    }

    /// 移除条目
    pub fn remove(&self, user: &UserId) -> Option<BlacklistEntry> {
        self.entries.remove(user).map(|(_, entry)| entry)
    }

    /// 黑名单大小
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按封禁时间排序的条目列表
    pub fn list(&self) -> Vec<BlacklistEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| {
            a.banned_at
                .cmp(&b.banned_at)
                .then_with(|| a.user.cmp(&b.user))
        });
        entries
    }

    /// 清空黑名单
    pub fn clear(&self) {
        self.entries.clear();
    }
}
