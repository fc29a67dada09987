//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 用户标识符
//!
//! 消息平台提供的用户ID可能是整数，也可能是不透明字符串，统一包装为 [`UserId`]。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 用户标识符
///
/// 每个用户的所有计数（滑动窗口、冷却、可疑计数、黑名单）都以此为键。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// 创建新的用户标识符
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 获取字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
