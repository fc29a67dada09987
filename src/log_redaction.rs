//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 日志脱敏模块
//!
//! 用户ID和消息内容不以明文写入日志。

use crate::constants::LOG_PREVIEW_CHARS;
use crate::identifier::UserId;

/// 基础脱敏函数
///
/// 保留前后各两个字符，短值完全隐藏。按字符处理，多字节文本不会被截断在字符中间。
#[inline]
pub fn redact_basic(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "unknown".to_string();
    };

    let value = value.trim();
    if value.is_empty() {
        return "unknown".to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }

    let prefix: String = chars[..2].iter().collect();
    let suffix: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", prefix, suffix)
}

/// 用户ID脱敏
#[inline]
pub fn redact_user_id(user: &UserId) -> String {
    redact_basic(Some(user.as_str()))
}

/// 按配置决定是否脱敏
#[inline]
pub fn display_user(user: &UserId, redact: bool) -> String {
    if redact {
        redact_user_id(user)
    } else {
        user.to_string()
    }
}

/// 消息内容预览
///
/// 只给出长度和开头少量字符，超出部分省略。
pub fn preview_text(text: &str) -> String {
    let length = text.chars().count();
    if length <= LOG_PREVIEW_CHARS {
        return format!("{:?} ({} chars)", text, length);
    }

    let head: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    format!("{:?}… ({} chars)", head, length)
}
