//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 拒绝消息本地化
//!
//! 拒绝原因会原样展示给最终用户，因此这里产出的是完整句子。

use crate::error::{DenialCause, RateWindow};
use serde::{Deserialize, Serialize};

/// 拒绝消息语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    English,
    Russian,
}

impl Locale {
    /// 渲染面向用户的拒绝原因
    pub fn render(&self, cause: &DenialCause) -> String {
        match self {
            Locale::English => render_english(cause),
            Locale::Russian => render_russian(cause),
        }
    }
}

fn render_english(cause: &DenialCause) -> String {
    match cause {
        DenialCause::Blacklisted => {
            "Access blocked. Please contact our team to have it restored.".to_string()
        }
        DenialCause::MessageTooLong { limit, actual } => format!(
            "Your message is too long! Maximum {} characters. (Yours: {})",
            limit, actual
        ),
        DenialCause::SuspiciousActivity { .. } => {
            "Suspicious activity detected. Access blocked.".to_string()
        }
        DenialCause::RateLimited { window, limit } => match window {
            RateWindow::Minute => format!(
                "Too many messages! Please wait a minute. (Limit: {} messages per minute)",
                limit
            ),
            RateWindow::Hour => format!(
                "Hourly message limit exceeded. Please wait. (Limit: {} messages per hour)",
                limit
            ),
            RateWindow::Day => format!(
                "Daily message limit exceeded. Please try again tomorrow. (Limit: {} messages per day)",
                limit
            ),
        },
        DenialCause::Cooldown { remaining } => format!(
            "Please wait {:.1} seconds before sending your next message.",
            remaining.as_secs_f64()
        ),
        DenialCause::BudgetExhausted { .. } => {
            "Sorry, the daily request limit has been reached. Please try again tomorrow or contact our team directly."
                .to_string()
        }
    }
}

fn render_russian(cause: &DenialCause) -> String {
    match cause {
        DenialCause::Blacklisted => {
            "Доступ заблокирован. Свяжитесь с нашей командой для разблокировки.".to_string()
        }
        DenialCause::MessageTooLong { limit, actual } => format!(
            "Сообщение слишком длинное! Максимум {} символов. (У вас: {})",
            limit, actual
        ),
        DenialCause::SuspiciousActivity { .. } => {
            "Обнаружена подозрительная активность. Доступ заблокирован.".to_string()
        }
        DenialCause::RateLimited { window, limit } => match window {
            RateWindow::Minute => format!(
                "Слишком много сообщений! Пожалуйста, подождите минуту. (Лимит: {} сообщений в минуту)",
                limit
            ),
            RateWindow::Hour => format!(
                "Превышен лимит сообщений в час. Пожалуйста, подождите. (Лимит: {} сообщений в час)",
                limit
            ),
            RateWindow::Day => format!(
                "Превышен дневной лимит сообщений. Попробуйте завтра. (Лимит: {} сообщений в день)",
                limit
            ),
        },
        DenialCause::Cooldown { remaining } => format!(
            "Подождите {:.1} секунд перед следующим сообщением.",
            remaining.as_secs_f64()
        ),
        DenialCause::BudgetExhausted { .. } => {
            "Извините, дневной лимит запросов исчерпан. Попробуйте завтра или свяжитесь с нашей командой напрямую."
                .to_string()
        }
    }
}
