//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 可疑消息检测
//!
//! [`SuspicionDetector`] 是可替换的判定接口；默认实现 [`HeuristicDetector`]
//! 使用三个表层信号：
//! - 长度接近上限
//! - 字符种类过少（重复刷屏）
//! - 去掉空格后全是数字且很长

use crate::config::SpamConfig;
use std::collections::HashSet;
use tracing::trace;

/// 可疑消息检测器 trait
pub trait SuspicionDetector: Send + Sync {
    /// 消息是否可疑
    fn is_suspicious(&self, text: &str) -> bool;

    /// 检测器名称（用于日志）
    fn name(&self) -> &str {
        "custom"
    }
}

/// 启发式信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpamSignal {
    /// 长度超过上限的一定比例
    NearLengthLimit,
    /// 字符种类过少
    LowCharacterVariety,
    /// 超长纯数字
    DigitFlood,
}

/// 启发式检测器
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    long_message_threshold: f64,
    min_distinct_chars: usize,
    low_entropy_min_length: usize,
    digit_spam_min_length: usize,
}

impl HeuristicDetector {
    /// 创建新的启发式检测器
    ///
    /// # 参数
    /// - `config`: 启发式配置
    /// - `max_message_length`: 最大消息长度，用于计算“接近上限”阈值
    pub fn new(config: &SpamConfig, max_message_length: usize) -> Self {
        Self {
            long_message_threshold: max_message_length as f64 * config.long_message_ratio,
            min_distinct_chars: config.min_distinct_chars,
            low_entropy_min_length: config.low_entropy_min_length,
            digit_spam_min_length: config.digit_spam_min_length,
        }
    }

    /// 返回消息触发的所有信号
    pub fn signals(&self, text: &str) -> Vec<SpamSignal> {
        let length = text.chars().count();
        let mut signals = Vec::new();

        if length as f64 > self.long_message_threshold {
            signals.push(SpamSignal::NearLengthLimit);
        }

        if length > self.low_entropy_min_length {
            let distinct: HashSet<char> = text.chars().collect();
            if distinct.len() < self.min_distinct_chars {
                signals.push(SpamSignal::LowCharacterVariety);
            }
        }

        if length > self.digit_spam_min_length {
            let mut compact = text.chars().filter(|c| *c != ' ').peekable();
            if compact.peek().is_some() && compact.all(|c| c.is_ascii_digit()) {
                signals.push(SpamSignal::DigitFlood);
            }
        }

        signals
    }
}

impl SuspicionDetector for HeuristicDetector {
    fn is_suspicious(&self, text: &str) -> bool {
        let signals = self.signals(text);
        if !signals.is_empty() {
            trace!("Spam signals: {:?}", signals);
        }
        !signals.is_empty()
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
