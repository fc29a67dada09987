//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 限流器模块
//!
//! 实现按用户的多窗口滑动限流与冷却控制。
//!
//! 限流器本身不持有用户状态：每个用户的 [`ActivityWindow`] 和最后接受时间
//! 由调用方（[`Governor`](crate::governor::Governor)）在该用户的锁内传入，
//! 这样“计数后追加”这类复合操作对同一用户是原子的。

use crate::config::RateLimitConfig;
use crate::error::{GuardError, RateWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// 把 chrono 时长转换为标准库时长，负值视为零
pub(crate) fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or(std::time::Duration::ZERO)
}

/// 用户活动窗口
///
/// 按到达顺序（时间非递减）保存被接受消息的时间戳。
///
/// # 特性
/// - 使用 VecDeque 存储时间戳
/// - 访问时惰性清理过期时间戳
/// - 通过二分查找统计窗口内数量
#[derive(Debug, Clone, Default)]
pub struct ActivityWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl ActivityWindow {
    /// 创建空窗口
    pub fn new() -> Self {
        Self::default()
    }

    /// 移除不晚于 `cutoff` 的时间戳，返回移除数量
    pub fn evict(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while let Some(&front) = self.timestamps.front() {
            if front <= cutoff {
                self.timestamps.pop_front();
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }

    /// 晚于 `cutoff` 的第一个时间戳的下标
    fn first_after(&self, cutoff: DateTime<Utc>) -> usize {
        self.timestamps.partition_point(|ts| *ts <= cutoff)
    }

    /// 统计晚于 `cutoff` 的时间戳数量
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.timestamps.len() - self.first_after(cutoff)
    }

    /// 记录一次被接受的消息
    ///
    /// 时间戳不会早于已记录的最后一个，保证窗口有序。
    pub fn record(&mut self, now: DateTime<Utc>) {
        let ts = match self.timestamps.back() {
            Some(&last) if last > now => last,
            _ => now,
        };
        self.timestamps.push_back(ts);
    }

    /// 最近一次记录
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.timestamps.back().copied()
    }

    /// 窗口内记录数
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// 超出窗口限制的详情
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBreach {
    /// 触发的窗口
    pub window: RateWindow,
    /// 窗口上限
    pub limit: u32,
    /// 当前窗口内的数量
    pub count: usize,
    /// 窗口重新开放前需要等待的时间
    pub retry_after: std::time::Duration,
}

/// 各窗口当前用量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct WindowUsage {
    pub minute: usize,
    pub hour: usize,
    pub day: usize,
}

/// 多窗口滑动限流器
///
/// 对同一份时间戳历史按三个窗口（默认 1分钟 / 1小时 / 24小时）分别计数，
/// 任何一个窗口达到上限即拒绝。被拒绝的消息不会写入窗口。
///
/// # 示例
/// ```rust
/// use chatguard::config::RateLimitConfig;
/// use chatguard::limiters::{ActivityWindow, WindowLimiter};
/// use chrono::Utc;
///
/// let limiter = WindowLimiter::new(&RateLimitConfig::default()).unwrap();
/// let mut window = ActivityWindow::new();
/// assert!(limiter.check_and_record(&mut window, Utc::now()).is_ok());
/// assert_eq!(window.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct WindowLimiter {
    /// (窗口, 上限, 窗口大小)，按检查顺序排列
    limits: [(RateWindow, u32, Duration); 3],
}

impl WindowLimiter {
    /// 创建新的多窗口限流器
    ///
    /// # 参数
    /// - `config`: 已校验的限流配置
    ///
    /// 窗口大小超出可表示范围时返回 `GuardError::ConfigError`。
    pub fn new(config: &RateLimitConfig) -> Result<Self, GuardError> {
        let sizes = config.window_sizes()?;
        let ceilings = [
            config.messages_per_minute,
            config.messages_per_hour,
            config.messages_per_day,
        ];

        Ok(Self {
            limits: std::array::from_fn(|i| (RateWindow::ALL[i], ceilings[i], sizes[i])),
        })
    }

    fn entry(&self, window: RateWindow) -> (u32, Duration) {
        let (_, limit, size) = self.limits[match window {
            RateWindow::Minute => 0,
            RateWindow::Hour => 1,
            RateWindow::Day => 2,
        }];
        (limit, size)
    }

    /// 窗口上限
    pub fn limit(&self, window: RateWindow) -> u32 {
        self.entry(window).0
    }

    /// 窗口大小
    pub fn window_size(&self, window: RateWindow) -> Duration {
        self.entry(window).1
    }

    /// 清理视界（最长窗口）
    pub fn horizon(&self) -> Duration {
        self.window_size(RateWindow::Day)
    }

    /// 检查但不记录
    ///
    /// 会先清理超过最长窗口的时间戳。
    pub fn check(&self, window: &mut ActivityWindow, now: DateTime<Utc>) -> Result<(), WindowBreach> {
        window.evict(now - self.horizon());

        for (name, limit, size) in self.limits.iter().copied() {
            let cutoff = now - size;
            let count = window.count_since(cutoff);
            if count >= limit as usize {
                // 需要有 count - limit + 1 条记录滑出窗口
                let start = window.first_after(cutoff);
                let pivot = start + (count - limit as usize);
                let reopen_at = window.timestamps[pivot] + size;
                return Err(WindowBreach {
                    window: name,
                    limit,
                    count,
                    retry_after: to_std(reopen_at - now),
                });
            }
        }

        Ok(())
    }

    /// 检查并在通过时记录
    pub fn check_and_record(
        &self,
        window: &mut ActivityWindow,
        now: DateTime<Utc>,
    ) -> Result<(), WindowBreach> {
        self.check(window, now)?;
        window.record(now);
        Ok(())
    }

    /// 统计各窗口用量（不修改窗口）
    pub fn usage(&self, window: &ActivityWindow, now: DateTime<Utc>) -> WindowUsage {
        WindowUsage {
            minute: window.count_since(now - self.window_size(RateWindow::Minute)),
            hour: window.count_since(now - self.window_size(RateWindow::Hour)),
            day: window.count_since(now - self.window_size(RateWindow::Day)),
        }
    }
}

/// 冷却控制器
///
/// 要求同一用户两条被接受的消息之间至少间隔 `cooldown`。
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
}

impl CooldownGate {
    /// 创建新的冷却控制器
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// 冷却时长
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// 检查冷却，返回剩余等待时间
    ///
    /// 未来的时间戳（时钟回拨）会被拉回到 `now`，回拨最多造成一个冷却周期的等待。
    pub fn check(
        &self,
        last_accepted: &mut Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), std::time::Duration> {
        let Some(last) = *last_accepted else {
            return Ok(());
        };

        let last = if last > now {
            *last_accepted = Some(now);
            now
        } else {
            last
        };

        let elapsed = now - last;
        if elapsed < self.cooldown {
            return Err(to_std(self.cooldown - elapsed));
        }

        Ok(())
    }

    /// 冷却是否已结束
    pub fn is_expired(&self, last_accepted: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_accepted {
            Some(last) => now - last >= self.cooldown,
            None => true,
        }
    }
}

// ============================================================================
// 单元测试
// ============================================================================
