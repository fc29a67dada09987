//! 限流器模块集成测试
//!
//! 测试滑动窗口和冷却控制的边界行为

use crate::common::*;
use chatguard::config::RateLimitConfig;
use chatguard::error::RateWindow;
use chatguard::limiters::{ActivityWindow, CooldownGate, WindowLimiter};
use chrono::Duration;

fn limiter(per_minute: u32, per_hour: u32, per_day: u32) -> WindowLimiter {
    WindowLimiter::new(&RateLimitConfig {
        messages_per_minute: per_minute,
        messages_per_hour: per_hour,
        messages_per_day: per_day,
        ..RateLimitConfig::default()
    })
    .unwrap()
}

/// 第N条允许，第N+1条拒绝，最早一条滑出后恢复
#[test]
fn test_sliding_window_property() {
    let limiter = limiter(5, 100, 1_000);
    let mut window = ActivityWindow::new();
    let start = t0() + Duration::seconds(7);

    for i in 0..5 {
        assert!(limiter
            .check_and_record(&mut window, start + Duration::seconds(i * 10))
            .is_ok());
    }

    let breach = limiter
        .check_and_record(&mut window, start + Duration::seconds(45))
        .unwrap_err();
    assert_eq!(breach.window, RateWindow::Minute);
    assert_eq!(breach.count, 5);
    assert_eq!(breach.retry_after, std::time::Duration::from_secs(15));

    assert!(limiter
        .check_and_record(&mut window, start + Duration::seconds(59))
        .is_err());
    assert!(limiter
        .check_and_record(&mut window, start + Duration::seconds(60))
        .is_ok());
}

/// 检查顺序：分钟、小时、天
#[test]
fn test_shortest_breached_window_reported_first() {
    let limiter = limiter(2, 2, 2);
    let mut window = ActivityWindow::new();
    window.record(t0());
    window.record(t0() + Duration::seconds(1));

    let breach = limiter
        .check(&mut window, t0() + Duration::seconds(2))
        .unwrap_err();
    assert_eq!(breach.window, RateWindow::Minute);

    let breach = limiter
        .check(&mut window, t0() + Duration::minutes(5))
        .unwrap_err();
    assert_eq!(breach.window, RateWindow::Hour);

    let breach = limiter
        .check(&mut window, t0() + Duration::hours(5))
        .unwrap_err();
    assert_eq!(breach.window, RateWindow::Day);
}

/// 超过最长窗口的记录被清理
#[test]
fn test_window_bounded_by_day() {
    let limiter = limiter(1_000, 1_000, 1_000);
    let mut window = ActivityWindow::new();

    for i in 0..48 {
        limiter
            .check_and_record(&mut window, t0() + Duration::hours(i))
            .unwrap();
    }

    assert_eq!(window.len(), 24);
    assert_eq!(
        limiter.usage(&window, t0() + Duration::hours(47)).day,
        24
    );
}

/// 自定义窗口大小
#[test]
fn test_custom_window_sizes() {
    let limiter = WindowLimiter::new(&RateLimitConfig {
        messages_per_minute: 2,
        minute_window_secs: 10,
        ..RateLimitConfig::default()
    })
    .unwrap();
    let mut window = ActivityWindow::new();

    limiter.check_and_record(&mut window, t0()).unwrap();
    limiter
        .check_and_record(&mut window, t0() + Duration::seconds(1))
        .unwrap();
    assert!(limiter
        .check(&mut window, t0() + Duration::seconds(9))
        .is_err());
    assert!(limiter
        .check(&mut window, t0() + Duration::seconds(10))
        .is_ok());
}

/// 冷却使用亚秒精度
#[test]
fn test_fractional_cooldown() {
    let gate = CooldownGate::new(Duration::milliseconds(2_500));
    let mut last = Some(t0());

    let remaining = gate
        .check(&mut last, t0() + Duration::seconds(1))
        .unwrap_err();
    assert_eq!(remaining, std::time::Duration::from_millis(1_500));
    assert!(!gate.is_expired(last, t0() + Duration::seconds(2)));
    assert!(gate.is_expired(last, t0() + Duration::milliseconds(2_500)));
}
