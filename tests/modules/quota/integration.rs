//! 配额模块集成测试
//!
//! 测试全局令牌预算的准入、提交与周期重置

use crate::common::*;
use chatguard::config::{BudgetConfig, ResetAnchor};
use chatguard::quota_controller::{estimate_tokens, QuotaController};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn controller(daily: u64) -> QuotaController {
    QuotaController::new(
        BudgetConfig {
            daily_tokens: daily,
            ..BudgetConfig::default()
        },
        t0(),
    )
    .unwrap()
}

/// 准入按预估值判断，提交可以超出上限
#[test]
fn test_admission_uses_estimate() {
    let quota = controller(100_000);

    quota.commit(99_000, t0());
    assert!(quota.check_admission(t0()).is_ok());

    quota.commit(1, t0());
    assert!(quota.check_admission(t0()).is_err());

    let commit = quota.commit(5_000, t0());
    assert_eq!(commit.total_used, 104_001);
    assert_eq!(commit.remaining, 0);
}

/// 并发检查不会重复重置
#[test]
fn test_concurrent_rollover_happens_once() {
    let quota = Arc::new(controller(100_000));
    quota.commit(50_000, t0());
    let after = t0() + Duration::days(1) + Duration::seconds(1);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let quota = quota.clone();
            std::thread::spawn(move || {
                quota.check_admission(after).unwrap();
                quota.commit(10, after);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = quota.snapshot(after);
    assert_eq!(snapshot.used, 80);
    assert_eq!(snapshot.resets_at, t0() + Duration::days(2));
}

/// UTC 零点对齐
#[test]
fn test_midnight_anchor_rollover() {
    let quota = QuotaController::new(
        BudgetConfig {
            anchor: ResetAnchor::UtcMidnight,
            ..BudgetConfig::default()
        },
        t0(),
    )
    .unwrap();
    quota.commit(100_000, t0());

    let before_midnight = Utc.with_ymd_and_hms(2026, 6, 1, 23, 59, 59).unwrap();
    assert!(quota.check_admission(before_midnight).is_err());

    let after_midnight = Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 1).unwrap();
    assert!(quota.check_admission(after_midnight).is_ok());
    assert_eq!(
        quota.snapshot(after_midnight).resets_at,
        Utc.with_ymd_and_hms(2026, 6, 3, 0, 0, 0).unwrap()
    );
}

/// 令牌估算
#[test]
fn test_estimate_tokens_examples() {
    assert_eq!(estimate_tokens("Hello, world!"), 3);
    assert_eq!(estimate_tokens(&"слово ".repeat(100)), 150);
}
