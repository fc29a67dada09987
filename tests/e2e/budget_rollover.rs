//! 端到端测试：全局预算耗尽与重置
//!
//! 测试场景：
//! 1. 多个用户正常对话并提交用量
//! 2. 预算接近上限时，新的准入被拒绝（对所有用户生效）
//! 3. 统计快照反映用量
//! 4. 截止时间过后预算自动重置，恢复服务

use crate::common::*;
use chatguard::prelude::*;
use chrono::Duration;

const SYSTEM_PROMPT: &str = "You are a friendly sales assistant. Answer briefly and politely.";

#[test]
fn test_budget_exhaustion_blocks_everyone_until_reset() {
    let mut config = GuardConfig::default();
    config.budget.daily_tokens = 5_000;
    config.budget.admission_estimate = 1_000;
    let governor = create_test_governor(config);

    let reply = "r".repeat(4_000);
    let mut now = t0();
    let mut conversations = 0;

    // 1-2. 每次对话约 1000+ 令牌
    for i in 0..10 {
        let u = user(i);
        now += Duration::minutes(1);
        match governor.evaluate_at(&u, normal_message(), now) {
            Decision::Allowed => {
                conversations += 1;
                governor.commit_usage_at(&u, normal_message(), SYSTEM_PROMPT, &reply, now);
            }
            Decision::Throttled(denial) => {
                assert!(matches!(denial.cause, DenialCause::BudgetExhausted { .. }));
                assert!(denial.reason.contains("daily request limit"));
                break;
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }
    assert_eq!(conversations, 4);

    // 3. 统计快照
    let stats = governor.stats_at(now);
    assert!(stats.tokens_used_today > 4_000);
    assert!(stats.budget_percentage > 80.0);
    assert_eq!(stats.budget_resets_at, t0() + Duration::days(1));

    // 新用户同样被拒绝
    let decision = governor.evaluate_at(&user(99), "hi", now);
    assert!(decision.is_transient());
    assert_eq!(
        decision.retry_after(),
        Some((t0() + Duration::days(1) - now).to_std().unwrap())
    );

    // 4. 截止时间过后恢复
    let tomorrow = t0() + Duration::days(1) + Duration::seconds(1);
    assert!(governor.evaluate_at(&user(99), "hi", tomorrow).is_allowed());
    let stats = governor.stats_at(tomorrow);
    assert_eq!(stats.tokens_used_today, 0);
    assert_eq!(stats.budget_resets_at, t0() + Duration::days(2));
}

#[test]
fn test_long_idle_gap_resets_once() {
    let mut config = GuardConfig::default();
    config.budget.daily_tokens = 2_000;
    let governor = create_test_governor(config);

    governor.add_tokens_at(2_000, t0());
    assert!(governor.evaluate_at(&user(1), "hi", t0()).is_transient());

    let much_later = t0() + Duration::days(10) + Duration::hours(3);
    let commit = governor.add_tokens_at(500, much_later);
    assert_eq!(commit.total_used, 500);

    let stats = governor.stats_at(much_later);
    assert_eq!(stats.budget_resets_at, t0() + Duration::days(11));
}

#[test]
fn test_usage_alerts_reported_once() {
    let mut config = GuardConfig::default();
    config.budget.daily_tokens = 10_000;
    let governor = create_test_governor(config);

    let alerts: Vec<_> = (0..10)
        .filter_map(|_| governor.add_tokens_at(1_000, t0()).alert_threshold)
        .collect();
    assert_eq!(alerts, vec![80, 90, 100]);
}
