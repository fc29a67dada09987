//! 端到端测试：垃圾消息到拉黑的完整流程
//!
//! 测试场景：
//! 1. 用户正常聊天
//! 2. 连续发送重复字符刷屏
//! 3. 前两条只累计可疑计数，消息仍被处理
//! 4. 第三条触发自动拉黑
//! 5. 之后所有消息被拒绝
//! 6. 管理员解除拉黑并清零可疑计数后恢复正常

use crate::common::*;
use chatguard::prelude::*;
use chrono::Duration;

#[test]
fn test_spam_escalates_to_blacklist() {
    let governor = create_test_governor(GuardConfig::default());
    let spammer = user(1001);
    let mut now = t0();

    // 1. 正常聊天
    assert!(governor.evaluate_at(&spammer, normal_message(), now).is_allowed());

    // 2-3. 两条刷屏消息都被放行
    for strike in 1..=2 {
        now += Duration::seconds(5);
        let decision = governor.evaluate_at(&spammer, &repeated_spam(), now);
        assert!(decision.is_allowed(), "strike {} should not block", strike);
        assert_eq!(governor.inspect_user_at(&spammer, now).suspicion, strike);
    }

    // 4. 第三条触发拉黑
    now += Duration::seconds(5);
    let decision = governor.evaluate_at(&spammer, &digit_spam(), now);
    assert!(decision.is_sticky());
    assert_eq!(
        decision.reason(),
        Some("Suspicious activity detected. Access blocked.")
    );
    assert_eq!(governor.stats_at(now).blacklisted_users, 1);

    // 5. 拉黑是粘性的，一天后仍然有效
    now += Duration::days(1);
    let decision = governor.evaluate_at(&spammer, normal_message(), now);
    assert_eq!(decision.cause(), Some(&DenialCause::Blacklisted));
    assert_eq!(decision.retry_after(), None);

    // 6. 解除拉黑，可疑计数保留
    assert!(governor.unblacklist_user(&spammer));
    assert_eq!(governor.inspect_user_at(&spammer, now).suspicion, 3);
    assert!(governor.evaluate_at(&spammer, normal_message(), now).is_allowed());

    // 可疑计数未清零时，再一条刷屏立即拉黑
    now += Duration::seconds(5);
    assert!(governor
        .evaluate_at(&spammer, &repeated_spam(), now)
        .is_sticky());

    // 解除并清零后重新累计
    governor.unblacklist_user(&spammer);
    assert_eq!(governor.pardon(&spammer), 4);
    now += Duration::seconds(5);
    assert!(governor
        .evaluate_at(&spammer, &repeated_spam(), now)
        .is_allowed());
}

#[test]
fn test_spam_from_one_user_does_not_affect_others() {
    let governor = create_test_governor(GuardConfig::default());

    for i in 0..3 {
        governor.evaluate_at(&user(1), &repeated_spam(), t0() + Duration::seconds(5 * i));
    }
    assert!(governor.is_blacklisted(&user(1)));

    assert!(governor
        .evaluate_at(&user(2), normal_message(), t0() + Duration::seconds(15))
        .is_allowed());
    assert_eq!(governor.stats_at(t0()).suspicious_users, 1);
}
