//! 端到端测试：并发场景
//!
//! 测试场景：
//! 1. 同一用户的重复提交并发到达，上限仍是严格上界
//! 2. 大量用户并发对话，预算计数不丢失
//! 3. 并发期间管理员拉黑立即生效
//! 4. 后台清理任务与正常流量并存

use crate::common::*;
use chatguard::prelude::*;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submission_respects_ceiling() {
    let governor = Arc::new(create_test_governor(no_cooldown_config()));
    let allowed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..100 {
        let governor = governor.clone();
        let allowed = allowed.clone();
        handles.push(tokio::spawn(async move {
            let now = t0() + Duration::milliseconds(i % 5);
            if governor.evaluate_at(&user(1), "retry", now).is_allowed() {
                allowed.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(allowed.load(Ordering::SeqCst), 10);
    assert_eq!(governor.inspect_user_at(&user(1), t0()).usage.minute, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_users_commit_usage() {
    let governor = Arc::new(create_test_governor(GuardConfig::default()));

    let mut handles = Vec::new();
    for i in 0..200 {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            let u = user(i);
            let now = t0() + Duration::seconds(1);
            assert!(governor.evaluate_at(&u, normal_message(), now).is_allowed());
            governor.commit_usage_at(&u, "abcd", "efgh", "ijkl", now);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = governor.stats_at(t0() + Duration::seconds(1));
    assert_eq!(stats.tokens_used_today, 600);
    assert_eq!(stats.tracked_users, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blacklist_during_traffic() {
    let governor = Arc::new(create_test_governor(no_cooldown_config()));
    let target = user(7);

    governor.blacklist_user(&target, "abuse", "admin").unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let governor = governor.clone();
        let target = target.clone();
        handles.push(tokio::spawn(async move {
            governor.evaluate_at(&target, "hi", t0() + Duration::seconds(i))
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_sticky());
    }
    assert_eq!(governor.inspect_user_at(&target, t0()).usage.day, 0);
}

#[tokio::test]
async fn test_maintenance_runs_alongside_traffic() {
    let governor = Arc::new(Governor::new(GuardConfig::default()).unwrap());
    let stale = Utc::now() - Duration::days(3);
    for i in 0..50 {
        governor.evaluate_at(&user(i), "old", stale);
    }
    governor.evaluate_at(&user(1_000), &repeated_spam(), stale);

    let task = governor.spawn_maintenance(std::time::Duration::from_millis(5));
    assert!(governor.evaluate(&user(2_000), "fresh").is_allowed());
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // 只保留有可疑记录的用户和刚活跃的用户
    let stats = governor.stats();
    assert_eq!(stats.tracked_users, 2);
    assert_eq!(stats.suspicious_users, 1);

    task.abort();
}
