//! 黑名单模块集成测试
//!
//! 测试黑名单的并发访问与条目管理

use crate::common::*;
use chatguard::ban_manager::{BanSource, Blacklist};
use chatguard::identifier::UserId;
use chrono::Duration;
use std::sync::Arc;

/// 并发封禁同一用户只有一次成功
#[test]
fn test_concurrent_bans_insert_once() {
    let blacklist = Arc::new(Blacklist::new());
    let target = UserId::from("target");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let blacklist = blacklist.clone();
            let target = target.clone();
            std::thread::spawn(move || {
                blacklist
                    .ban_manual(&target, "abuse", &format!("admin-{}", i), t0())
                    .unwrap()
            })
        })
        .collect();

    let inserted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|added| *added)
        .count();

    assert_eq!(inserted, 1);
    assert_eq!(blacklist.len(), 1);
}

/// 原因和操作人会被去除首尾空白
#[test]
fn test_manual_entry_is_trimmed() {
    let blacklist = Blacklist::new();
    let u = user(5);
    blacklist
        .ban_manual(&u, "  flooding  ", " moderator ", t0())
        .unwrap();

    let entry = blacklist.get(&u).unwrap();
    assert_eq!(entry.reason, "flooding");
    assert_eq!(
        entry.source,
        BanSource::Manual {
            operator: "moderator".to_string()
        }
    );
}

/// 条目可以序列化用于导出
#[test]
fn test_entries_serialize() {
    let blacklist = Blacklist::new();
    blacklist.ban_auto(&user(1), "Multiple suspicious messages", t0());
    blacklist
        .ban_manual(&user(2), "abuse", "admin", t0() + Duration::minutes(1))
        .unwrap();

    let json = serde_json::to_string(&blacklist.list()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["user"], "1");
    assert_eq!(value[0]["source"], "Auto");
    assert_eq!(value[1]["source"]["Manual"]["operator"], "admin");
}
