//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Chatguard - Rate & Abuse Governor for conversational bots
//!
//! Decides whether an incoming chat message should be processed, and if not,
//! produces a user-facing denial reason.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use chatguard::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`Governor`] - Admission pipeline, usage commit and administrative operations
//! - [`GuardConfig`] - Configuration with YAML / TOML / JSON loading
//! - [`Decision`] - Admission verdict: allowed, rejected, throttled or banned
//! - [`GuardError`] - Error types
//!
//! ## Building Blocks
//!
//! - [`limiters`] - Multi-window sliding limiter and cooldown gate
//! - [`detector`] - Pluggable suspicious-message detection
//! - [`ban_manager`] - Sticky blacklist
//! - [`quota_controller`] - Shared daily token budget
//!
//! ## Extensions (feature-gated)
//!
//! - Tracing subscriber setup (requires `telemetry` feature)
//! - Prometheus metrics (requires `monitoring` feature)
//!
//! # Examples
//!
//! ```rust
//! use chatguard::prelude::*;
//!
//! let governor = Governor::new(GuardConfig::default()).unwrap();
//! let user = UserId::from(123456789_i64);
//!
//! match governor.evaluate(&user, "Hi! How much does the premium plan cost?") {
//!     Decision::Allowed => {
//!         // generate the reply, then record what it cost
//!         governor.commit_usage(&user, "Hi!", "system prompt", "The premium plan is ...");
//!     }
//!     denied => {
//!         // relay the reason to the user verbatim
//!         let (_, reason) = denied.into_verdict();
//!         println!("{}", reason.unwrap_or_default());
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Ordered checks**: blacklist, length, spam heuristics, sliding windows, cooldown, budget
//! - **Sticky vs transient denials**: callers can tell "try again shortly" from "contact an administrator"
//! - **Per-user atomicity**: concurrent messages from one user serialise on that user's state
//! - **Lazy budget rollover**: no background timer, one reset per deadline crossing
//! - **Monitoring**: Prometheus metrics and tracing integration

pub mod prelude;

pub mod ban_manager;
pub mod config;
pub mod constants;
pub mod detector;
pub mod error;
pub mod governor;
pub mod identifier;
pub mod limiters;
pub mod log_redaction;
pub mod messages;
pub mod quota_controller;
#[cfg(any(feature = "telemetry", feature = "monitoring"))]
pub mod telemetry;

// 重新导出常用类型
pub use ban_manager::{BanSource, Blacklist, BlacklistEntry};
pub use config::{
    AdmissionMode, BudgetConfig, GuardConfig, RateLimitConfig, ResetAnchor, SpamConfig,
};
pub use detector::{HeuristicDetector, SpamSignal, SuspicionDetector};
pub use error::{Decision, Denial, DenialCause, GuardError, RateWindow};
pub use governor::{Governor, GovernorStats, LimitSummary, UserReport};
pub use identifier::UserId;
pub use limiters::{ActivityWindow, CooldownGate, WindowLimiter, WindowUsage};
pub use messages::Locale;
pub use quota_controller::{estimate_tokens, QuotaController, QuotaSnapshot, UsageCommit};
#[cfg(feature = "telemetry")]
pub use telemetry::init_tracing;
#[cfg(feature = "monitoring")]
pub use telemetry::Metrics;
