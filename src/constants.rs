//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Chatguard.
//!
//! This module provides well-documented constants used throughout the library.
//! All magic numbers are defined here with their purpose and usage context.

// ============================================================================
// Rate Limit Constants
// ============================================================================

/// Default ceiling of accepted messages per user inside the short window.
pub const DEFAULT_MESSAGES_PER_MINUTE: u32 = 10;

/// Default ceiling of accepted messages per user inside the medium window.
pub const DEFAULT_MESSAGES_PER_HOUR: u32 = 50;

/// Default ceiling of accepted messages per user inside the long window.
pub const DEFAULT_MESSAGES_PER_DAY: u32 = 200;

/// Length of the short sliding window (1 minute).
pub const DEFAULT_MINUTE_WINDOW_SECS: u64 = 60;

/// Length of the medium sliding window (1 hour).
pub const DEFAULT_HOUR_WINDOW_SECS: u64 = 3_600;

/// Length of the long sliding window (24 hours).
///
/// Also the eviction horizon of a user's activity window: timestamps older
/// than this are dropped lazily on access.
pub const DEFAULT_DAY_WINDOW_SECS: u64 = 86_400;

/// Upper bound for any configured duration: windows, cooldown and budget
/// period (10 years).
///
/// Keeps `now - window` and `deadline + period` inside the `DateTime` range.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 86_400;

// ============================================================================
// Message Constants
// ============================================================================

/// Minimum gap between two accepted messages of the same user (2 seconds).
pub const DEFAULT_COOLDOWN_SECS: f64 = 2.0;

/// Maximum accepted message length, in characters.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2_000;

// ============================================================================
// Spam Heuristic Constants
// ============================================================================

/// Number of suspicious messages after which a user is blacklisted.
pub const DEFAULT_SUSPICION_THRESHOLD: u32 = 3;

/// Fraction of the maximum message length above which a message is suspicious.
pub const DEFAULT_LONG_MESSAGE_RATIO: f64 = 0.9;

/// A message using fewer distinct characters than this may be repetition spam.
pub const DEFAULT_MIN_DISTINCT_CHARS: usize = 10;

/// Low character variety only counts for messages longer than this.
pub const DEFAULT_LOW_ENTROPY_MIN_LENGTH: usize = 50;

/// Digit-only messages longer than this are suspicious.
pub const DEFAULT_DIGIT_SPAM_MIN_LENGTH: usize = 100;

// ============================================================================
// Token Budget Constants
// ============================================================================

/// Default process-wide daily token ceiling.
pub const DEFAULT_DAILY_TOKEN_BUDGET: u64 = 100_000;

/// Conservative token estimate for the next model call, checked at admission.
pub const DEFAULT_ADMISSION_TOKEN_ESTIMATE: u64 = 1_000;

/// Length of one budget period (24 hours).
pub const DEFAULT_BUDGET_PERIOD_SECS: u64 = 86_400;

/// Characters per estimated token.
///
/// Approximates sub-word tokenization for conversational text.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default budget usage alert thresholds, in percent.
pub const DEFAULT_BUDGET_ALERT_THRESHOLDS: [u8; 3] = [80, 90, 100];

// ============================================================================
// Blacklist Constants
// ============================================================================

/// Maximum blacklist reason length (500 characters).
///
/// Prevents overly long reasons that could cause display issues.
pub const MAX_BAN_REASON_LENGTH: usize = 500;

/// Maximum operator name length recorded with a manual blacklist entry.
pub const MAX_OPERATOR_LENGTH: usize = 100;

/// Reason recorded when the spam heuristic blacklists a user.
pub const AUTO_BAN_REASON: &str = "Multiple suspicious messages";

// ============================================================================
// Maintenance Constants
// ============================================================================

/// Default interval of the idle-state purge task (10 minutes).
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 600;

/// Number of characters kept in redacted message previews written to logs.
pub const LOG_PREVIEW_CHARS: usize = 16;
