//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Prelude module - Commonly used types for quick imports
//!
//! This module re-exports the most commonly used types from Chatguard,
//! allowing users to import them with a single `use chatguard::prelude::*;`
//! statement instead of importing each type individually.

// Core types - always available
pub use crate::config::{AdmissionMode, GuardConfig};
pub use crate::error::{Decision, Denial, DenialCause, GuardError, RateWindow};
pub use crate::governor::{Governor, GovernorStats, UserReport};
pub use crate::identifier::UserId;

// Extension points
pub use crate::detector::{HeuristicDetector, SuspicionDetector};
pub use crate::messages::Locale;
pub use crate::quota_controller::{estimate_tokens, UsageCommit};

// Feature-gated exports
#[cfg(feature = "telemetry")]
pub use crate::telemetry::init_tracing;

#[cfg(feature = "monitoring")]
pub use crate::telemetry::Metrics;
