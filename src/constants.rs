//! Application-wide constants for tuning and fallbacks
//!
//! Centralizes magic numbers to make them discoverable.

/// Most bullets kept from a model summary.
pub const SUMMARY_MAX_BULLETS: usize = 3;

/// Bullet shown when the model returns no usable summary.
pub const FALLBACK_SUMMARY: &str = "No summary could be generated for this email.";

/// Upper bound on automatic retries after a rate-limit response.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 1;

/// Delay before re-sending a rate-limited request.
pub const RATE_LIMIT_BACKOFF_MS: u64 = 1500;

/// Token budget for single-label categorization answers.
pub const CATEGORY_MAX_TOKENS: u32 = 20;

/// Tone used for drafts when the user does not pick one.
pub const DEFAULT_TONE: &str = "Professional";

/// Emails listed inline by the chat agent before eliding the rest.
pub const CHAT_LIST_LIMIT: usize = 5;

/// Body characters shown in inbox listings.
pub const PREVIEW_CHARS: usize = 200;
