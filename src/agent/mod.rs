//! Chat agent helpers: intent detection and the context sent with a query.
//! The dispatch itself lives on `App` (see `app::actions::chat`).

pub mod context;
pub mod intent;

pub use intent::{Intent, classify_intent, detect_tone, email_reference};
