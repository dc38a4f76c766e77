use thiserror::Error;

use crate::ai::{GatewayError, PromptError, TemplateError};
use crate::app::state::SessionError;
use crate::mail::InboxError;

/// Any failure surfaced by an `App` operation
#[derive(Error, Debug)]
pub enum TriageError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Inbox(#[from] InboxError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl TriageError {
    /// Text for the person using the assistant, with a hint on what to do next
    pub fn user_message(&self) -> String {
        match self {
            TriageError::Gateway(GatewayError::Auth(detail)) => format!(
                "Authentication error: the model endpoint rejected the API key ({}). \
                 Set TRIAGE_API_KEY or run `triage set-key`.",
                detail
            ),
            TriageError::Gateway(GatewayError::RateLimit(detail)) => format!(
                "Rate limit reached ({}). Please wait a moment and try again.",
                detail
            ),
            TriageError::Gateway(GatewayError::Transport(detail)) => format!(
                "Could not reach the model endpoint ({}). Check your connection and endpoint setting.",
                detail
            ),
            TriageError::Template(e) => format!("{}. Edit the prompt and try again.", e),
            other => other.to_string(),
        }
    }
}
