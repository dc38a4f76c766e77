//! Session state
//!
//! Everything produced during one run of the assistant: the loaded inbox,
//! per-email results, drafts and the chat transcript. Nothing here is
//! persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ai::ParseWarning;
use crate::mail::{ActionItem, Category, DraftReply, Email, EmailId, Summary};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No email with id {0} in the loaded inbox")]
    UnknownEmail(EmailId),

    #[error("No draft exists for email {0}")]
    NoDraft(EmailId),
}

/// Model-backed operations that write per-email results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Categorize,
    ExtractActions,
    Summarize,
    Draft,
}

/// Issued before a model call; presented again when committing its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub email_id: EmailId,
    pub task: Task,
    seq: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Sequence {
    issued: u64,
    committed: u64,
}

/// Per (email, task) request numbering. A result is only applied if no
/// newer request for the same key has already been applied.
#[derive(Debug, Default)]
pub struct RequestTracker {
    sequences: HashMap<(EmailId, Task), Sequence>,
}

impl RequestTracker {
    pub fn begin(&mut self, email_id: EmailId, task: Task) -> Ticket {
        let seq = self.sequences.entry((email_id, task)).or_default();
        seq.issued += 1;
        Ticket {
            email_id,
            task,
            seq: seq.issued,
        }
    }

    pub fn accept(&mut self, ticket: Ticket) -> bool {
        let seq = self
            .sequences
            .entry((ticket.email_id, ticket.task))
            .or_default();
        if ticket.seq > seq.committed {
            seq.committed = ticket.seq;
            true
        } else {
            tracing::debug!(
                "Discarding stale {:?} result for email {} (request {}, newest applied {})",
                ticket.task,
                ticket.email_id,
                ticket.seq,
                seq.committed
            );
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Chat agent lifecycle: Idle -> AwaitingResponse -> Idle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentStatus {
    #[default]
    Idle,
    AwaitingResponse,
}

/// A parse warning kept for display next to the fallback it caused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWarning {
    pub email_id: EmailId,
    pub task: Task,
    pub warning: ParseWarning,
}

#[derive(Debug, Default)]
pub struct SessionState {
    emails: Vec<Email>,
    selected: Option<EmailId>,
    actions: HashMap<EmailId, Vec<ActionItem>>,
    summaries: HashMap<EmailId, Summary>,
    drafts: HashMap<EmailId, DraftReply>,
    chat: Vec<ChatTurn>,
    warnings: Vec<RecordedWarning>,
    pub agent: AgentStatus,
    pub requests: RequestTracker,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the inbox. Results computed for the previous inbox are dropped;
    /// the chat transcript is kept.
    pub fn load_inbox(&mut self, emails: Vec<Email>) {
        self.emails = emails;
        self.actions.clear();
        self.summaries.clear();
        self.drafts.clear();
        self.warnings.clear();
        self.requests = RequestTracker::default();
        if let Some(id) = self.selected
            && self.email(id).is_none()
        {
            self.selected = None;
        }
    }

    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    pub fn email(&self, id: EmailId) -> Option<&Email> {
        self.emails.iter().find(|e| e.id == id)
    }

    pub fn require_email(&self, id: EmailId) -> Result<&Email, SessionError> {
        self.email(id).ok_or(SessionError::UnknownEmail(id))
    }

    pub fn select(&mut self, id: EmailId) -> Result<(), SessionError> {
        self.require_email(id)?;
        self.selected = Some(id);
        Ok(())
    }

    pub fn selected(&self) -> Option<&Email> {
        self.selected.and_then(|id| self.email(id))
    }

    pub fn set_category(&mut self, ticket: Ticket, category: Category) -> bool {
        if !self.requests.accept(ticket) {
            return false;
        }
        match self.emails.iter_mut().find(|e| e.id == ticket.email_id) {
            Some(email) => {
                email.category = category;
                true
            }
            None => false,
        }
    }

    pub fn actions(&self, id: EmailId) -> Option<&[ActionItem]> {
        self.actions.get(&id).map(Vec::as_slice)
    }

    /// Replace (never extend) the action items for an email
    pub fn replace_actions(&mut self, ticket: Ticket, items: Vec<ActionItem>) -> bool {
        if !self.requests.accept(ticket) {
            return false;
        }
        self.actions.insert(ticket.email_id, items);
        true
    }

    pub fn summary(&self, id: EmailId) -> Option<&Summary> {
        self.summaries.get(&id)
    }

    pub fn set_summary(&mut self, ticket: Ticket, summary: Summary) -> bool {
        if !self.requests.accept(ticket) {
            return false;
        }
        self.summaries.insert(ticket.email_id, summary);
        true
    }

    pub fn draft(&self, id: EmailId) -> Option<&DraftReply> {
        self.drafts.get(&id)
    }

    pub fn set_draft(&mut self, ticket: Ticket, draft: DraftReply) -> bool {
        if !self.requests.accept(ticket) {
            return false;
        }
        self.drafts.insert(ticket.email_id, draft);
        true
    }

    pub fn edit_draft(&mut self, id: EmailId, body: String) -> Result<&DraftReply, SessionError> {
        let draft = self.drafts.get_mut(&id).ok_or(SessionError::NoDraft(id))?;
        draft.body = body;
        Ok(draft)
    }

    /// Keep at most one warning per (email, task): the one belonging to the
    /// result currently stored. `None` clears it.
    pub fn set_warning(&mut self, email_id: EmailId, task: Task, warning: Option<ParseWarning>) {
        self.warnings
            .retain(|w| !(w.email_id == email_id && w.task == task));
        if let Some(warning) = warning {
            tracing::warn!("{:?} for email {}: {}", task, email_id, warning);
            self.warnings.push(RecordedWarning {
                email_id,
                task,
                warning,
            });
        }
    }

    pub fn warnings(&self) -> &[RecordedWarning] {
        &self.warnings
    }

    /// Append one exchange: the user's message followed by the agent's answer
    pub fn push_exchange(&mut self, user: &str, agent: &str) {
        let now = Utc::now();
        self.chat.push(ChatTurn {
            role: ChatRole::User,
            text: user.to_string(),
            timestamp: now,
        });
        self.chat.push(ChatTurn {
            role: ChatRole::Agent,
            text: agent.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn chat_history(&self) -> &[ChatTurn] {
        &self.chat
    }
}
