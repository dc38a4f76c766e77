//! Operations exposed by `App`
//!
//! - `email`: per-email model tasks and the batch run over the inbox
//! - `chat`: the conversational agent
//! - `prompts`: editing, saving and reloading templates

mod chat;
pub(crate) mod email;
mod prompts;

use crate::ai::{ChatTransport, Interpreted};
use crate::app::state::{SessionState, Task, Ticket};
use crate::mail::EmailId;

use super::App;

impl<T: ChatTransport> App<T> {
    /// Apply an interpreted result through `apply`. Once the session accepts
    /// it, its warning (or the absence of one) replaces any earlier warning
    /// for the same email and task. Returns whether it was accepted.
    pub(crate) fn commit<V: Clone>(
        &mut self,
        ticket: Ticket,
        result: &Interpreted<V>,
        apply: impl FnOnce(&mut SessionState, Ticket, V) -> bool,
    ) -> bool {
        let accepted = apply(&mut self.state, ticket, result.value().clone());
        if accepted {
            tracing::debug!("Applied {:?} result for email {}", ticket.task, ticket.email_id);
            self.state
                .set_warning(ticket.email_id, ticket.task, result.warning().cloned());
        }
        accepted
    }

    pub(crate) fn begin(&mut self, email_id: EmailId, task: Task) -> Ticket {
        self.state.requests.begin(email_id, task)
    }
}
