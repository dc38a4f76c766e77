//! Conversational agent over the loaded inbox

use std::fmt::Write;

use crate::agent::context::{agent_context, email_listing, inbox_overview, task_listing};
use crate::agent::{Intent, classify_intent, detect_tone, email_reference};
use crate::ai::{ChatTransport, Interpreted, PromptName, Variables};
use crate::app::state::AgentStatus;
use crate::constants::CHAT_LIST_LIMIT;
use crate::error::TriageError;
use crate::mail::{Category, EmailId};

use super::super::App;

const NEED_SELECTION: &str = "Please select an email first (or mention one, e.g. \"#3\"), \
and ask again.";

/// Which email a chat message is about
enum Target {
    Email(EmailId),
    Missing(EmailId),
    Unspecified,
}

/// Whether the message points at the currently selected email
fn refers_to_current(message: &str) -> bool {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "this" | "selected" | "current"))
}

fn with_note<V>(text: String, result: &Interpreted<V>) -> String {
    match result.warning() {
        Some(warning) => format!("{}\n\n(Note: {})", text, warning),
        None => text,
    }
}

impl<T: ChatTransport> App<T> {
    /// Answer one chat message, appending the user turn and the answer.
    ///
    /// A model failure becomes the answer itself (its user-facing message),
    /// so every call adds exactly two turns. Session and template errors are
    /// returned and leave the history untouched.
    pub async fn chat(&mut self, message: &str) -> Result<String, TriageError> {
        self.state.agent = AgentStatus::AwaitingResponse;
        let result = self.respond(message.trim()).await;
        self.state.agent = AgentStatus::Idle;

        let reply = match result {
            Ok(reply) => reply,
            Err(err @ TriageError::Gateway(_)) => {
                tracing::warn!("Chat request failed: {}", err);
                err.user_message()
            }
            Err(err) => return Err(err),
        };
        self.state.push_exchange(message, &reply);
        Ok(reply)
    }

    fn target(&self, message: &str) -> Target {
        match email_reference(message) {
            Some(id) if self.state.email(id).is_some() => Target::Email(id),
            Some(id) => Target::Missing(id),
            None => self
                .state
                .selected()
                .map_or(Target::Unspecified, |e| Target::Email(e.id)),
        }
    }

    async fn respond(&mut self, message: &str) -> Result<String, TriageError> {
        if message.is_empty() {
            return Ok("Ask me about your inbox, for example \"What tasks do I have?\"".to_string());
        }

        let intent = classify_intent(message);
        tracing::debug!("Chat intent: {:?}", intent);

        match intent {
            Intent::Summarize => match self.target(message) {
                Target::Email(id) => {
                    let result = self.summarize(id).await?;
                    let text = format!("Summary of email {}:\n{}", id, result.value());
                    Ok(with_note(text, &result))
                }
                Target::Missing(id) => Ok(missing_email(id)),
                Target::Unspecified => Ok(NEED_SELECTION.to_string()),
            },
            Intent::DraftReply => match self.target(message) {
                Target::Email(id) => {
                    let tone = detect_tone(message);
                    let result = self.draft_reply(id, Some(tone)).await?;
                    let draft = result.value();
                    let text = format!(
                        "Draft ({} tone), saved but not sent:\nSubject: {}\n\n{}",
                        draft.tone, draft.subject, draft.body
                    );
                    Ok(with_note(text, &result))
                }
                Target::Missing(id) => Ok(missing_email(id)),
                Target::Unspecified => Ok(NEED_SELECTION.to_string()),
            },
            Intent::ListTasks => self.list_tasks(message).await,
            Intent::FilterByCategory(category) => self.filter_by_category(message, category).await,
            Intent::Other => {
                let context = agent_context(
                    &inbox_overview(self.state.emails()),
                    self.state.selected(),
                    None,
                );
                self.ask_agent(message, context).await
            }
        }
    }

    async fn list_tasks(&mut self, message: &str) -> Result<String, TriageError> {
        let target = match (email_reference(message), refers_to_current(message)) {
            (Some(_), _) | (None, true) => self.target(message),
            (None, false) => Target::Unspecified,
        };

        match target {
            Target::Email(id) => {
                let result = self.extract_actions(id).await?;
                let items = result.value();
                let mut text = if items.is_empty() {
                    format!("No action items found in email {}.", id)
                } else {
                    format!("Action items in email {}:", id)
                };
                for item in items {
                    let _ = write!(text, "\n- {}", item);
                }
                Ok(with_note(text, &result))
            }
            Target::Missing(id) => Ok(missing_email(id)),
            Target::Unspecified => {
                let emails = self.state.emails();
                let listing = task_listing(emails, |e| self.state.actions(e.id));
                let context = agent_context(
                    &inbox_overview(emails),
                    self.state.selected(),
                    Some(&format!("Emails and their action items:\n{}", listing)),
                );
                self.ask_agent(message, context).await
            }
        }
    }

    async fn filter_by_category(
        &mut self,
        message: &str,
        category: Category,
    ) -> Result<String, TriageError> {
        let matching: Vec<_> = self
            .state
            .emails()
            .iter()
            .filter(|e| e.category == category)
            .collect();

        if matching.is_empty() {
            return Ok(format!("No emails are categorized as {}.", category));
        }

        let mut listing = email_listing(matching.iter().copied().take(CHAT_LIST_LIMIT));
        if matching.len() > CHAT_LIST_LIMIT {
            let _ = write!(listing, "\n... and {} more", matching.len() - CHAT_LIST_LIMIT);
        }
        let context = format!(
            "{} emails categorized as {}:\n{}",
            matching.len(),
            category,
            listing
        );
        self.ask_agent(message, context).await
    }

    async fn ask_agent(&self, message: &str, context: String) -> Result<String, TriageError> {
        let vars = Variables::new().with("query", message);
        let answer = self
            .ask(
                PromptName::GeneralAgent,
                &vars,
                self.config.ai.max_tokens,
                Some(context),
            )
            .await?;
        Ok(answer.trim().to_string())
    }
}

fn missing_email(id: EmailId) -> String {
    format!("There is no email #{} in the inbox.", id)
}
