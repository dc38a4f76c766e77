//! Per-email model tasks and the batch run over the whole inbox

use crate::ai::interpret::{
    interpret_actions, interpret_category, interpret_draft, interpret_summary,
};
use crate::ai::{ChatTransport, GatewayError, Interpreted, PromptName, Variables};
use crate::app::state::{Task, Ticket};
use crate::constants::{CATEGORY_MAX_TOKENS, DEFAULT_TONE};
use crate::error::TriageError;
use crate::mail::{ActionItem, Category, DraftReply, Email, EmailId, Summary};

use super::super::App;

/// Outcome of `run_processing`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    /// Emails whose category and action items were both committed
    pub processed: usize,
    /// Results that used a fallback value
    pub fallbacks: usize,
    /// Emails skipped because the model call failed, with the reason
    pub failures: Vec<(EmailId, String)>,
}

struct Processed {
    category: (Ticket, Interpreted<Category>),
    actions: (Ticket, Interpreted<Vec<ActionItem>>),
}

impl<T: ChatTransport> App<T> {
    fn max_tokens(&self) -> u32 {
        self.config.ai.max_tokens
    }

    async fn ask_category(
        &mut self,
        email: &Email,
    ) -> Result<(Ticket, Interpreted<Category>), TriageError> {
        let ticket = self.begin(email.id, Task::Categorize);
        let raw = self
            .ask(
                PromptName::Categorization,
                &Variables::for_email(email),
                CATEGORY_MAX_TOKENS,
                None,
            )
            .await?;
        Ok((ticket, interpret_category(&raw)))
    }

    async fn ask_actions(
        &mut self,
        email: &Email,
    ) -> Result<(Ticket, Interpreted<Vec<ActionItem>>), TriageError> {
        let ticket = self.begin(email.id, Task::ExtractActions);
        let raw = self
            .ask(
                PromptName::ActionExtraction,
                &Variables::for_email(email),
                self.max_tokens(),
                None,
            )
            .await?;
        Ok((ticket, interpret_actions(&raw, email.id)))
    }

    pub async fn categorize(&mut self, id: EmailId) -> Result<Interpreted<Category>, TriageError> {
        let email = self.state.require_email(id)?.clone();
        let (ticket, result) = self.ask_category(&email).await?;
        self.commit(ticket, &result, |state, t, category| {
            state.set_category(t, category)
        });
        Ok(result)
    }

    /// Extract action items, replacing whatever was stored for this email
    pub async fn extract_actions(
        &mut self,
        id: EmailId,
    ) -> Result<Interpreted<Vec<ActionItem>>, TriageError> {
        let email = self.state.require_email(id)?.clone();
        let (ticket, result) = self.ask_actions(&email).await?;
        self.commit(ticket, &result, |state, t, items| state.replace_actions(t, items));
        Ok(result)
    }

    pub async fn summarize(&mut self, id: EmailId) -> Result<Interpreted<Summary>, TriageError> {
        let email = self.state.require_email(id)?.clone();
        let ticket = self.begin(id, Task::Summarize);
        let raw = self
            .ask(
                PromptName::Summary,
                &Variables::for_email(&email),
                self.max_tokens(),
                None,
            )
            .await?;

        let result = interpret_summary(&raw, id);
        self.commit(ticket, &result, |state, t, summary| state.set_summary(t, summary));
        Ok(result)
    }

    /// Generate a reply draft. `tone` defaults to the professional tone.
    pub async fn draft_reply(
        &mut self,
        id: EmailId,
        tone: Option<&str>,
    ) -> Result<Interpreted<DraftReply>, TriageError> {
        let email = self.state.require_email(id)?.clone();
        let tone = tone.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TONE);
        let ticket = self.begin(id, Task::Draft);
        let vars = Variables::for_email(&email).with("tone", tone);
        let raw = self
            .ask(PromptName::DraftReply, &vars, self.max_tokens(), None)
            .await?;

        let result = interpret_draft(&raw, &email, tone);
        self.commit(ticket, &result, |state, t, draft| state.set_draft(t, draft));
        Ok(result)
    }

    /// Replace the body of an existing draft. Drafts are never sent.
    pub fn edit_draft(&mut self, id: EmailId, body: &str) -> Result<DraftReply, TriageError> {
        Ok(self.state.edit_draft(id, body.to_string())?.clone())
    }

    async fn process_one(&mut self, email: &Email) -> Result<Processed, TriageError> {
        let category = self.ask_category(email).await?;
        let actions = self.ask_actions(email).await?;
        Ok(Processed { category, actions })
    }

    /// Categorize every email and extract its action items.
    ///
    /// Results are committed only after the whole pass: an authentication
    /// failure (or a broken template) aborts with nothing applied. Any other
    /// gateway failure skips that email and is listed in the report.
    pub async fn run_processing(&mut self) -> Result<ProcessingReport, TriageError> {
        let emails = self.state.emails().to_vec();
        tracing::info!("Processing {} emails", emails.len());

        let mut report = ProcessingReport::default();
        let mut done = Vec::with_capacity(emails.len());
        for email in &emails {
            match self.process_one(email).await {
                Ok(processed) => done.push(processed),
                Err(TriageError::Gateway(GatewayError::Auth(detail))) => {
                    tracing::error!("Aborting processing run at email {}: {}", email.id, detail);
                    return Err(GatewayError::Auth(detail).into());
                }
                Err(err @ TriageError::Gateway(_)) => {
                    tracing::warn!("Skipping email {}: {}", email.id, err);
                    report.failures.push((email.id, err.user_message()));
                }
                Err(err) => return Err(err),
            }
        }

        for Processed { category, actions } in done {
            report.fallbacks +=
                usize::from(category.1.is_fallback()) + usize::from(actions.1.is_fallback());
            self.commit(category.0, &category.1, |state, t, c| state.set_category(t, c));
            self.commit(actions.0, &actions.1, |state, t, items| {
                state.replace_actions(t, items)
            });
            report.processed += 1;
        }

        tracing::info!(
            "Processed {} emails ({} fallbacks, {} failures)",
            report.processed,
            report.fallbacks,
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::ai::testing::ScriptedTransport;
    use crate::ai::{GatewayError, ParseWarning};
    use crate::app::state::Task;
    use crate::app::test_support::{INBOX, app_with};
    use crate::error::TriageError;
    use crate::mail::Category;

    #[tokio::test]
    async fn test_sale_email_categorized_as_spam() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always("Spam"));

        let result = app.categorize(1).await.unwrap();
        assert_eq!(*result.value(), Category::Spam);
        assert!(!result.is_fallback());
        assert_eq!(app.state().email(1).unwrap().category, Category::Spam);

        let prompt = &app.gateway.transport().requests()[0].prompt;
        assert!(prompt.contains("50% off sale!"));
        assert!(prompt.contains("Buy now"));
    }

    #[tokio::test]
    async fn test_unknown_label_lands_in_uncategorized() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always("Promotions"));

        let result = app.categorize(1).await.unwrap();
        assert_eq!(*result.value(), Category::Uncategorized);
        assert!(Category::ALL.contains(&app.state().email(1).unwrap().category));
        assert_eq!(app.state().warnings().len(), 1);
        assert_eq!(app.state().warnings()[0].task, Task::Categorize);
    }

    #[tokio::test]
    async fn test_malformed_action_json_yields_empty_list_and_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(
            dir.path(),
            INBOX,
            ScriptedTransport::always("Sure! Here are the tasks: send report"),
        );

        let result = app.extract_actions(2).await.unwrap();
        assert!(result.value().is_empty());
        assert!(matches!(
            result.warning(),
            Some(ParseWarning::MalformedJson(_))
        ));
        assert_eq!(app.state().actions(2), Some(&[][..]));
        assert_eq!(app.state().warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_extraction_keeps_one_current_warning() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_ok("no json here")
            .then_ok("still no json")
            .then_ok(r#"[{"task": "Send the Q3 report"}]"#);
        let mut app = app_with(dir.path(), INBOX, transport);

        app.extract_actions(2).await.unwrap();
        app.extract_actions(2).await.unwrap();
        assert_eq!(app.state().warnings().len(), 1);

        app.extract_actions(2).await.unwrap();
        assert!(app.state().warnings().is_empty());
        assert_eq!(app.state().actions(2).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_extract_actions_twice_gives_identical_list() {
        let dir = tempfile::tempdir().unwrap();
        let answer = r#"[{"task": "Send the Q3 report", "deadline": "Friday"}]"#;
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always(answer));

        app.extract_actions(2).await.unwrap();
        let first = app.state().actions(2).unwrap().to_vec();
        app.extract_actions(2).await.unwrap();
        let second = app.state().actions(2).unwrap().to_vec();

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].deadline.as_deref(), Some("Friday"));
    }

    #[tokio::test]
    async fn test_whitespace_draft_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always("   \n\t "));

        let result = app.draft_reply(2, Some("Formal")).await.unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.warning(), Some(&ParseWarning::EmptyDraft));

        let draft = app.state().draft(2).unwrap();
        assert_eq!(draft.tone, "Formal");
        assert!(!draft.body.trim().is_empty());
        assert!(draft.body.contains("boss@company.com"));
        assert!(!draft.sent);

        let prompt = &app.gateway.transport().requests()[0].prompt;
        assert!(prompt.contains("Formal"));
    }

    #[tokio::test]
    async fn test_draft_defaults_to_professional_tone() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always("Thanks, will do."));

        let result = app.draft_reply(2, None).await.unwrap();
        assert_eq!(result.value().tone, "Professional");
        assert_eq!(result.value().subject, "Re: Quarterly report");

        let edited = app.edit_draft(2, "Thanks, attached.").unwrap();
        assert_eq!(edited.body, "Thanks, attached.");
        assert_eq!(app.state().draft(2).unwrap().body, "Thanks, attached.");
    }

    #[tokio::test]
    async fn test_summary_is_stored_per_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(
            dir.path(),
            INBOX,
            ScriptedTransport::always("- Q3 report requested\n- Due Friday"),
        );

        let result = app.summarize(2).await.unwrap();
        assert_eq!(result.value().bullets.len(), 2);
        assert_eq!(app.state().summary(2), Some(result.value()));
        assert!(app.state().summary(1).is_none());
    }

    #[tokio::test]
    async fn test_gateway_error_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_err(GatewayError::Transport("connection refused".to_string()));
        let mut app = app_with(dir.path(), INBOX, transport);

        let err = app.summarize(2).await.unwrap_err();
        assert!(matches!(err, TriageError::Gateway(_)));
        assert!(app.state().summary(2).is_none());
        assert!(app.state().warnings().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_email_is_rejected_without_a_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), INBOX, ScriptedTransport::always("Spam"));

        let err = app.categorize(99).await.unwrap_err();
        assert!(matches!(err, TriageError::Session(_)));
        assert_eq!(app.gateway.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_categorize_retries_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_err(GatewayError::RateLimit("429".to_string()))
            .then_ok("Important");
        let mut app = app_with(dir.path(), INBOX, transport);

        let result = app.categorize(2).await.unwrap();
        assert_eq!(*result.value(), Category::Important);
        assert_eq!(app.gateway.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_run_processing_covers_every_email() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_ok("Spam")
            .then_ok("[]")
            .then_ok("To-Do")
            .then_ok(r#"[{"task": "Send Q3 report", "deadline": "Friday"}]"#)
            .then_ok("Newsletter")
            .then_ok("not json");
        let mut app = app_with(dir.path(), INBOX, transport);

        let report = app.run_processing().await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.fallbacks, 1);
        assert!(report.failures.is_empty());

        let state = app.state();
        assert_eq!(state.email(1).unwrap().category, Category::Spam);
        assert_eq!(state.email(2).unwrap().category, Category::ToDo);
        assert_eq!(state.email(3).unwrap().category, Category::Newsletter);
        assert_eq!(state.actions(2).unwrap()[0].description, "Send Q3 report");
        assert_eq!(state.actions(3), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_run_processing_auth_failure_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_ok("Spam")
            .then_ok("[]")
            .then_err(GatewayError::Auth("401 invalid key".to_string()));
        let mut app = app_with(dir.path(), INBOX, transport);

        let err = app.run_processing().await.unwrap_err();
        assert!(matches!(err, TriageError::Gateway(GatewayError::Auth(_))));
        assert_eq!(app.gateway.transport().calls(), 3);

        let state = app.state();
        assert!(
            state
                .emails()
                .iter()
                .all(|e| e.category == Category::Uncategorized)
        );
        assert!(state.actions(1).is_none());
    }

    #[tokio::test]
    async fn test_run_processing_skips_unreachable_emails() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .then_ok("Spam")
            .then_ok("[]")
            .then_err(GatewayError::Transport("timed out".to_string()))
            .then_ok("Newsletter")
            .then_ok("[]");
        let mut app = app_with(dir.path(), INBOX, transport);

        let report = app.run_processing().await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 2);
        assert_eq!(app.state().email(2).unwrap().category, Category::Uncategorized);
        assert_eq!(app.state().email(3).unwrap().category, Category::Newsletter);
    }
}
