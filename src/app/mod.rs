//! Application core - owns the prompts, the gateway and the session, and
//! exposes the operations a front end calls.

mod actions;
pub mod state;

pub use actions::email::ProcessingReport;

use crate::ai::{
    ChatTransport, CompletionRequest, Gateway, OpenAiClient, PromptName, PromptSet, PromptStore,
    Variables,
};
use crate::config::Config;
use crate::error::TriageError;
use crate::mail::load_inbox;
use state::SessionState;

pub struct App<T> {
    pub(crate) config: Config,
    pub(crate) prompts: PromptSet,
    pub(crate) prompt_store: PromptStore,
    pub(crate) gateway: Gateway<T>,
    pub(crate) state: SessionState,
}

impl App<OpenAiClient> {
    /// Wire up the HTTP gateway from configuration and a resolved API key
    pub fn from_config(config: Config, api_key: Option<String>) -> Self {
        let client = OpenAiClient::new(&config.ai, api_key, None);
        let gateway = Gateway::new(client, config.ai.rate_limit_retries);
        Self::new(config, gateway)
    }
}

impl<T: ChatTransport> App<T> {
    /// Prompts come from the configured file, or the built-in set if that
    /// file is missing or malformed.
    pub fn new(config: Config, gateway: Gateway<T>) -> Self {
        let prompt_store = PromptStore::new(&config.paths.prompts);
        let prompts = prompt_store.load_or_default();
        Self::with_prompts(config, gateway, prompts)
    }

    pub fn with_prompts(config: Config, gateway: Gateway<T>, prompts: PromptSet) -> Self {
        Self {
            prompt_store: PromptStore::new(&config.paths.prompts),
            config,
            prompts,
            gateway,
            state: SessionState::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Read the inbox file into the session, returning the email count
    pub fn load_inbox(&mut self) -> Result<usize, TriageError> {
        let emails = load_inbox(&self.config.paths.inbox)?;
        let count = emails.len();
        self.state.load_inbox(emails);
        Ok(count)
    }

    pub fn select_email(&mut self, id: u32) -> Result<(), TriageError> {
        Ok(self.state.select(id)?)
    }

    /// Render a template and send it. Nothing in the session changes here.
    pub(crate) async fn ask(
        &self,
        name: PromptName,
        vars: &Variables,
        max_tokens: u32,
        context: Option<String>,
    ) -> Result<String, TriageError> {
        let prompt = self.prompts.render(name, vars)?;
        let mut request = CompletionRequest::new(prompt, max_tokens);
        if let Some(context) = context {
            request = request.with_context(context);
        }
        Ok(self.gateway.complete(&request).await?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::ai::testing::ScriptedTransport;
    use crate::retry::RetryConfig;

    pub const INBOX: &str = r#"[
        {"id": 1, "from": "deals@shop.example", "subject": "50% off sale!", "body": "Buy now", "timestamp": "2025-11-20T09:15:00Z"},
        {"id": 2, "from": "boss@company.com", "subject": "Quarterly report", "body": "Please send the Q3 report by Friday.", "timestamp": "2025-11-20T10:00:00Z"},
        {"id": 3, "from": "news@weekly.example", "subject": "This week in Rust", "body": "Issue 600 is out.", "timestamp": "2025-11-21T08:00:00Z"}
    ]"#;

    pub fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.paths.inbox = dir.join("inbox.json");
        config.paths.prompts = dir.join("prompts.json");
        config
    }

    /// An app with `inbox` on disk and already loaded, talking to `transport`
    pub fn app_with(
        dir: &Path,
        inbox: &str,
        transport: ScriptedTransport,
    ) -> App<ScriptedTransport> {
        let config = config_in(dir);
        std::fs::write(&config.paths.inbox, inbox).unwrap();
        let gateway = Gateway::with_retry_config(
            transport,
            RetryConfig::new(1, Duration::from_millis(1), Duration::from_millis(2)),
        );
        let mut app = App::new(config, gateway);
        app.load_inbox().unwrap();
        app
    }
}
