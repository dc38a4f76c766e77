//! Prompt editing. Changes apply to the next model call; they reach disk
//! only through `save_prompts`.

use crate::ai::{ChatTransport, PromptName};
use crate::error::TriageError;

use super::super::App;

impl<T: ChatTransport> App<T> {
    pub fn update_prompt(&mut self, name: &str, text: &str) -> Result<PromptName, TriageError> {
        let name = self.prompts.update(name, text)?;
        tracing::info!("Updated {} prompt ({} chars)", name, text.len());
        Ok(name)
    }

    /// Validate and persist the in-memory prompt set
    pub fn save_prompts(&self) -> Result<(), TriageError> {
        self.prompts.validate()?;
        self.prompt_store.save(&self.prompts)?;
        Ok(())
    }

    /// Re-read the prompt file, keeping the current set if it can't be loaded
    pub fn reload_prompts(&mut self) -> Result<(), TriageError> {
        let prompts = self.prompt_store.load()?;
        self.prompts = prompts;
        tracing::info!("Reloaded prompts from {}", self.prompt_store.path().display());
        Ok(())
    }
}
