//! Language-model pipeline for triage
//!
//! - `prompts`: the editable templates and their JSON store
//! - `template`: placeholder substitution
//! - `client` / `gateway`: the model endpoint and its retry policy
//! - `interpret`: parsing raw answers into typed results with fallbacks

pub mod client;
pub mod gateway;
pub mod interpret;
pub mod prompts;
pub mod template;
#[cfg(test)]
pub mod testing;

pub use client::{ChatTransport, CompletionRequest, GatewayError, OpenAiClient};
pub use gateway::Gateway;
pub use interpret::{Interpreted, ParseWarning};
pub use prompts::{PromptError, PromptName, PromptSet, PromptStore};
pub use template::{TemplateError, Variables};
