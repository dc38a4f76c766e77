//! Prompt templates: the fixed set of names, built-in defaults and the
//! JSON-backed store the user edits.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::template::{self, TemplateError, Variables};

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt file {} is unusable: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Invalid prompt edit: {0}")]
    Validation(String),

    #[error("Failed to write prompt file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One of the fixed prompt slots. Each drives exactly one model task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptName {
    Categorization,
    #[serde(alias = "action_item")]
    ActionExtraction,
    Summary,
    #[serde(alias = "auto_reply")]
    DraftReply,
    GeneralAgent,
}

impl PromptName {
    pub const ALL: [PromptName; 5] = [
        PromptName::Categorization,
        PromptName::ActionExtraction,
        PromptName::Summary,
        PromptName::DraftReply,
        PromptName::GeneralAgent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PromptName::Categorization => "categorization",
            PromptName::ActionExtraction => "action_extraction",
            PromptName::Summary => "summary",
            PromptName::DraftReply => "draft_reply",
            PromptName::GeneralAgent => "general_agent",
        }
    }

    /// Placeholders the pipeline fills in when rendering this template
    pub fn variables(self) -> &'static [&'static str] {
        const EMAIL: &[&str] = &[
            "id",
            "sender",
            "recipient",
            "subject",
            "body",
            "timestamp",
            "category",
        ];
        match self {
            PromptName::Categorization | PromptName::ActionExtraction | PromptName::Summary => {
                EMAIL
            }
            PromptName::DraftReply => &[
                "id",
                "sender",
                "recipient",
                "subject",
                "body",
                "timestamp",
                "category",
                "tone",
            ],
            PromptName::GeneralAgent => &["query"],
        }
    }

    /// Placeholders a template must keep: without them the user's request
    /// never reaches the model
    pub fn required(self) -> &'static [&'static str] {
        match self {
            PromptName::DraftReply => &["tone"],
            PromptName::GeneralAgent => &["query"],
            _ => &[],
        }
    }

    pub fn default_template(self) -> &'static str {
        match self {
            PromptName::Categorization => DEFAULT_CATEGORIZATION,
            PromptName::ActionExtraction => DEFAULT_ACTION_EXTRACTION,
            PromptName::Summary => DEFAULT_SUMMARY,
            PromptName::DraftReply => DEFAULT_DRAFT_REPLY,
            PromptName::GeneralAgent => DEFAULT_GENERAL_AGENT,
        }
    }
}

impl fmt::Display for PromptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PromptName {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        match key.as_str() {
            "categorization" => Ok(PromptName::Categorization),
            "action_extraction" | "action_item" => Ok(PromptName::ActionExtraction),
            "summary" => Ok(PromptName::Summary),
            "draft_reply" | "auto_reply" => Ok(PromptName::DraftReply),
            "general_agent" => Ok(PromptName::GeneralAgent),
            _ => Err(PromptError::Validation(format!(
                "unknown prompt name {:?} (expected one of: {})",
                s,
                PromptName::ALL.map(PromptName::key).join(", ")
            ))),
        }
    }
}

const DEFAULT_CATEGORIZATION: &str = "Categorize this email into one of: Important, Newsletter, Spam, To-Do. \
To-Do emails must include a direct request requiring user action. \
Respond with only the category name.

From: {{sender}}
Subject: {{subject}}

{{body}}";

const DEFAULT_ACTION_EXTRACTION: &str = r#"Extract tasks from the email. Respond in JSON list format: [ { "task": "...", "deadline": "..." } ]. If no tasks, return an empty list []. Respond with valid JSON only, no additional text.

From: {{sender}}
Subject: {{subject}}

{{body}}"#;

const DEFAULT_SUMMARY: &str = "Summarize the following email in 2-3 bullet points, \
focusing on key information and any required actions. Return only the bullet points.

From: {{sender}}
Subject: {{subject}}
Date: {{timestamp}}

{{body}}";

const DEFAULT_DRAFT_REPLY: &str = "Draft a reply to the email below. If it is a meeting request, \
draft a polite, concise reply asking for an agenda and proposing 1-2 time slots. \
Use a {{tone}} tone. Return only the reply body.

Original email:
From: {{sender}}
Subject: {{subject}}
Date: {{timestamp}}

{{body}}";

const DEFAULT_GENERAL_AGENT: &str = "You are an Email Productivity Agent helping the user manage their inbox. \
Always use the stored prompts as behavioral instructions whenever relevant. \
Be helpful, concise, and actionable.

User query: {{query}}";

/// The full set of templates, one per `PromptName`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSet {
    templates: BTreeMap<PromptName, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PromptSet {
    pub fn defaults() -> Self {
        Self {
            templates: PromptName::ALL
                .into_iter()
                .map(|name| (name, name.default_template().to_string()))
                .collect(),
        }
    }

    pub fn get(&self, name: PromptName) -> &str {
        self.templates
            .get(&name)
            .map(String::as_str)
            .unwrap_or_else(|| name.default_template())
    }

    pub fn set(&mut self, name: PromptName, text: impl Into<String>) {
        self.templates.insert(name, text.into());
    }

    /// Replace a template from user input, validating both the name and the text
    pub fn update(&mut self, name: &str, text: &str) -> Result<PromptName, PromptError> {
        let name: PromptName = name.parse()?;
        if text.trim().is_empty() {
            return Err(PromptError::Validation(format!(
                "template for {} must not be empty",
                name
            )));
        }
        check_placeholders(name, text)?;
        self.set(name, text);
        Ok(name)
    }

    /// Check every template only uses placeholders the pipeline can fill
    pub fn validate(&self) -> Result<(), PromptError> {
        self.iter()
            .try_for_each(|(name, text)| check_placeholders(name, text))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PromptName, &str)> {
        self.templates.iter().map(|(name, text)| (*name, text.as_str()))
    }

    pub fn render(&self, name: PromptName, vars: &Variables) -> Result<String, TemplateError> {
        template::render(name, self.get(name), vars)
    }

    fn fill_missing(&mut self) -> Vec<PromptName> {
        let mut filled = Vec::new();
        for name in PromptName::ALL {
            if !self.templates.contains_key(&name) {
                self.set(name, name.default_template());
                filled.push(name);
            }
        }
        filled
    }
}

fn check_placeholders(name: PromptName, text: &str) -> Result<(), PromptError> {
    let used = template::placeholders(text);
    let unknown: Vec<&str> = used
        .iter()
        .map(String::as_str)
        .filter(|p| !name.variables().contains(p))
        .collect();
    if !unknown.is_empty() {
        return Err(PromptError::Validation(format!(
            "template for {} uses unknown placeholder(s) {} (available: {})",
            name,
            unknown.join(", "),
            name.variables().join(", ")
        )));
    }

    let missing: Vec<&str> = name
        .required()
        .iter()
        .copied()
        .filter(|r| !used.iter().any(|p| p == r))
        .collect();
    if !missing.is_empty() {
        return Err(PromptError::Validation(format!(
            "template for {} must contain {}",
            name,
            missing
                .iter()
                .map(|p| format!("{{{{{}}}}}", p))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(())
}

/// Reads and writes the prompt file
#[derive(Debug, Clone)]
pub struct PromptStore {
    path: PathBuf,
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<PromptSet, PromptError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.config_error(e))?;
        let mut set: PromptSet = serde_json::from_str(&content).map_err(|e| self.config_error(e))?;

        let filled = set.fill_missing();
        if !filled.is_empty() {
            tracing::warn!(
                "Prompt file {} has no entry for {:?}; using built-in defaults",
                self.path.display(),
                filled
            );
        }
        Ok(set)
    }

    /// Load, substituting the built-in templates when the file is missing or malformed
    pub fn load_or_default(&self) -> PromptSet {
        match self.load() {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("{}. Falling back to built-in prompts", e);
                PromptSet::defaults()
            }
        }
    }

    /// Write the whole set. The existing file is only replaced once the new
    /// content is fully on disk.
    pub fn save(&self, set: &PromptSet) -> Result<(), PromptError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut content = serde_json::to_string_pretty(set)
            .map_err(|e| self.io_error(std::io::Error::other(e)))?;
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::info!("Saved prompts to {}", self.path.display());
        Ok(())
    }

    fn config_error(&self, reason: impl fmt::Display) -> PromptError {
        PromptError::Config {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> PromptError {
        PromptError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_parsing_accepts_aliases() {
        assert_eq!("summary".parse::<PromptName>().unwrap(), PromptName::Summary);
        assert_eq!(
            "action-extraction".parse::<PromptName>().unwrap(),
            PromptName::ActionExtraction
        );
        assert_eq!(
            "action_item".parse::<PromptName>().unwrap(),
            PromptName::ActionExtraction
        );
        assert_eq!(
            "Draft-Reply".parse::<PromptName>().unwrap(),
            PromptName::DraftReply
        );
        assert_eq!(
            "auto_reply".parse::<PromptName>().unwrap(),
            PromptName::DraftReply
        );
    }

    #[test]
    fn test_update_rejects_unknown_name() {
        let mut set = PromptSet::defaults();
        let err = set.update("tone_checker", "whatever").unwrap_err();
        assert!(matches!(err, PromptError::Validation(_)));
        assert_eq!(set, PromptSet::defaults());
    }

    #[test]
    fn test_update_rejects_blank_text() {
        let mut set = PromptSet::defaults();
        let err = set.update("summary", "   \n").unwrap_err();
        assert!(matches!(err, PromptError::Validation(_)));
    }

    #[test]
    fn test_update_rejects_unknown_placeholder() {
        let mut set = PromptSet::defaults();
        let err = set
            .update("general_agent", "Answer {{query}} about {{subject}}")
            .unwrap_err();
        assert!(err.to_string().contains("subject"));
        assert_eq!(set, PromptSet::defaults());
    }

    #[test]
    fn test_update_rejects_dropping_required_placeholder() {
        let mut set = PromptSet::defaults();

        let err = set.update("general_agent", "Answer briefly").unwrap_err();
        assert!(err.to_string().contains("{{query}}"));

        let err = set
            .update("draft_reply", "Reply to {{sender}} about {{subject}}")
            .unwrap_err();
        assert!(err.to_string().contains("{{tone}}"));
        assert_eq!(set, PromptSet::defaults());

        set.update("draft_reply", "Reply to {{sender}}, {{tone}}")
            .unwrap();
    }

    #[test]
    fn test_defaults_validate() {
        PromptSet::defaults().validate().unwrap();
        let mut set = PromptSet::defaults();
        set.set(PromptName::Summary, "{{tone}}");
        assert!(matches!(set.validate(), Err(PromptError::Validation(_))));

        let mut set = PromptSet::defaults();
        set.set(PromptName::GeneralAgent, "Be helpful.");
        assert!(matches!(set.validate(), Err(PromptError::Validation(_))));
    }

    #[test]
    fn test_update_replaces_single_template() {
        let mut set = PromptSet::defaults();
        let name = set.update("summary", "Summarize {{body}} in one line").unwrap();
        assert_eq!(name, PromptName::Summary);
        assert_eq!(set.get(PromptName::Summary), "Summarize {{body}} in one line");
        assert_eq!(set.iter().count(), PromptName::ALL.len());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path().join("nested").join("prompts.json"));

        let mut set = PromptSet::defaults();
        set.set(PromptName::Categorization, "Label: {{subject}}");
        set.set(PromptName::GeneralAgent, "Be brief. {{query}}");

        store.save(&set).unwrap();
        assert_eq!(store.load().unwrap(), set);
    }

    #[test]
    fn test_save_replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path().join("prompts.json"));

        store.save(&PromptSet::defaults()).unwrap();
        let mut set = PromptSet::defaults();
        set.set(PromptName::Summary, "New {{body}}");
        store.save(&set).unwrap();

        assert_eq!(store.load().unwrap().get(PromptName::Summary), "New {{body}}");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(PromptError::Config { .. })));
        assert_eq!(store.load_or_default(), PromptSet::defaults());
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, "{ not json").unwrap();

        let store = PromptStore::new(&path);
        assert!(matches!(store.load(), Err(PromptError::Config { .. })));
        assert_eq!(store.load_or_default(), PromptSet::defaults());
    }

    #[test]
    fn test_load_legacy_keys_and_fill_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(
            &path,
            r#"{"action_item": "Tasks please: {{body}}", "auto_reply": "Reply: {{body}}"}"#,
        )
        .unwrap();

        let set = PromptStore::new(&path).load().unwrap();
        assert_eq!(set.get(PromptName::ActionExtraction), "Tasks please: {{body}}");
        assert_eq!(set.get(PromptName::DraftReply), "Reply: {{body}}");
        assert_eq!(
            set.get(PromptName::Summary),
            PromptName::Summary.default_template()
        );
    }

    #[test]
    fn test_load_unknown_key_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, r#"{"poetry": "Write a poem"}"#).unwrap();
        assert!(matches!(
            PromptStore::new(&path).load(),
            Err(PromptError::Config { .. })
        ));
    }

    #[test]
    fn test_bundled_prompt_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/prompts.json");
        let set = PromptStore::new(path).load().unwrap();
        assert_eq!(set, PromptSet::defaults());
    }
}
