//! Inbox source: reads the sample mailbox from a JSON file

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::{Email, EmailId};

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Failed to load inbox from {}: {reason}", path.display())]
    Data { path: PathBuf, reason: String },
}

impl InboxError {
    fn data(path: &Path, reason: impl Into<String>) -> Self {
        InboxError::Data {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Load emails in file order. The file is never written.
pub fn load_inbox(path: &Path) -> Result<Vec<Email>, InboxError> {
    let content = fs::read_to_string(path).map_err(|e| InboxError::data(path, e.to_string()))?;
    let emails = parse_inbox(&content).map_err(|reason| InboxError::data(path, reason))?;
    tracing::info!("Loaded {} emails from {}", emails.len(), path.display());
    Ok(emails)
}

fn parse_inbox(content: &str) -> Result<Vec<Email>, String> {
    let emails: Vec<Email> = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let mut seen: HashSet<EmailId> = HashSet::new();
    if let Some(dup) = emails.iter().find(|e| !seen.insert(e.id)) {
        return Err(format!("duplicate email id {}", dup.id));
    }

    Ok(emails)
}
