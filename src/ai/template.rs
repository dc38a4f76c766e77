//! `{{placeholder}}` substitution for prompt templates.
//!
//! Only names made of ASCII letters, digits and underscores count as
//! placeholders, so JSON examples and single braces inside a template pass
//! through untouched.

use std::collections::BTreeMap;

use thiserror::Error;

use super::prompts::PromptName;
use crate::mail::Email;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template {template} needs a value for {{{{{variable}}}}} but none was provided")]
    MissingVariable {
        template: PromptName,
        variable: String,
    },
}

/// Values available to a template
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The fields of one email under their template names
    pub fn for_email(email: &Email) -> Self {
        Self::new()
            .with("id", email.id.to_string())
            .with("sender", email.sender.as_str())
            .with("recipient", email.recipient.as_deref().unwrap_or(""))
            .with("subject", email.subject.as_str())
            .with("body", email.body.as_str())
            .with("timestamp", email.display_timestamp())
            .with("category", email.category.label())
    }
}

struct Placeholder<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn scan(text: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("{{") {
        let open = cursor + offset;
        let inner_start = open + 2;
        let Some(close_offset) = text[inner_start..].find("}}") else {
            break;
        };
        let close = inner_start + close_offset;
        let name = text[inner_start..close].trim();

        if is_identifier(name) {
            found.push(Placeholder {
                start: open,
                end: close + 2,
                name,
            });
            cursor = close + 2;
        } else {
            cursor = open + 1;
        }
    }

    found
}

/// Names of every placeholder in `text`, in order of first appearance
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for p in scan(text) {
        if !names.iter().any(|n| n == p.name) {
            names.push(p.name.to_string());
        }
    }
    names
}

pub fn render(name: PromptName, text: &str, vars: &Variables) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for p in scan(text) {
        let value = vars
            .get(p.name)
            .ok_or_else(|| TemplateError::MissingVariable {
                template: name,
                variable: p.name.to_string(),
            })?;
        out.push_str(&text[last..p.start]);
        out.push_str(value);
        last = p.end;
    }
    out.push_str(&text[last..]);

    Ok(out)
}
