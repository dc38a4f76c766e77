use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type EmailId = u32;

/// Triage label assigned to an email by the categorization step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Important,
    #[serde(rename = "To-Do")]
    ToDo,
    Newsletter,
    Spam,
    #[default]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Important,
        Category::ToDo,
        Category::Newsletter,
        Category::Spam,
        Category::Uncategorized,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Important => "Important",
            Category::ToDo => "To-Do",
            Category::Newsletter => "Newsletter",
            Category::Spam => "Spam",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Match a label ignoring case, whitespace, hyphens and underscores,
    /// so "to do", "TODO" and "To-Do" all resolve to `ToDo`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "important" => Some(Category::Important),
            "todo" => Some(Category::ToDo),
            "newsletter" => Some(Category::Newsletter),
            "spam" => Some(Category::Spam),
            "uncategorized" => Some(Category::Uncategorized),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A message loaded from the inbox file.
///
/// Everything except `category` is fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub id: EmailId,
    #[serde(alias = "from")]
    pub sender: String,
    #[serde(default, alias = "to")]
    pub recipient: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_folder", alias = "raw_folder")]
    pub folder: String,
    #[serde(default, skip_deserializing)]
    pub category: Category,
}

fn default_folder() -> String {
    "INBOX".to_string()
}

/// Accept RFC 3339 as well as the naive forms commonly found in exported
/// mailboxes. Naive values are taken to be UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized timestamp format: {:?}", raw))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl Email {
    /// First `max_chars` characters of the body, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.body.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }

    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// A task extracted from an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub description: String,
    pub deadline: Option<String>,
    pub email_id: EmailId,
}

impl fmt::Display for ActionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.deadline {
            Some(deadline) => write!(f, "{} (Due: {})", self.description, deadline),
            None => f.write_str(&self.description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub email_id: EmailId,
    pub bullets: Vec<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, bullet) in self.bullets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {}", bullet)?;
        }
        Ok(())
    }
}

/// A generated reply kept for review. Drafts are never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReply {
    pub email_id: EmailId,
    pub subject: String,
    pub tone: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub sent: bool,
}

impl DraftReply {
    pub fn new(email: &Email, tone: &str, body: String) -> Self {
        Self {
            email_id: email.id,
            subject: reply_subject(&email.subject),
            tone: tone.to_string(),
            body,
            created_at: Utc::now(),
            sent: false,
        }
    }
}

pub fn reply_subject(subject: &str) -> String {
    if subject.trim_start().to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}
