//! Turns raw model text into typed results.
//!
//! Every function here is total: malformed output becomes a documented
//! fallback value plus a `ParseWarning`, never an error.

use std::fmt;

use serde_json::Value;

use crate::constants::{FALLBACK_SUMMARY, SUMMARY_MAX_BULLETS};
use crate::mail::{ActionItem, Category, DraftReply, Email, EmailId, Summary};

/// Why a fallback value was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    UnknownCategory(String),
    MalformedJson(String),
    SkippedItems(usize),
    EmptySummary,
    EmptyDraft,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnknownCategory(raw) => {
                write!(f, "model answered {:?}, which is not a known category", raw)
            }
            ParseWarning::MalformedJson(reason) => {
                write!(f, "action items were not a valid JSON list: {}", reason)
            }
            ParseWarning::SkippedItems(n) => {
                write!(f, "skipped {} action item(s) without a task", n)
            }
            ParseWarning::EmptySummary => f.write_str("model returned an empty summary"),
            ParseWarning::EmptyDraft => f.write_str("model returned an empty draft"),
        }
    }
}

/// A parsed value, or the fallback that replaced it
#[derive(Debug, Clone, PartialEq)]
pub enum Interpreted<T> {
    Parsed(T),
    Fallback { value: T, warning: ParseWarning },
}

impl<T> Interpreted<T> {
    pub fn value(&self) -> &T {
        match self {
            Interpreted::Parsed(value) | Interpreted::Fallback { value, .. } => value,
        }
    }

    pub fn warning(&self) -> Option<&ParseWarning> {
        match self {
            Interpreted::Parsed(_) => None,
            Interpreted::Fallback { warning, .. } => Some(warning),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Interpreted::Fallback { .. })
    }
}

const LABEL_TRIM: &[char] = &['"', '\'', '`', '*', '_', '.', '!', ':', '[', ']', '#'];

pub fn interpret_category(raw: &str) -> Interpreted<Category> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let mut label = line.trim_matches(LABEL_TRIM).trim();
    if let Some((prefix, rest)) = label.split_once(':')
        && prefix.trim().eq_ignore_ascii_case("category")
    {
        label = rest.trim().trim_matches(LABEL_TRIM).trim();
    }

    match Category::from_label(label) {
        Some(category) => Interpreted::Parsed(category),
        None => Interpreted::Fallback {
            value: Category::Uncategorized,
            warning: ParseWarning::UnknownCategory(line.to_string()),
        },
    }
}

/// Text between the first `[` and the last `]`, or the whole text if there
/// is no such span. Tolerates prose and code fences around the list.
fn json_list_span(raw: &str) -> &str {
    match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw.trim(),
    }
}

fn is_null_like(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "na" | "tbd" | "unknown" | "no deadline"
    )
}

fn text_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !is_null_like(s))
}

pub fn interpret_actions(raw: &str, email_id: EmailId) -> Interpreted<Vec<ActionItem>> {
    let items: Vec<Value> = match serde_json::from_str(json_list_span(raw)) {
        Ok(items) => items,
        Err(e) => {
            return Interpreted::Fallback {
                value: Vec::new(),
                warning: ParseWarning::MalformedJson(e.to_string()),
            };
        }
    };

    let total = items.len();
    let actions: Vec<ActionItem> = items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| {
            let description = text_field(item, &["task", "description", "action"])?;
            Some(ActionItem {
                description,
                deadline: text_field(item, &["deadline", "due", "due_date"]),
                email_id,
            })
        })
        .collect();

    let skipped = total - actions.len();
    if skipped > 0 {
        Interpreted::Fallback {
            value: actions,
            warning: ParseWarning::SkippedItems(skipped),
        }
    } else {
        Interpreted::Parsed(actions)
    }
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for marker in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(marker)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return rest.trim();
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

pub fn interpret_summary(raw: &str, email_id: EmailId) -> Interpreted<Summary> {
    let bullets: Vec<String> = raw
        .lines()
        .map(strip_bullet)
        .filter(|l| !l.is_empty())
        .take(SUMMARY_MAX_BULLETS)
        .map(str::to_string)
        .collect();

    if bullets.is_empty() {
        return Interpreted::Fallback {
            value: Summary {
                email_id,
                bullets: vec![FALLBACK_SUMMARY.to_string()],
            },
            warning: ParseWarning::EmptySummary,
        };
    }

    Interpreted::Parsed(Summary { email_id, bullets })
}

fn placeholder_draft(email: &Email) -> String {
    format!(
        "Hi {},\n\nThank you for your email regarding \"{}\". \
         I have received it and will get back to you shortly.\n\nBest regards",
        email.sender, email.subject
    )
}

pub fn interpret_draft(raw: &str, email: &Email, tone: &str) -> Interpreted<DraftReply> {
    let body = raw.trim();
    if body.is_empty() {
        return Interpreted::Fallback {
            value: DraftReply::new(email, tone, placeholder_draft(email)),
            warning: ParseWarning::EmptyDraft,
        };
    }
    Interpreted::Parsed(DraftReply::new(email, tone, body.to_string()))
}
