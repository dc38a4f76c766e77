//! Context blocks handed to the model alongside a chat message

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::mail::{ActionItem, Category, Email};

/// Email count plus a per-category breakdown
pub fn inbox_overview(emails: &[Email]) -> String {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for email in emails {
        *counts.entry(email.category).or_default() += 1;
    }

    let mut out = format!("Total emails in inbox: {}", emails.len());
    if !counts.is_empty() {
        let breakdown: Vec<String> = counts
            .iter()
            .map(|(category, count)| format!("{}: {}", category, count))
            .collect();
        let _ = write!(out, "\nCategories: {}", breakdown.join(", "));
    }
    out
}

pub fn email_block(email: &Email) -> String {
    format!(
        "ID: {}\nFrom: {}\nSubject: {}\nCategory: {}\nDate: {}\n\nBody:\n{}",
        email.id,
        email.sender,
        email.subject,
        email.category,
        email.display_timestamp(),
        email.body
    )
}

/// One line per email: id, category, sender and subject
pub fn email_listing<'a>(emails: impl IntoIterator<Item = &'a Email>) -> String {
    emails
        .into_iter()
        .map(|e| format!("- ID {} [{}] {} (from {})", e.id, e.category, e.subject, e.sender))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every email with the action items extracted so far
pub fn task_listing<'a>(
    emails: &[Email],
    actions_for: impl Fn(&Email) -> Option<&'a [ActionItem]>,
) -> String {
    let mut out = String::new();
    for email in emails {
        let _ = writeln!(
            out,
            "- ID {} [{}] {} (from {})",
            email.id, email.category, email.subject, email.sender
        );
        match actions_for(email) {
            Some([]) => {
                let _ = writeln!(out, "    no action items");
            }
            Some(items) => {
                for item in items {
                    let _ = writeln!(out, "    * {}", item);
                }
            }
            None => {
                let _ = writeln!(out, "    action items not extracted yet");
            }
        }
    }
    out.trim_end().to_string()
}

/// System context for a general chat request
pub fn agent_context(overview: &str, selected: Option<&Email>, extra: Option<&str>) -> String {
    let mut out = String::from(overview);
    if let Some(email) = selected {
        let _ = write!(out, "\n\nCurrently selected email:\n{}", email_block(email));
    }
    if let Some(extra) = extra {
        let _ = write!(out, "\n\n{}", extra);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email(id: u32, category: Category) -> Email {
        Email {
            id,
            sender: format!("sender{}@example.com", id),
            recipient: None,
            subject: format!("Subject {}", id),
            body: "Body".to_string(),
            timestamp: Utc::now(),
            folder: "INBOX".to_string(),
            category,
        }
    }

    #[test]
    fn test_inbox_overview_counts_categories() {
        let emails = vec![
            email(1, Category::Spam),
            email(2, Category::Spam),
            email(3, Category::Important),
        ];
        let overview = inbox_overview(&emails);
        assert!(overview.starts_with("Total emails in inbox: 3"));
        assert!(overview.contains("Important: 1"));
        assert!(overview.contains("Spam: 2"));
    }

    #[test]
    fn test_inbox_overview_empty() {
        assert_eq!(inbox_overview(&[]), "Total emails in inbox: 0");
    }

    #[test]
    fn test_task_listing_marks_unprocessed_emails() {
        let emails = vec![email(1, Category::ToDo), email(2, Category::Newsletter)];
        let items = vec![ActionItem {
            description: "Send slides".to_string(),
            deadline: None,
            email_id: 1,
        }];
        let listing = task_listing(&emails, |e| (e.id == 1).then_some(items.as_slice()));
        assert!(listing.contains("* Send slides"));
        assert!(listing.contains("action items not extracted yet"));
    }

    #[test]
    fn test_agent_context_includes_selected_email() {
        let selected = email(5, Category::Important);
        let ctx = agent_context("Total emails in inbox: 1", Some(&selected), Some("extra"));
        assert!(ctx.contains("Currently selected email"));
        assert!(ctx.contains("Subject 5"));
        assert!(ctx.ends_with("extra"));
    }
}
