//! Keyword heuristics for chat messages

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};

use crate::constants::DEFAULT_TONE;
use crate::mail::{Category, EmailId};

/// What the user is asking the agent to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Summarize,
    ListTasks,
    FilterByCategory(Category),
    DraftReply,
    Other,
}

fn matcher(patterns: &[&str]) -> Option<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
        .map_err(|e| tracing::error!("Failed to build intent matcher: {}", e))
        .ok()
}

/// Whether `text[start..end]` is not glued to a letter or digit on either side
fn is_word_at(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// First pattern occurrence that stands as a whole word or phrase
fn find_word(ac: &AhoCorasick, text: &str) -> Option<aho_corasick::Match> {
    ac.find_iter(text)
        .find(|m| is_word_at(text, m.start(), m.end()))
}

fn matches(ac: &Option<AhoCorasick>, text: &str) -> bool {
    ac.as_ref().is_some_and(|ac| find_word(ac, text).is_some())
}

/// Phrases asking for a reply to be written. A bare "reply" is not enough:
/// "summarize the reply" is about reading one.
static DRAFT: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    matcher(&[
        "draft",
        "reply to",
        "write a reply",
        "write me a reply",
        "write back",
        "respond to",
        "write a response",
        "answer this",
        "compose",
    ])
});

static SUMMARIZE: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    matcher(&[
        "summarize",
        "summarise",
        "summary",
        "tl;dr",
        "tldr",
        "gist",
        "recap",
    ])
});

static TASKS: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    matcher(&[
        "task",
        "tasks",
        "action item",
        "action items",
        "to-do",
        "to-dos",
        "todo",
        "todos",
        "to do",
        "deadline",
        "deadlines",
        "need to do",
        "follow up",
    ])
});

static FILTER_VERBS: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    matcher(&[
        "show", "list", "filter", "which", "find", "any", "emails", "messages", "mails",
    ])
});

/// Patterns paired with the category they select, in pattern-index order
const CATEGORY_WORDS: [(&str, Category); 11] = [
    ("uncategorized", Category::Uncategorized),
    ("important", Category::Important),
    ("urgent", Category::Important),
    ("priority", Category::Important),
    ("spam", Category::Spam),
    ("junk", Category::Spam),
    ("newsletter", Category::Newsletter),
    ("newsletters", Category::Newsletter),
    ("to-do", Category::ToDo),
    ("todo", Category::ToDo),
    ("to do", Category::ToDo),
];

static CATEGORIES: LazyLock<Option<AhoCorasick>> =
    LazyLock::new(|| matcher(&CATEGORY_WORDS.map(|(word, _)| word)));

/// The category a message talks about, if any
pub fn mentioned_category(text: &str) -> Option<Category> {
    let ac = CATEGORIES.as_ref()?;
    let found = find_word(ac, text)?;
    Some(CATEGORY_WORDS[found.pattern().as_usize()].1)
}

/// Classify a chat message. Checked in order: draft, summarize, category
/// filter, tasks, then anything else.
pub fn classify_intent(message: &str) -> Intent {
    if matches(&DRAFT, message) {
        return Intent::DraftReply;
    }
    if matches(&SUMMARIZE, message) {
        return Intent::Summarize;
    }
    if matches(&FILTER_VERBS, message)
        && let Some(category) = mentioned_category(message)
    {
        return Intent::FilterByCategory(category);
    }
    if matches(&TASKS, message) {
        return Intent::ListTasks;
    }
    Intent::Other
}

/// Tone requested in a draft message, or the default tone
pub fn detect_tone(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    let tones: [(&[&str], &'static str); 4] = [
        (&["casual", "informal", "relaxed"], "Casual"),
        (&["formal", "professional tone"], "Formal"),
        (&["friendly", "warm"], "Friendly"),
        (&["concise", "brief", "short"], "Concise"),
    ];

    tones
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, tone)| *tone)
        .unwrap_or(DEFAULT_TONE)
}

fn leading_number(text: &str) -> Option<EmailId> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// An explicit email reference such as `#3`, `email 3` or `message 3`
pub fn email_reference(message: &str) -> Option<EmailId> {
    let lower = message.to_lowercase();

    if let Some(id) = lower
        .match_indices('#')
        .find_map(|(i, _)| leading_number(&lower[i + 1..]))
    {
        return Some(id);
    }

    ["email ", "message ", "mail "].iter().find_map(|prefix| {
        lower
            .match_indices(prefix)
            .find_map(|(i, _)| leading_number(lower[i + prefix.len()..].trim_start()))
    })
}
