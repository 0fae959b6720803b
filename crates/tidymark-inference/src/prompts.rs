//! Prompt templates for bookmark classification, ranking and summaries.

use tidymark_core::{BookmarkRecord, ChatMessage, MergedRecord};

pub const CLASSIFY_SYSTEM: &str = "You are an expert bookmark organizer. You analyze websites \
and assign accurate categories and tags.";

pub const SEARCH_SYSTEM: &str = "You are a search assistant. You understand what the user is \
looking for and pick the most relevant bookmarks.";

pub const SUMMARY_SYSTEM: &str = "You write concise summaries of web pages.";

pub const RELATED_SYSTEM: &str = "You recommend related bookmarks.";

/// Messages asking for a category, tags and description as JSON.
pub fn classify_messages(record: &BookmarkRecord) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze the following bookmark and suggest a category and tags.

Bookmark:
Title: {}
URL: {}

Respond with a JSON object with these fields:
- category: the main category (e.g. Technology, News, Entertainment, Shopping, Education, Tools)
- tags: an array of 3-5 relevant tags
- description: a one-sentence description

Return only the JSON, nothing else."#,
        record.title, record.url
    );
    vec![ChatMessage::system(CLASSIFY_SYSTEM), ChatMessage::user(prompt)]
}

/// Numbered `"i. title - url"` lines, starting at 1.
pub fn numbered_list<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (title, url))| format!("{}. {} - {}", i + 1, title, url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Messages asking for the indices of the records most relevant to `query`.
pub fn semantic_search_messages(query: &str, records: &[MergedRecord], limit: usize) -> Vec<ChatMessage> {
    let list = numbered_list(records.iter().map(|r| (r.title(), r.url())));
    let prompt = format!(
        r#"User query: "{query}"

Bookmarks:
{list}

Based on what the user is looking for, return the numbers of the most relevant bookmarks (at most {limit}), ordered by relevance.
Return only a JSON array of numbers, for example: [1, 5, 3]"#
    );
    vec![ChatMessage::system(SEARCH_SYSTEM), ChatMessage::user(prompt)]
}

/// Messages asking for a short plain-text summary.
pub fn summary_messages(record: &BookmarkRecord) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Write a short summary (at most 100 words) of the following bookmark:

Title: {}
URL: {}

Return only the summary text, nothing else."#,
        record.title, record.url
    );
    vec![ChatMessage::system(SUMMARY_SYSTEM), ChatMessage::user(prompt)]
}

/// Messages asking which candidates relate most to `current`.
pub fn related_messages(
    current: &BookmarkRecord,
    candidates: &[&BookmarkRecord],
    limit: usize,
) -> Vec<ChatMessage> {
    let list = numbered_list(candidates.iter().map(|r| (r.title.as_str(), r.url.as_str())));
    let prompt = format!(
        r#"Current bookmark:
Title: {}
URL: {}

Other bookmarks:
{list}

Recommend the {limit} bookmarks most related to the current one, ordered by relevance.
Return only a JSON array of numbers, for example: [1, 5, 3]"#,
        current.title, current.url
    );
    vec![ChatMessage::system(RELATED_SYSTEM), ChatMessage::user(prompt)]
}
