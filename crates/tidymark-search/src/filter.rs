//! Criteria filtering over merged records.

use tidymark_core::{FilterCriteria, MergedRecord};

/// Case-insensitive substring match against title, url, tags and category.
pub fn matches_query(record: &MergedRecord, query: &str) -> bool {
    let needle = query.to_lowercase();
    record.title().to_lowercase().contains(&needle)
        || record.url().to_lowercase().contains(&needle)
        || record.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        || record.effective_category.to_lowercase().contains(&needle)
}

/// Apply search text, then exact category, then tag membership.
///
/// Absent or empty criteria are skipped. Input order is preserved.
pub fn filter(records: &[MergedRecord], criteria: &FilterCriteria) -> Vec<MergedRecord> {
    let query = criteria.search_query();
    let category = criteria.category();
    let tag = criteria.tag();

    records
        .iter()
        .filter(|r| query.map_or(true, |q| matches_query(r, q)))
        .filter(|r| category.map_or(true, |c| r.effective_category == c))
        .filter(|r| tag.map_or(true, |t| r.tags.iter().any(|rt| rt == t)))
        .cloned()
        .collect()
}
