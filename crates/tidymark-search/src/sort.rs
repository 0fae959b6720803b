//! Stable ordering of merged records.

use tidymark_core::{MergedRecord, SortKey};

/// Sort `records` by `key`. Equal elements keep their input order.
///
/// - `Title`: ascending, case-folded
/// - `Date`: newest first, missing dates last
/// - `Url`: ascending by bytes
pub fn sort(mut records: Vec<MergedRecord>, key: SortKey) -> Vec<MergedRecord> {
    match key {
        SortKey::Title => records.sort_by_cached_key(|r| r.title().to_lowercase()),
        SortKey::Date => records.sort_by(|a, b| {
            let a = a.bookmark.date_added.unwrap_or(0);
            let b = b.bookmark.date_added.unwrap_or(0);
            b.cmp(&a)
        }),
        SortKey::Url => records.sort_by(|a, b| a.url().cmp(b.url())),
    }
    records
}
