//! Category and tag aggregates over merged records.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tidymark_core::{BookmarkId, BookmarkRecord, MergedRecord, MetadataRecord};

/// Folder names of every record plus overlay categories of live records.
///
/// Sorted, no duplicates. Overlay entries for ids not in `records` are ignored.
pub fn all_categories(
    records: &[BookmarkRecord],
    metadata: &HashMap<BookmarkId, MetadataRecord>,
) -> Vec<String> {
    let mut categories: BTreeSet<String> = BTreeSet::new();
    for record in records {
        categories.insert(record.folder_name.clone());
        if let Some(category) = metadata
            .get(&record.id)
            .and_then(|m| m.category.as_deref())
            .filter(|c| !c.is_empty())
        {
            categories.insert(category.to_string());
        }
    }
    categories.into_iter().collect()
}

/// Every tag on the merged records, sorted and unique.
pub fn all_tags(records: &[MergedRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Records keyed by effective category, each list ordered by title.
///
/// Records without a title order by their url instead.
pub fn group_by_category(records: &[MergedRecord]) -> BTreeMap<String, Vec<MergedRecord>> {
    let mut groups: BTreeMap<String, Vec<MergedRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.effective_category.clone())
            .or_default()
            .push(record.clone());
    }
    for members in groups.values_mut() {
        members.sort_by_cached_key(|r| {
            if r.title().is_empty() {
                r.url().to_string()
            } else {
                r.title().to_string()
            }
        });
    }
    groups
}

/// Live records whose overlay carries a category.
pub fn classified_count(
    records: &[BookmarkRecord],
    metadata: &HashMap<BookmarkId, MetadataRecord>,
) -> usize {
    records
        .iter()
        .filter(|r| {
            metadata
                .get(&r.id)
                .and_then(|m| m.category.as_deref())
                .is_some_and(|c| !c.is_empty())
        })
        .count()
}
