//! Exact-url duplicate detection.

use std::collections::HashMap;

use tidymark_core::{DuplicateGroup, MergedRecord};

/// Group records sharing an identical url.
///
/// Only groups with two or more members are returned, ordered by the first
/// occurrence of each url. Members keep source order.
pub fn find_duplicates(records: &[MergedRecord]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for record in records {
        match index.get(record.url()) {
            Some(&i) => groups[i].members.push(record.clone()),
            None => {
                index.insert(record.url(), groups.len());
                groups.push(DuplicateGroup {
                    url: record.url().to_string(),
                    members: vec![record.clone()],
                });
            }
        }
    }

    groups.retain(|g| g.members.len() >= 2);
    groups
}
