//! Join source records with their overlay metadata.

use std::collections::HashMap;

use tidymark_core::{effective_category, BookmarkId, BookmarkRecord, MergedRecord, MetadataRecord};

/// Merge every source record with its metadata, keeping source order.
///
/// Metadata for ids missing from `source` is ignored.
pub fn merge(
    source: &[BookmarkRecord],
    metadata: &HashMap<BookmarkId, MetadataRecord>,
) -> Vec<MergedRecord> {
    source
        .iter()
        .map(|record| {
            let meta = metadata.get(&record.id);
            MergedRecord {
                bookmark: record.clone(),
                effective_category: effective_category(record, meta),
                tags: meta.map(|m| m.tags.clone()).unwrap_or_default(),
                description: meta.and_then(|m| m.description.clone()),
                ai_processed: meta.is_some_and(|m| m.ai_processed),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidymark_core::defaults::UNCATEGORIZED;

    fn meta(category: &str, tags: &[&str]) -> MetadataRecord {
        MetadataRecord {
            category: Some(category.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ai_processed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_keeps_source_order_and_ignores_orphans() {
        let source = vec![
            BookmarkRecord::new("2", "B", "https://b.dev"),
            BookmarkRecord::new("1", "A", "https://a.dev"),
        ];
        let metadata = HashMap::from([
            ("1".to_string(), meta("Tech", &["rust"])),
            ("99".to_string(), meta("Gone", &[])),
        ]);

        let merged = merge(&source, &metadata);

        let ids: Vec<&str> = merged.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(merged[0].effective_category, UNCATEGORIZED);
        assert!(merged[0].tags.is_empty());
        assert!(!merged[0].ai_processed);
        assert_eq!(merged[1].effective_category, "Tech");
        assert_eq!(merged[1].tags, vec!["rust"]);
        assert!(merged[1].ai_processed);
    }

    #[test]
    fn test_folder_name_wins_over_overlay_category() {
        let source = vec![BookmarkRecord::new("1", "A", "https://a.dev").with_folder("Work")];
        let metadata = HashMap::from([("1".to_string(), meta("Tech", &[]))]);

        assert_eq!(merge(&source, &metadata)[0].effective_category, "Work");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let source = vec![
            BookmarkRecord::new("1", "A", "https://a.dev").with_folder("Work"),
            BookmarkRecord::new("2", "B", "https://b.dev"),
        ];
        let metadata = HashMap::from([("2".to_string(), meta("Tech", &["x"]))]);

        assert_eq!(merge(&source, &metadata), merge(&source, &metadata));
    }
}
