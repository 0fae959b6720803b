//! Effective category resolution.
//!
//! A bookmark's folder wins over the AI-assigned category; the sentinel is
//! used only when neither is available.

use crate::defaults::UNCATEGORIZED;
use crate::models::{BookmarkRecord, MetadataRecord};

/// Category shown and filtered on for a bookmark.
pub fn effective_category(record: &BookmarkRecord, metadata: Option<&MetadataRecord>) -> String {
    if record.has_folder() {
        return record.folder_name.clone();
    }

    metadata
        .and_then(|m| m.category.as_deref())
        .filter(|c| !c.is_empty())
        .unwrap_or(UNCATEGORIZED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(category: &str) -> MetadataRecord {
        MetadataRecord {
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_folder_wins_over_ai_category() {
        let record = BookmarkRecord::new("1", "Cats", "https://cats.example").with_folder("Pets");
        assert_eq!(effective_category(&record, Some(&metadata("Animals"))), "Pets");
    }

    #[test]
    fn test_ai_category_used_outside_folders() {
        let record = BookmarkRecord::new("1", "Cats", "https://cats.example");
        assert_eq!(effective_category(&record, Some(&metadata("Animals"))), "Animals");
    }

    #[test]
    fn test_sentinel_when_nothing_known() {
        let record = BookmarkRecord::new("1", "Cats", "https://cats.example");
        assert_eq!(effective_category(&record, None), UNCATEGORIZED);
        assert_eq!(effective_category(&record, Some(&metadata(""))), UNCATEGORIZED);
    }

    #[test]
    fn test_real_folder_named_like_sentinel_wins() {
        let record = BookmarkRecord::new("1", "Cats", "https://cats.example")
            .with_folder(UNCATEGORIZED);
        assert!(record.has_folder());
        assert_eq!(effective_category(&record, Some(&metadata("Animals"))), UNCATEGORIZED);

        let loose = BookmarkRecord::new("2", "Dogs", "https://dogs.example");
        assert!(!loose.has_folder());
        assert_eq!(effective_category(&loose, Some(&metadata("Animals"))), "Animals");
    }
}
