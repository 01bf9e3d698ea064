use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub tag: String,
}

/// Resolve selected tag ids to tag names, dropping ids that are not in `tags`.
pub fn names_for_ids(tags: &[Tag], ids: &[i64]) -> Vec<String> {
    tags.iter()
        .filter(|t| ids.contains(&t.id))
        .map(|t| t.tag.clone())
        .collect()
}

/// Trim a new tag name; `None` if nothing is left.
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_for_ids_keeps_tag_order_and_skips_unknown() {
        let tags = vec![
            Tag { id: 1, tag: "mri".into() },
            Tag { id: 2, tag: "blood".into() },
            Tag { id: 3, tag: "x-ray".into() },
        ];
        assert_eq!(names_for_ids(&tags, &[3, 1, 99]), vec!["mri", "x-ray"]);
        assert!(names_for_ids(&tags, &[]).is_empty());
    }

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("  cardio "), Some("cardio".to_string()));
        assert_eq!(normalize_tag_name("   "), None);
    }
}
