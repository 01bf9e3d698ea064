use serde::{Deserialize, Serialize};

use super::tag::Tag;
use super::{deserialize_one_or_many, deserialize_opt_id};

/// Page size used by the portal when it does not report one.
const DEFAULT_PER_PAGE: u32 = 10;

fn first_page() -> u32 {
    1
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 1-based position of the `index`-th item across all pages.
    pub fn row_number(&self, index: usize) -> u64 {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE) as u64;
        (self.current_page.max(1) as u64 - 1) * per_page + index as u64 + 1
    }

    pub fn display_position(&self) -> String {
        format!("Page {} of {}", self.current_page, self.last_page.max(self.current_page))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub media_file: Vec<String>,
    /// JSON-encoded list, as stored by the service
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ContentSummary {
    /// Decode the embedded tag list. Accepts plain names or `{id, tag}`
    /// objects; anything unparseable yields no tags.
    pub fn tag_names(&self) -> Vec<String> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Name(String),
            Tag(Tag),
        }

        let Some(raw) = self.tags.as_deref() else {
            return Vec::new();
        };
        serde_json::from_str::<Vec<Entry>>(raw)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|e| match e {
                        Entry::Name(name) => name,
                        Entry::Tag(tag) => tag.tag,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("-")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDetails {
    #[serde(rename = "contentData")]
    pub content: ContentData,
    #[serde(rename = "contentTags", default)]
    pub tags: Vec<Tag>,
}

impl ContentDetails {
    pub fn tag_ids(&self) -> Vec<i64> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentData {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub media_file: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A file to attach to a content item.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Payload for `category-content/create`.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub category_id: i64,
    pub title: String,
    pub notes: String,
    pub media_file: Option<Upload>,
    pub tag_ids: Vec<i64>,
}

impl NewContent {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required.".to_string());
        }
        if self.notes.trim().is_empty() {
            return Err("Notes are required.".to_string());
        }
        Ok(())
    }
}

/// Payload for `category-content/update/{id}`. Tags are sent by name.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub title: String,
    pub notes: String,
    pub tag_ids: Vec<i64>,
    pub media_files: Vec<Upload>,
}

impl ContentUpdate {
    /// Start an update prefilled from the current state of the item.
    pub fn from_details(details: &ContentDetails) -> Self {
        Self {
            title: details.content.title.clone(),
            notes: details.content.notes.clone().unwrap_or_default(),
            tag_ids: details.tag_ids(),
            media_files: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_navigation() {
        let page: Page<ContentSummary> =
            serde_json::from_str(r#"{"data":[],"current_page":2,"last_page":3}"#).unwrap();
        assert!(page.has_prev());
        assert!(page.has_next());
        assert!(page.is_empty());
        assert_eq!(page.display_position(), "Page 2 of 3");

        let last: Page<ContentSummary> =
            serde_json::from_str(r#"{"data":[],"current_page":3,"last_page":3}"#).unwrap();
        assert!(!last.has_next());
    }

    #[test]
    fn test_page_defaults_when_fields_missing() {
        let page: Page<ContentSummary> = serde_json::from_str("{}").unwrap();
        assert_eq!(page.current_page, 1);
        assert_eq!(page.last_page, 1);
        assert!(!page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn test_row_number() {
        let page: Page<ContentSummary> =
            serde_json::from_str(r#"{"current_page":3,"last_page":5}"#).unwrap();
        assert_eq!(page.row_number(0), 21);
        assert_eq!(page.row_number(4), 25);

        let sized: Page<ContentSummary> =
            serde_json::from_str(r#"{"current_page":2,"last_page":5,"per_page":25}"#).unwrap();
        assert_eq!(sized.row_number(0), 26);
    }

    #[test]
    fn test_content_summary_tag_names() {
        let item: ContentSummary = serde_json::from_str(
            r#"{"id":1,"title":"MRI","tags":"[\"neuro\",\"scan\"]","media_file":"uploads/a.png","category_id":"4"}"#,
        )
        .unwrap();
        assert_eq!(item.tag_names(), vec!["neuro", "scan"]);
        assert_eq!(item.category_id, Some(4));
        assert_eq!(item.media_file, vec!["uploads/a.png"]);

        let objects: ContentSummary =
            serde_json::from_str(r#"{"id":2,"tags":"[{\"id\":1,\"tag\":\"lab\"}]"}"#).unwrap();
        assert_eq!(objects.tag_names(), vec!["lab"]);
        assert_eq!(objects.display_title(), "-");

        let broken: ContentSummary = serde_json::from_str(r#"{"id":3,"tags":"not json"}"#).unwrap();
        assert!(broken.tag_names().is_empty());
    }

    #[test]
    fn test_content_details_wire_names() {
        let details: ContentDetails = serde_json::from_str(
            r#"{"contentData":{"id":5,"title":"Blood test","notes":"fasting","media_file":["a.pdf"]},
                "contentTags":[{"id":2,"tag":"lab"},{"id":9,"tag":"2024"}]}"#,
        )
        .unwrap();
        assert_eq!(details.content.title, "Blood test");
        assert_eq!(details.tag_ids(), vec![2, 9]);

        let update = ContentUpdate::from_details(&details);
        assert_eq!(update.notes, "fasting");
        assert_eq!(update.tag_ids, vec![2, 9]);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_new_content_validation() {
        let mut content = NewContent {
            category_id: 1,
            title: " ".into(),
            notes: "n".into(),
            media_file: None,
            tag_ids: vec![],
        };
        assert_eq!(content.validate().unwrap_err(), "Title is required.");
        content.title = "Report".into();
        content.notes = "".into();
        assert_eq!(content.validate().unwrap_err(), "Notes are required.");
        content.notes = "ok".into();
        assert!(content.validate().is_ok());
    }
}
