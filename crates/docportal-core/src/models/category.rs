use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "category_name", alias = "name")]
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_count: Option<i64>,
}

impl Category {
    pub fn display_content_count(&self) -> String {
        match self.content_count {
            Some(1) => "1 item".to_string(),
            Some(count) => format!("{} items", count),
            None => "-".to_string(),
        }
    }

    /// Icons are stored as paths relative to the service host.
    pub fn icon_url(&self, host: &str) -> Option<String> {
        self.icon.as_ref().filter(|i| !i.is_empty()).map(|icon| {
            if icon.starts_with("http://") || icon.starts_with("https://") {
                icon.clone()
            } else {
                format!("{}/{}", host.trim_end_matches('/'), icon.trim_start_matches('/'))
            }
        })
    }
}
