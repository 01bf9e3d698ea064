use crate::models::{Category, Tag};

use super::format::contains_ignore_case;

/// Anything the search box can match against.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Tag {
    fn name(&self) -> &str {
        &self.tag
    }
}

/// Case-insensitive substring filter. A blank query matches nothing.
pub fn filter_by_name<'a, T: Named>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| contains_ignore_case(item.name(), query))
        .collect()
}
