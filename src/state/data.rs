/// Shared data structures for the catalog
///
/// These structs represent the records that flow from the catalog
/// library into the table model.

use serde::{Deserialize, Serialize};

/// Where a book's icon comes from
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Favicon {
    /// Already-decoded image bytes
    Data(Vec<u8>),
    /// URL (or local path) the icon can be fetched from; empty when the book has none
    Url(String),
}

impl Default for Favicon {
    fn default() -> Self {
        Favicon::Url(String::new())
    }
}

/// Represents a single content package (ZIM archive) in the catalog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct BookInfo {
    /// Stable external identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Publication date (e.g., "2024-01-15")
    pub date: String,
    /// Archive size in bytes
    pub size: u64,
    /// Comma or semicolon separated tags
    pub tags: String,
    /// Long description shown in the expandable child row
    pub description: String,
    /// Icon data or the location to fetch it from
    pub favicon: Favicon,
}

/// Sort keys understood by the record source
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Date,
    Size,
    #[default]
    Unsorted,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Date => "date",
            SortKey::Size => "size",
            SortKey::Unsorted => "unsorted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let book: BookInfo = serde_json::from_str(r#"{"id": "abc", "title": "Wikipedia"}"#).unwrap();

        assert_eq!(book.id, "abc");
        assert_eq!(book.size, 0);
        assert_eq!(book.favicon, Favicon::Url(String::new()));
    }

    #[test]
    fn test_favicon_url_from_json() {
        let book: BookInfo =
            serde_json::from_str(r#"{"id": "a", "favicon": {"url": "http://x/1.png"}}"#).unwrap();

        assert_eq!(book.favicon, Favicon::Url("http://x/1.png".to_string()));
    }

    #[test]
    fn test_sort_key_names() {
        assert_eq!(SortKey::Title.as_str(), "title");
        assert_eq!(SortKey::Unsorted.as_str(), "unsorted");
        assert_eq!(serde_json::to_string(&SortKey::Date).unwrap(), "\"date\"");
    }
}
