use std::collections::HashMap;

/// Icons fetched so far, keyed by URL.
/// Entries are never evicted; writing the same URL twice just replaces the bytes.
#[derive(Debug, Default, Clone)]
pub struct ThumbnailCache {
    icons: HashMap<String, Vec<u8>>,
}

impl ThumbnailCache {
    pub fn get(&self, url: &str) -> Option<&[u8]> {
        self.icons.get(url).map(Vec::as_slice)
    }

    pub fn insert(&mut self, url: String, data: Vec<u8>) {
        self.icons.insert(url, data);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.icons.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

/// Top-level row of each book in the current snapshot
#[derive(Debug, Default, Clone)]
pub struct BookRowMap {
    rows: HashMap<String, usize>,
}

impl BookRowMap {
    pub fn get(&self, book_id: &str) -> Option<usize> {
        self.rows.get(book_id).copied()
    }

    pub fn insert(&mut self, book_id: String, row: usize) {
        self.rows.insert(book_id, row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_is_harmless() {
        let mut cache = ThumbnailCache::default();
        cache.insert("http://x/1.png".into(), vec![1]);
        cache.insert("http://x/1.png".into(), vec![1]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("http://x/1.png"), Some(&[1u8][..]));
        assert!(!cache.contains("http://x/2.png"));
    }

    #[test]
    fn test_row_map_clear() {
        let mut rows = BookRowMap::default();
        rows.insert("book1".into(), 3);
        assert_eq!(rows.get("book1"), Some(3));

        rows.clear();
        assert!(rows.is_empty());
        assert_eq!(rows.get("book1"), None);
    }
}
