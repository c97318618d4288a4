use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::data::{BookInfo, Favicon, SortKey};
use crate::error::{CatalogError, Result};

/// The Library manages the SQLite catalog database.
/// It stores book metadata and answers sorted, filtered listing requests.
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
    sort_by: SortKey,
    ascending: bool,
    search: Option<String>,
}

/// Result of a folder import operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub skipped_count: usize,
}

const BOOK_COLUMNS: &str = "id, title, date, size, tags, description, favicon_url, favicon_data";

impl Library {
    /// Open (or create) the catalog database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        tracing::info!("📁 Catalog database opened at: {}", db_path.display());

        Self::with_connection(conn, Some(db_path.to_path_buf()))
    }

    /// Open a throwaway in-memory catalog
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let library = Library {
            conn,
            db_path,
            sort_by: SortKey::Unsorted,
            ascending: true,
            search: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS books (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                date            TEXT NOT NULL DEFAULT '',
                size            INTEGER NOT NULL DEFAULT 0,
                tags            TEXT NOT NULL DEFAULT '',
                description     TEXT NOT NULL DEFAULT '',
                favicon_url     TEXT NOT NULL DEFAULT '',
                favicon_data    BLOB,
                path            TEXT,
                added_at        INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_books_title ON books(title COLLATE NOCASE)",
            [],
        )?;

        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_books_path ON books(path)",
            [],
        )?;

        tracing::debug!("Catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file (None for in-memory catalogs)
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Get a count of books in the catalog (ignores the search filter)
    pub fn book_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a book, replacing any previous record with the same id
    pub fn add_book(&self, book: &BookInfo) -> Result<()> {
        let (favicon_url, favicon_data) = match &book.favicon {
            Favicon::Url(url) => (url.as_str(), None),
            Favicon::Data(data) => ("", Some(data.as_slice())),
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO books
                (id, title, date, size, tags, description, favicon_url, favicon_data, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                book.id,
                book.title,
                book.date,
                book.size as i64,
                book.tags,
                book.description,
                favicon_url,
                favicon_data,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Remove a book by id. Returns true if a record was deleted.
    pub fn remove_book(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM books WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    /// Look up a single book by id
    pub fn book(&self, id: &str) -> Result<Option<BookInfo>> {
        let sql = format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS);
        let book = self
            .conn
            .query_row(&sql, [id], book_from_row)
            .optional()?;
        Ok(book)
    }

    /// Bulk import serialized `BookInfo` records (a JSON array)
    /// Returns the number of records stored
    pub fn import_catalog_json(&self, json: &str) -> Result<usize> {
        let books: Vec<BookInfo> = serde_json::from_str(json)?;
        for book in &books {
            self.add_book(book)?;
        }
        tracing::info!(count = books.len(), "Imported catalog entries");
        Ok(books.len())
    }

    /// Set the ordering used by `books()`
    pub fn set_sort_by(&mut self, sort_by: SortKey, ascending: bool) {
        tracing::debug!(sort_by = sort_by.as_str(), ascending, "Catalog sort changed");
        self.sort_by = sort_by;
        self.ascending = ascending;
    }

    pub fn sort_by(&self) -> (SortKey, bool) {
        (self.sort_by, self.ascending)
    }

    /// Restrict `books()` to records whose title, tags or description contain `query`
    pub fn set_search(&mut self, query: Option<String>) {
        self.search = query.filter(|q| !q.trim().is_empty());
    }

    /// Get the books matching the current search, in the current sort order
    pub fn books(&self) -> Result<Vec<BookInfo>> {
        let order_column = match self.sort_by {
            SortKey::Title => "title COLLATE NOCASE",
            SortKey::Date => "date",
            SortKey::Size => "size",
            SortKey::Unsorted => "rowid",
        };
        let direction = if self.ascending { "ASC" } else { "DESC" };

        let mut sql = format!("SELECT {} FROM books", BOOK_COLUMNS);
        if self.search.is_some() {
            sql.push_str(" WHERE title LIKE ?1 OR tags LIKE ?1 OR description LIKE ?1");
        }
        sql.push_str(&format!(" ORDER BY {} {}, rowid ASC", order_column, direction));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match &self.search {
            Some(query) => {
                let pattern = format!("%{}%", query.trim());
                stmt.query_map([pattern], book_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => stmt
                .query_map([], book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        Ok(rows)
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<BookInfo> {
    let favicon_url: String = row.get(6)?;
    let favicon_data: Option<Vec<u8>> = row.get(7)?;
    let size: i64 = row.get(3)?;

    Ok(BookInfo {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        size: size.max(0) as u64,
        tags: row.get(4)?,
        description: row.get(5)?,
        favicon: match favicon_data {
            Some(data) => Favicon::Data(data),
            None => Favicon::Url(favicon_url),
        },
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .field("sort_by", &self.sort_by)
            .field("ascending", &self.ascending)
            .finish()
    }
}

/// Default location of the catalog database
/// - Linux: ~/.local/share/zim-catalog/catalog.db
/// - macOS: ~/Library/Application Support/zim-catalog/catalog.db
/// - Windows: %APPDATA%\zim-catalog\catalog.db
pub fn default_db_path() -> Result<PathBuf> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(CatalogError::NoDataDir)?;
    path.push("zim-catalog");
    path.push("catalog.db");
    Ok(path)
}

/// Async function to register all ZIM archives found under a folder
/// Runs in a background thread to avoid blocking the UI
pub async fn import_folder_async(folder_path: PathBuf, db_path: PathBuf) -> Result<ImportResult> {
    tokio::task::spawn_blocking(move || import_folder(&folder_path, &db_path))
        .await
        .map_err(|e| CatalogError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Blocking folder import
/// Opens its own connection: rusqlite::Connection is not Send
pub fn import_folder(folder_path: &Path, db_path: &Path) -> Result<ImportResult> {
    let library = Library::open(db_path)?;
    let mut result = ImportResult::default();

    tracing::info!("🔍 Scanning folder: {}", folder_path.display());

    for entry in WalkDir::new(folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_zim_file(path) {
            continue;
        }

        let book = match book_from_file(path) {
            Ok(book) => book,
            Err(e) => {
                tracing::warn!("⚠️  Could not read {}: {}", path.display(), e);
                continue;
            }
        };

        let inserted = library.conn.execute(
            "INSERT INTO books
                (id, title, date, size, tags, description, favicon_url, path, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                book.id,
                book.title,
                book.date,
                book.size as i64,
                book.tags,
                book.description,
                match &book.favicon {
                    Favicon::Url(url) => url.as_str(),
                    Favicon::Data(_) => "",
                },
                path.to_string_lossy(),
                Utc::now().timestamp(),
            ],
        );

        match inserted {
            Ok(_) => result.imported_count += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                result.skipped_count += 1;
            }
            Err(e) => tracing::warn!("⚠️  Error importing {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "✅ Import complete: {} new, {} skipped",
        result.imported_count,
        result.skipped_count
    );
    Ok(result)
}

fn is_zim_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zim"))
        .unwrap_or(false)
}

/// Build a catalog record from an archive on disk.
/// The archive itself is not opened; everything comes from the file system.
fn book_from_file(path: &Path) -> std::io::Result<BookInfo> {
    let metadata = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    // "wikipedia_en_all_maxi_2024-01" -> tags "wikipedia;en;all;maxi"
    let tags = stem
        .split('_')
        .filter(|part| !part.is_empty() && !part.chars().next().map_or(false, |c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(";");

    let icon_path = path.with_extension("png");
    let favicon = if icon_path.is_file() {
        Favicon::Url(icon_path.to_string_lossy().to_string())
    } else {
        Favicon::Url(String::new())
    };

    Ok(BookInfo {
        id: path.to_string_lossy().to_string(),
        title: stem.replace('_', " "),
        date: modified.format("%Y-%m-%d").to_string(),
        size: metadata.len(),
        tags,
        description: format!("Local archive at {}", path.display()),
        favicon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, title: &str, date: &str, size: u64) -> BookInfo {
        BookInfo {
            id: id.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            size,
            tags: "wikipedia;en".to_string(),
            description: format!("About {}", title),
            favicon: Favicon::Url(format!("http://x/{}.png", id)),
        }
    }

    fn sample_library() -> Library {
        let library = Library::open_in_memory().unwrap();
        library.add_book(&book("b", "banana", "2023-05-01", 300)).unwrap();
        library.add_book(&book("a", "Apple", "2024-01-01", 100)).unwrap();
        library.add_book(&book("c", "cherry", "2022-09-01", 200)).unwrap();
        library
    }

    fn ids(books: &[BookInfo]) -> Vec<&str> {
        books.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_unsorted_keeps_insertion_order() {
        let library = sample_library();
        assert_eq!(ids(&library.books().unwrap()), vec!["b", "a", "c"]);
        assert_eq!(library.book_count().unwrap(), 3);
    }

    #[test]
    fn test_sort_by_title_ignores_case() {
        let mut library = sample_library();
        library.set_sort_by(SortKey::Title, true);
        assert_eq!(ids(&library.books().unwrap()), vec!["a", "b", "c"]);

        library.set_sort_by(SortKey::Title, false);
        assert_eq!(ids(&library.books().unwrap()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_by_date_and_size() {
        let mut library = sample_library();
        library.set_sort_by(SortKey::Date, false);
        assert_eq!(ids(&library.books().unwrap()), vec!["a", "b", "c"]);

        library.set_sort_by(SortKey::Size, true);
        assert_eq!(ids(&library.books().unwrap()), vec!["a", "c", "b"]);
        assert_eq!(library.sort_by(), (SortKey::Size, true));
    }

    #[test]
    fn test_search_filters_records() {
        let mut library = sample_library();
        library.set_search(Some("err".to_string()));
        assert_eq!(ids(&library.books().unwrap()), vec!["c"]);

        library.set_search(Some("   ".to_string()));
        assert_eq!(library.books().unwrap().len(), 3);
    }

    #[test]
    fn test_round_trip_keeps_fields() {
        let library = sample_library();
        let stored = library.book("a").unwrap().unwrap();
        assert_eq!(stored, book("a", "Apple", "2024-01-01", 100));
        assert!(library.book("zzz").unwrap().is_none());
    }

    #[test]
    fn test_icon_bytes_are_stored() {
        let library = Library::open_in_memory().unwrap();
        let mut with_icon = book("x", "Icons", "2024-01-01", 1);
        with_icon.favicon = Favicon::Data(vec![0xFF, 0xD8]);
        library.add_book(&with_icon).unwrap();

        assert_eq!(
            library.book("x").unwrap().unwrap().favicon,
            Favicon::Data(vec![0xFF, 0xD8])
        );
    }

    #[test]
    fn test_remove_book() {
        let library = sample_library();
        assert!(library.remove_book("a").unwrap());
        assert!(!library.remove_book("a").unwrap());
        assert_eq!(library.book_count().unwrap(), 2);
    }

    #[test]
    fn test_import_catalog_json() {
        let library = Library::open_in_memory().unwrap();
        let json = r#"[
            {"id": "w", "title": "Wiktionary", "size": 42},
            {"id": "v", "title": "Wikivoyage", "favicon": {"url": "http://x/v.png"}}
        ]"#;

        assert_eq!(library.import_catalog_json(json).unwrap(), 2);
        assert_eq!(library.book("w").unwrap().unwrap().size, 42);
        assert!(library.import_catalog_json("not json").is_err());
    }

    #[test]
    fn test_import_folder_registers_zim_files() {
        let dir = std::env::temp_dir().join(format!("zim-catalog-import-{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("wikipedia_en_all_maxi_2024-01.zim"), b"ZIM").unwrap();
        std::fs::write(dir.join("notes.txt"), b"skip me").unwrap();
        let db_path = dir.join("catalog.db");

        let first = import_folder(&dir, &db_path).unwrap();
        let second = import_folder(&dir, &db_path).unwrap();

        let library = Library::open(&db_path).unwrap();
        let books = library.books().unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(first, ImportResult { imported_count: 1, skipped_count: 0 });
        assert_eq!(second, ImportResult { imported_count: 0, skipped_count: 1 });
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "wikipedia en all maxi 2024-01");
        assert_eq!(books[0].tags, "wikipedia;en;all;maxi");
        assert_eq!(books[0].size, 3);
    }
}
