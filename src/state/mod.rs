/// State management module
///
/// This module holds everything the table model consumes:
/// - Book records and sort keys (data.rs)
/// - The SQLite catalog that supplies sorted, filtered record lists (library.rs)
/// - The download tracker whose states are shown in the download column (downloads.rs)

pub mod data;
pub mod downloads;
pub mod library;
