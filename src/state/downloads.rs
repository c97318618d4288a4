/// Download tracking
///
/// The real transfer engine lives elsewhere; this tracker only keeps the
/// latest known state of each download, keyed by book id. States are shared
/// with the table rows so progress written here is visible the next time a
/// row is painted.

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Download state shared between the tracker and the table rows
pub type SharedDownloadState = Rc<RefCell<DownloadState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloading,
    Paused,
    Completed,
}

/// Latest snapshot of one download
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadState {
    pub status: DownloadStatus,
    /// Bytes received so far
    pub completed_bytes: u64,
    /// Expected total size in bytes (0 if unknown)
    pub total_bytes: u64,
    /// Current transfer rate in bytes per second
    pub speed: u64,
    pub started_at: DateTime<Utc>,
}

impl DownloadState {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            status: DownloadStatus::Downloading,
            completed_bytes: 0,
            total_bytes,
            speed: 0,
            started_at: Utc::now(),
        }
    }

    /// Progress as a percentage in 0.0..=100.0
    pub fn progress(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.completed_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }

    /// Short text for the download column
    pub fn status_text(&self) -> String {
        match self.status {
            DownloadStatus::Downloading => format!("{:.0}%", self.progress()),
            DownloadStatus::Paused => format!("Paused ({:.0}%)", self.progress()),
            DownloadStatus::Completed => "Done".to_string(),
        }
    }
}

/// Tracks in-flight downloads by book id
#[derive(Debug, Default)]
pub struct Downloads {
    states: HashMap<String, SharedDownloadState>,
}

impl Downloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new download (or restart an existing one)
    pub fn start(&mut self, book_id: &str, total_bytes: u64) -> SharedDownloadState {
        let state = Rc::new(RefCell::new(DownloadState::new(total_bytes)));
        self.states.insert(book_id.to_string(), Rc::clone(&state));
        tracing::info!(book_id, total_bytes, "Download started");
        state
    }

    /// Record progress reported by the transfer engine
    /// Returns false if the book has no tracked download
    pub fn update_progress(&mut self, book_id: &str, completed_bytes: u64, speed: u64) -> bool {
        let Some(state) = self.states.get(book_id) else {
            return false;
        };
        let mut state = state.borrow_mut();
        state.completed_bytes = completed_bytes;
        state.speed = speed;
        if state.total_bytes > 0 && completed_bytes >= state.total_bytes {
            state.status = DownloadStatus::Completed;
            state.speed = 0;
        }
        true
    }

    pub fn pause(&mut self, book_id: &str) -> bool {
        self.set_status(book_id, DownloadStatus::Paused)
    }

    pub fn resume(&mut self, book_id: &str) -> bool {
        self.set_status(book_id, DownloadStatus::Downloading)
    }

    /// Stop tracking a download (cancelled or cleaned up)
    pub fn remove(&mut self, book_id: &str) -> Option<SharedDownloadState> {
        self.states.remove(book_id)
    }

    pub fn get(&self, book_id: &str) -> Option<SharedDownloadState> {
        self.states.get(book_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn set_status(&mut self, book_id: &str, status: DownloadStatus) -> bool {
        match self.states.get(book_id) {
            Some(state) => {
                let mut state = state.borrow_mut();
                if state.status != DownloadStatus::Completed {
                    state.status = status;
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_shared_with_holders() {
        let mut downloads = Downloads::new();
        let state = downloads.start("book1", 200);

        assert!(downloads.update_progress("book1", 50, 10));
        assert_eq!(state.borrow().completed_bytes, 50);
        assert_eq!(state.borrow().progress(), 25.0);
    }

    #[test]
    fn test_completes_when_all_bytes_arrive() {
        let mut downloads = Downloads::new();
        let state = downloads.start("book1", 100);

        downloads.update_progress("book1", 100, 5);

        assert_eq!(state.borrow().status, DownloadStatus::Completed);
        assert_eq!(state.borrow().status_text(), "Done");
        // a finished download cannot be paused
        downloads.pause("book1");
        assert_eq!(state.borrow().status, DownloadStatus::Completed);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut downloads = Downloads::new();
        let state = downloads.start("book1", 100);
        downloads.update_progress("book1", 40, 5);

        assert!(downloads.pause("book1"));
        assert_eq!(state.borrow().status_text(), "Paused (40%)");

        assert!(downloads.resume("book1"));
        assert_eq!(state.borrow().status, DownloadStatus::Downloading);
    }

    #[test]
    fn test_unknown_book_is_ignored() {
        let mut downloads = Downloads::new();

        assert!(!downloads.update_progress("missing", 1, 1));
        assert!(!downloads.pause("missing"));
        assert!(downloads.remove("missing").is_none());
        assert!(downloads.is_empty());
    }

    #[test]
    fn test_unknown_total_reports_zero_progress() {
        let state = DownloadState::new(0);
        assert_eq!(state.progress(), 0.0);
    }
}
