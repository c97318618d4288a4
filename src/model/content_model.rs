use std::cell::RefCell;
use std::collections::HashMap;

use super::cache::{BookRowMap, ThumbnailCache};
use super::index::{
    ItemFlags, ItemRole, ModelEvent, ModelIndex, ModelRequest, Orientation, SortOrder,
};
use super::node::{
    CellValue, Column, DescriptionNode, Node, NodeKind, NodeTree, RowNode, COLUMN_COUNT,
};
use crate::config::DEFAULT_FETCH_BATCH_SIZE;
use crate::format::beautify_file_size;
use crate::state::data::{BookInfo, Favicon, SortKey};
use crate::state::downloads::Downloads;
use crate::thumbnail::{Thumbnail, ThumbnailRequest};

const HEADER_LABELS: [&str; COLUMN_COUNT] =
    ["Icon", "Name", "Date", "Size", "Content Type", "Download"];

/// Two-level table model over the catalog: one row per book, each with a
/// single description child.
///
/// All methods must be called from the UI thread. The model holds `Rc`
/// download states and is therefore not `Send`. Work for other components
/// (thumbnail fetches, sort requests) is queued and drained with
/// [`take_requests`](Self::take_requests); change notifications are drained
/// with [`take_events`](Self::take_events).
pub struct ContentModel {
    books: Vec<BookInfo>,
    tree: NodeTree,
    book_rows: BookRowMap,
    icons: ThumbnailCache,
    /// Top-level rows exposed to the view so far
    visible_rows: usize,
    batch_size: usize,
    /// URL -> books waiting for that icon
    in_flight: RefCell<HashMap<String, Vec<String>>>,
    requests: RefCell<Vec<ModelRequest>>,
    events: Vec<ModelEvent>,
}

impl Default for ContentModel {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_BATCH_SIZE)
    }
}

impl ContentModel {
    /// `batch_size` is the number of rows each `fetch_more` reveals
    pub fn new(batch_size: usize) -> Self {
        Self {
            books: Vec::new(),
            tree: NodeTree::new(header_row()),
            book_rows: BookRowMap::default(),
            icons: ThumbnailCache::default(),
            visible_rows: 0,
            batch_size: batch_size.max(1),
            in_flight: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            events: Vec::new(),
        }
    }

    // ========== Navigation ==========

    pub fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if !self.has_index(row, column, parent) {
            return ModelIndex::invalid();
        }

        let parent_id = parent.node().unwrap_or_else(|| self.tree.root());
        match self.tree.get(parent_id).and_then(|node| node.child(row)) {
            Some(child) => ModelIndex::new(row, column, child),
            None => ModelIndex::invalid(),
        }
    }

    pub fn has_index(&self, row: usize, column: usize, parent: &ModelIndex) -> bool {
        row < self.row_count(parent) && column < self.column_count(parent)
    }

    /// Book rows have no parent index; a description's parent is its book row
    pub fn parent(&self, index: &ModelIndex) -> ModelIndex {
        let Some(node) = self.node(index) else {
            return ModelIndex::invalid();
        };

        match node.parent_item() {
            Some(parent_id) if parent_id != self.tree.root() => match self.tree.get(parent_id) {
                Some(parent) => ModelIndex::new(parent.row(), 0, parent_id),
                None => ModelIndex::invalid(),
            },
            _ => ModelIndex::invalid(),
        }
    }

    /// At the top level this is the paging cursor, not the number of books
    pub fn row_count(&self, parent: &ModelIndex) -> usize {
        if !parent.is_valid() {
            return self.visible_rows;
        }
        self.node(parent).map(Node::child_count).unwrap_or(0)
    }

    pub fn column_count(&self, parent: &ModelIndex) -> usize {
        if !parent.is_valid() {
            return self.tree.root_node().column_count();
        }
        self.node(parent).map(Node::column_count).unwrap_or(0)
    }

    /// Unknown (true) for the root so views keep asking for rows
    pub fn has_children(&self, parent: &ModelIndex) -> bool {
        match self.node(parent) {
            Some(node) => node.child_count() > 0,
            None => true,
        }
    }

    // ========== Data ==========

    /// Cell value for `index`.
    ///
    /// The icon column resolves URLs through the thumbnail cache. On a miss
    /// a fetch is queued and `None` is returned; the view gets a
    /// `DataChanged` for the cell once the icon arrives.
    pub fn data(&self, index: &ModelIndex, role: ItemRole) -> Option<CellValue> {
        if !matches!(role, ItemRole::Display | ItemRole::AdditionalInfo) {
            return None;
        }

        let node = self.node(index)?;
        let value = node.data(index.column())?;
        if index.column() != Column::Icon.index() || node.is_description() {
            return Some(value);
        }

        match value {
            CellValue::Url(url) => {
                if let Some(data) = self.icons.get(&url) {
                    return Some(CellValue::Image(data.to_vec()));
                }
                if !url.is_empty() {
                    self.request_thumbnail(url, node.book_id());
                }
                None
            }
            other => Some(other),
        }
    }

    /// Description rows are inert; book rows keep the default flags
    pub fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if self.node(index).is_none() {
            return ItemFlags::NONE;
        }

        if self.parent(index).is_valid() {
            ItemFlags::DEFAULT
                & !(ItemFlags::SELECTABLE
                    | ItemFlags::EDITABLE
                    | ItemFlags::DRAG_ENABLED
                    | ItemFlags::DROP_ENABLED
                    | ItemFlags::USER_CHECKABLE)
        } else {
            ItemFlags::DEFAULT
        }
    }

    pub fn header_data(
        &self,
        section: usize,
        orientation: Orientation,
        role: ItemRole,
    ) -> Option<&'static str> {
        if role != ItemRole::Display || orientation != Orientation::Horizontal {
            return None;
        }
        match section {
            1..=4 => Some(HEADER_LABELS[section]),
            _ => None,
        }
    }

    /// Book id behind `index` (a description answers with its book's id)
    pub fn book_id(&self, index: &ModelIndex) -> Option<&str> {
        let node = self.node(index)?;
        if node.is_description() {
            let parent = self.tree.get(node.parent_item()?)?;
            return Some(parent.book_id());
        }
        Some(node.book_id())
    }

    // ========== Rebuild and paging ==========

    /// Replace the whole catalog.
    ///
    /// Every index handed out before this call becomes invalid. All rows are
    /// built up front; only the exposed row count is paged.
    pub fn set_books_data(&mut self, books: Vec<BookInfo>, downloads: &Downloads) {
        self.events.push(ModelEvent::ResetStarted);

        self.books = books;
        self.tree = NodeTree::new(header_row());
        self.book_rows.clear();
        self.visible_rows = 0;

        let root = self.tree.root();
        for book in &self.books {
            let mut row = row_for_book(book, &self.icons);

            // Restore download state across reloads (filtering, sorting)
            if let Some(state) = downloads.get(&book.id) {
                row.set_download_state(Some(state));
            }

            let position = self.tree.row_count();
            let Some(row_id) = self.tree.append_child(root, &book.id, NodeKind::Row(row)) else {
                continue;
            };
            let description = DescriptionNode::new(book.description.clone());
            self.tree
                .append_child(row_id, "", NodeKind::Description(description));
            self.book_rows.insert(book.id.clone(), position);
        }

        self.events.push(ModelEvent::ResetFinished);
        tracing::info!(books = self.books.len(), "Catalog tree rebuilt");

        self.events.push(ModelEvent::DataChanged {
            top_left: ModelIndex::invalid(),
            bottom_right: ModelIndex::invalid(),
        });
    }

    pub fn can_fetch_more(&self, parent: &ModelIndex) -> bool {
        !parent.is_valid() && self.visible_rows < self.books.len()
    }

    /// Reveal the next batch of top-level rows
    pub fn fetch_more(&mut self, parent: &ModelIndex) {
        if parent.is_valid() {
            return;
        }

        let remainder = self.books.len().saturating_sub(self.visible_rows);
        let count = remainder.min(self.batch_size);
        if count == 0 {
            return;
        }

        let first = self.visible_rows;
        let last = first + count - 1;
        let parent = ModelIndex::invalid();

        self.events.push(ModelEvent::RowsInsertStarted { parent, first, last });
        self.visible_rows += count;
        self.events.push(ModelEvent::RowsInserted { parent, first, last });

        tracing::debug!(first, last, total = self.books.len(), "Fetched more rows");
    }

    // ========== Sorting ==========

    /// Forward a sort to the record source. Nothing is reordered here; the
    /// source answers with a fresh `set_books_data`.
    pub fn sort(&mut self, column: usize, order: SortOrder) {
        let key = match Column::from_index(column) {
            Some(Column::Icon | Column::Tags | Column::Download) => return,
            Some(Column::Name) => SortKey::Title,
            Some(Column::Date) => SortKey::Date,
            Some(Column::Size) => SortKey::Size,
            None => SortKey::Unsorted,
        };

        self.requests.get_mut().push(ModelRequest::Sort {
            key,
            ascending: order == SortOrder::Ascending,
        });
    }

    // ========== Thumbnails ==========

    fn request_thumbnail(&self, url: String, book_id: &str) {
        let mut in_flight = self.in_flight.borrow_mut();
        let waiting = in_flight.entry(url.clone()).or_default();
        let first_request = waiting.is_empty();
        if !waiting.iter().any(|id| id == book_id) {
            waiting.push(book_id.to_string());
        }

        if first_request {
            tracing::trace!(url = url.as_str(), book_id, "Queueing thumbnail fetch");
            self.requests
                .borrow_mut()
                .push(ModelRequest::FetchThumbnail(ThumbnailRequest {
                    url,
                    book_id: book_id.to_string(),
                }));
        }
    }

    /// Consume a finished fetch. Results for books that are no longer
    /// listed are dropped.
    pub fn update_image(&mut self, thumbnail: Thumbnail) {
        let Thumbnail { book_id, url, data } = thumbnail;

        let mut waiting = self.in_flight.get_mut().remove(&url).unwrap_or_default();
        if !waiting.contains(&book_id) {
            waiting.insert(0, book_id.clone());
        }

        let rows: Vec<usize> = waiting
            .iter()
            .filter_map(|id| self.book_rows.get(id))
            .collect();
        if rows.is_empty() {
            tracing::debug!(book_id = book_id.as_str(), "Dropping thumbnail for unlisted book");
            return;
        }

        for row in rows {
            if let Some(node) = self.tree.row_node_mut(row) {
                node.set_icon_data(data.clone());
            }
            self.notify_cell(row, Column::Icon);
        }
        self.icons.insert(url, data);
    }

    /// A fetch failed; let a later view query try again
    pub fn thumbnail_failed(&mut self, url: &str) {
        self.in_flight.get_mut().remove(url);
    }

    // ========== Downloads ==========

    /// A download started or progressed: pick up the tracker's state for
    /// the book and repaint its download cell
    pub fn update_download(&mut self, book_id: &str, downloads: &Downloads) {
        let Some(row) = self.book_rows.get(book_id) else {
            return;
        };
        if let Some(node) = self.tree.row_node_mut(row) {
            node.set_download_state(downloads.get(book_id));
        }
        self.notify_cell(row, Column::Download);
    }

    /// The caller already paused the download; repaint the cell
    pub fn pause_download(&mut self, index: &ModelIndex) {
        self.renotify(index);
    }

    /// The caller already resumed the download; repaint the cell
    pub fn resume_download(&mut self, index: &ModelIndex) {
        self.renotify(index);
    }

    pub fn remove_download(&mut self, book_id: &str) {
        let Some(row) = self.book_rows.get(book_id) else {
            return;
        };
        if let Some(node) = self.tree.row_node_mut(row) {
            node.set_download_state(None);
        }
        self.notify_cell(row, Column::Download);
    }

    // ========== Queues ==========

    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn take_requests(&mut self) -> Vec<ModelRequest> {
        std::mem::take(self.requests.get_mut())
    }

    // ========== Accessors ==========

    pub fn books(&self) -> &[BookInfo] {
        &self.books
    }

    /// Top-level row of `book_id`, whether or not it is exposed yet
    pub fn book_row(&self, book_id: &str) -> Option<usize> {
        self.book_rows.get(book_id)
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.icons
    }

    fn node(&self, index: &ModelIndex) -> Option<&Node> {
        self.tree.get(index.node()?)
    }

    /// Emit a change for one cell of a book row, if the view can see it
    fn notify_cell(&mut self, row: usize, column: Column) {
        if row >= self.visible_rows {
            return;
        }
        let index = self.index(row, column.index(), &ModelIndex::invalid());
        self.renotify(&index);
    }

    fn renotify(&mut self, index: &ModelIndex) {
        if index.is_valid() {
            self.events.push(ModelEvent::DataChanged {
                top_left: *index,
                bottom_right: *index,
            });
        }
    }
}

fn header_row() -> RowNode {
    RowNode::new(
        HEADER_LABELS
            .iter()
            .map(|label| CellValue::Text(label.to_string()))
            .collect(),
    )
}

fn row_for_book(book: &BookInfo, icons: &ThumbnailCache) -> RowNode {
    let icon = match &book.favicon {
        Favicon::Data(data) => CellValue::Image(data.clone()),
        Favicon::Url(url) => match icons.get(url) {
            Some(data) => CellValue::Image(data.to_vec()),
            None => CellValue::Url(url.clone()),
        },
    };

    RowNode::new(vec![
        icon,
        CellValue::Text(book.title.clone()),
        CellValue::Text(book.date.clone()),
        CellValue::Text(beautify_file_size(book.size)),
        CellValue::Text(book.tags.clone()),
    ])
}
