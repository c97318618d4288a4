use iced::widget::image::{Handle, Image};
use iced::widget::{button, column, container, row, scrollable, text, text_input, Column, Row};
use iced::{Alignment, Element, Length, Padding, Task, Theme};
use rfd::FileDialog;
use std::collections::HashSet;

use zim_catalog::config::{self, Settings};
use zim_catalog::model::{
    CellValue, Column as TableColumn, ContentModel, ItemRole, ModelIndex, ModelRequest,
    Orientation, SortOrder,
};
use zim_catalog::state::data::SortKey;
use zim_catalog::state::downloads::Downloads;
use zim_catalog::state::library::{self, ImportResult, Library};
use zim_catalog::thumbnail::{self, Thumbnail};

/// Main application state
struct ZimCatalog {
    /// The catalog database (record source)
    library: Library,
    /// Downloads known to this session
    downloads: Downloads,
    /// Table model the view is built from
    model: ContentModel,
    settings: Settings,
    search: String,
    /// Books whose description row is expanded
    expanded: HashSet<String>,
    sort_column: Option<usize>,
    sort_order: SortOrder,
    /// Icon URLs whose fetch failed; retried on the next reload
    failed_icons: Vec<String>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Import Folder" button
    ImportFolder,
    /// Background import completed
    ImportComplete(Result<ImportResult, String>),
    SearchChanged(String),
    /// User clicked a column header
    SortBy(usize),
    LoadMore,
    ToggleDescription(String),
    ThumbnailFetched {
        url: String,
        result: Result<Thumbnail, String>,
    },
}

impl ZimCatalog {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let settings = Settings::load_or_default();

        // If this fails, we panic because the app cannot function without its catalog
        let db_path = settings
            .database_path()
            .expect("Could not determine where to store the catalog");
        let mut library = Library::open(&db_path)
            .expect("Failed to open catalog database. Check permissions and disk space.");
        library.set_sort_by(settings.sort_by, settings.ascending);

        // An optional JSON catalog passed on the command line is merged in at startup
        if let Some(catalog_path) = std::env::args().nth(1) {
            match std::fs::read_to_string(&catalog_path) {
                Ok(json) => match library.import_catalog_json(&json) {
                    Ok(count) => tracing::info!("📚 Imported {} books from {}", count, catalog_path),
                    Err(e) => tracing::error!("Invalid catalog {}: {}", catalog_path, e),
                },
                Err(e) => tracing::error!("Could not read {}: {}", catalog_path, e),
            }
        }

        let sort_column = sort_column_for(settings.sort_by);
        let sort_order = if settings.ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };

        let mut app = ZimCatalog {
            library,
            downloads: Downloads::new(),
            model: ContentModel::new(settings.batch_size()),
            settings,
            search: String::new(),
            expanded: HashSet::new(),
            sort_column,
            sort_order,
            failed_icons: Vec::new(),
            status: String::new(),
        };
        let task = app.reload();

        tracing::info!("🎨 ZIM Catalog initialized with {} books", app.model.books().len());
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with ZIM Archives")
                    .pick_folder();

                let Some(folder_path) = folder else {
                    return Task::none();
                };
                let Some(db_path) = self.library.path().cloned() else {
                    self.status = "This catalog cannot import folders.".to_string();
                    return Task::none();
                };

                self.status = format!("Importing from {}...", folder_path.display());
                Task::perform(
                    library::import_folder_async(folder_path, db_path),
                    |result| Message::ImportComplete(result.map_err(|e| e.to_string())),
                )
            }
            Message::ImportComplete(Ok(result)) => {
                let task = self.reload();
                self.status = format!(
                    "✅ Import complete! Added {} books, skipped {} duplicates.",
                    result.imported_count, result.skipped_count
                );
                task
            }
            Message::ImportComplete(Err(e)) => {
                tracing::error!("Import failed: {}", e);
                self.status = format!("Import failed: {}", e);
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.search = query.clone();
                self.library.set_search(Some(query));
                self.reload()
            }
            Message::SortBy(column) => {
                let order = if self.sort_column == Some(column) {
                    self.sort_order.reversed()
                } else {
                    SortOrder::Ascending
                };
                self.model.sort(column, order);
                self.sync()
            }
            Message::LoadMore => {
                let root = ModelIndex::invalid();
                if self.model.can_fetch_more(&root) {
                    self.model.fetch_more(&root);
                }
                self.sync()
            }
            Message::ToggleDescription(book_id) => {
                if !self.expanded.remove(&book_id) {
                    self.expanded.insert(book_id);
                }
                Task::none()
            }
            Message::ThumbnailFetched { url, result } => {
                match result {
                    Ok(thumbnail) => self.model.update_image(thumbnail),
                    Err(e) => {
                        tracing::warn!("⚠️  Thumbnail {} failed: {}", url, e);
                        self.failed_icons.push(url);
                    }
                }
                self.sync()
            }
        }
    }

    /// Ask the library for a fresh record list and rebuild the model from it
    fn reload(&mut self) -> Task<Message> {
        for url in self.failed_icons.drain(..) {
            self.model.thumbnail_failed(&url);
        }

        match self.library.books() {
            Ok(books) => {
                self.status = format!("Ready. {} books in catalog.", books.len());
                self.model.set_books_data(books, &self.downloads);
                self.model.fetch_more(&ModelIndex::invalid());
            }
            Err(e) => {
                tracing::error!("Could not list books: {}", e);
                self.status = format!("Could not list books: {}", e);
            }
        }
        self.sync()
    }

    /// Drain the model's queues: start thumbnail fetches and apply sort requests
    fn sync(&mut self) -> Task<Message> {
        // Touch every visible icon so missing thumbnails are requested before the next paint
        let root = ModelIndex::invalid();
        for row in 0..self.model.row_count(&root) {
            let index = self.model.index(row, TableColumn::Icon.index(), &root);
            self.model.data(&index, ItemRole::Display);
        }

        let events = self.model.take_events();
        tracing::trace!(count = events.len(), "Model changed");

        let mut tasks = Vec::new();
        for request in self.model.take_requests() {
            match request {
                ModelRequest::FetchThumbnail(request) => {
                    let url = request.url.clone();
                    tasks.push(Task::perform(
                        thumbnail::fetch_thumbnail(request, self.settings.thumbnail_size),
                        move |result| Message::ThumbnailFetched {
                            url: url.clone(),
                            result: result.map_err(|e| e.to_string()),
                        },
                    ));
                }
                ModelRequest::Sort { key, ascending } => {
                    self.sort_column = sort_column_for(key);
                    self.sort_order = if ascending {
                        SortOrder::Ascending
                    } else {
                        SortOrder::Descending
                    };
                    self.library.set_sort_by(key, ascending);
                    self.save_sort(key, ascending);
                    tasks.push(self.reload());
                }
            }
        }

        Task::batch(tasks)
    }

    fn save_sort(&mut self, key: SortKey, ascending: bool) {
        self.settings.sort_by = key;
        self.settings.ascending = ascending;

        let saved = config::settings_path().and_then(|path| self.settings.save(&path));
        if let Err(e) = saved {
            tracing::warn!("Could not save settings: {}", e);
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let root = ModelIndex::invalid();
        let column_count = self.model.column_count(&root);

        let header = (0..column_count).fold(Row::new().spacing(10), |header, section| {
            let label = self
                .model
                .header_data(section, Orientation::Horizontal, ItemRole::Display)
                .unwrap_or("");
            let arrow = match (self.sort_column == Some(section), self.sort_order) {
                (true, SortOrder::Ascending) => " ▲",
                (true, SortOrder::Descending) => " ▼",
                (false, _) => "",
            };
            header.push(
                button(text(format!("{}{}", label, arrow)))
                    .on_press(Message::SortBy(section))
                    .width(column_width(section)),
            )
        });

        let mut rows = Column::new().spacing(4);
        for r in 0..self.model.row_count(&root) {
            let row_index = self.model.index(r, 0, &root);
            let book_id = self.model.book_id(&row_index).unwrap_or_default().to_string();
            let expanded = self.expanded.contains(&book_id);

            let mut line = Row::new().spacing(10).align_y(Alignment::Center);
            for c in 0..column_count {
                let index = self.model.index(r, c, &root);
                line = line.push(container(self.cell(&index)).width(column_width(c)));
            }
            line = line.push(
                button(text(if expanded { "Hide" } else { "Details" }))
                    .on_press(Message::ToggleDescription(book_id)),
            );
            rows = rows.push(line);

            if expanded && self.model.has_children(&row_index) {
                let description = self.model.index(0, 0, &row_index);
                if let Some(CellValue::Text(description)) =
                    self.model.data(&description, ItemRole::Display)
                {
                    let indent = Padding {
                        top: 0.0,
                        right: 0.0,
                        bottom: 8.0,
                        left: 60.0,
                    };
                    rows = rows.push(container(text(description).size(14)).padding(indent));
                }
            }
        }

        let mut list = column![header, rows].spacing(8);
        if self.model.can_fetch_more(&root) {
            list = list.push(button("Load more").on_press(Message::LoadMore).padding(8));
        }

        let controls = row![
            button("Import Folder")
                .on_press(Message::ImportFolder)
                .padding(10),
            text_input("Search books...", &self.search)
                .on_input(Message::SearchChanged)
                .padding(10),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let content = column![
            controls,
            scrollable(list).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn cell(&self, index: &ModelIndex) -> Element<Message> {
        match self.model.data(index, ItemRole::Display) {
            Some(CellValue::Image(bytes)) => Image::new(Handle::from_bytes(bytes))
                .width(Length::Fixed(32.0))
                .height(Length::Fixed(32.0))
                .into(),
            Some(CellValue::Text(value)) => text(value).into(),
            Some(CellValue::Download(state)) => text(state.status_text()).into(),
            Some(CellValue::Url(_)) | None => text("").into(),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Header section that shows the arrow for `key`
fn sort_column_for(key: SortKey) -> Option<usize> {
    match key {
        SortKey::Title => Some(TableColumn::Name.index()),
        SortKey::Date => Some(TableColumn::Date.index()),
        SortKey::Size => Some(TableColumn::Size.index()),
        SortKey::Unsorted => None,
    }
}

fn column_width(column: usize) -> Length {
    match TableColumn::from_index(column) {
        Some(TableColumn::Icon) => Length::Fixed(40.0),
        Some(TableColumn::Name) => Length::FillPortion(3),
        Some(TableColumn::Date) => Length::Fixed(100.0),
        Some(TableColumn::Size) => Length::Fixed(90.0),
        Some(TableColumn::Tags) => Length::FillPortion(2),
        Some(TableColumn::Download) | None => Length::Fixed(110.0),
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zim_catalog=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() -> iced::Result {
    init_logging();

    iced::application("ZIM Catalog", ZimCatalog::update, ZimCatalog::view)
        .theme(ZimCatalog::theme)
        .centered()
        .run_with(ZimCatalog::new)
}
