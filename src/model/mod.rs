/// Catalog table model
///
/// - `node.rs` - arena of book rows and description rows
/// - `cache.rs` - thumbnail cache and book-id to row index
/// - `index.rs` - indices, roles, flags, events and requests
/// - `content_model.rs` - the model a view drives

pub mod cache;
pub mod content_model;
pub mod index;
pub mod node;

pub use content_model::ContentModel;
pub use index::{ItemFlags, ItemRole, ModelEvent, ModelIndex, ModelRequest, Orientation, SortOrder};
pub use node::{CellValue, Column};
