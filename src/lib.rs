/// Content manager core for ZIM archives
///
/// The heart of the crate is [`model::ContentModel`], a two-level table model
/// (one row per book, one description child per row) that a view drives through
/// index navigation. Around it live the collaborators it talks to:
/// - `state` - book records, the SQLite catalog and the download tracker
/// - `thumbnail` - async favicon fetching and downscaling
/// - `config` - persisted user settings
/// - `format` - display helpers

pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod state;
pub mod thumbnail;
