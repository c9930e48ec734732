// Re-export main components
pub mod api;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod fixer;
pub mod index;
pub mod linkcheck;
pub mod loader;
pub mod normalize;
pub mod query;
pub mod ranking;
pub mod render;
pub mod tokenizer;
pub mod widget;

// Re-export commonly used types
pub use config::WidgetConfig;
pub use controller::{InputController, InputState, Key, KeyOutcome, PointerTarget};
pub use document::{Corpus, Document};
pub use index::{Field, IndexBuilder, SearchHit, SearchIndex};
pub use loader::{CorpusLoader, CorpusSource, HttpSource, SiteDirSource};
pub use normalize::{post_render, remove_trailing_slashes};
pub use render::ResultsView;
pub use tokenizer::Tokenizer;
pub use widget::{Page, SearchSession, SearchWidget, StaticPage};

// Re-export error types
pub use error::SearchError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
