pub mod text_loader;

pub use text_loader::{discover_text_files, load_document};
