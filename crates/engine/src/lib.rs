pub mod align;
pub mod assembler;
pub mod config;
pub mod draft;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod script;
pub mod sync;
pub mod text;
pub mod timeline;
pub mod transcript;

pub use config::ConformSettings;
pub use error::{ConformError, ConformResult, InputRole};
pub use pipeline::*;
pub use timeline::*;
