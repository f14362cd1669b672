//! Template resolution and output caching

pub mod cache;
pub mod resolver;
pub mod store;

pub use cache::{CachedPdf, OutputCache};
pub use resolver::{
    output_file_name, resolve, resolve_base64, resolve_cache, resolve_named, ResolvedPdf,
    TemplateSource,
};
pub use store::{DirectoryStore, HttpStore, TemplateStore};
