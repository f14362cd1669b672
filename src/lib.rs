//! PDF Form Filler Library
//!
//! Fills the AcroForm fields of template PDFs from field name/value maps:
//! - `pdf`: document model adapter and field mutator
//! - `source`: template stores, inline templates and the output cache
//! - `service`: the fill service every surface goes through
//! - `transport`: API gateway style request/response envelope
//! - `server`: MCP tools `fill_form` and `extract_form_fields`

pub mod config;
pub mod error;
pub mod pdf;
pub mod server;
pub mod service;
pub mod source;
pub mod transport;

pub use config::{ServerConfig, TemplateStoreConfig};
pub use error::{Error, Result};
pub use pdf::{fill, fill_with_options, FieldValue, FillOptions, FormData, MutationReport};
pub use server::{run_server_with_config, FormServer};
pub use service::{FillService, FilledPdf};
pub use source::TemplateSource;
pub use transport::{GatewayRequest, GatewayResponse};
