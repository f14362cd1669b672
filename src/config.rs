//! Configuration for the form filler service

use crate::error::Result;
use crate::pdf::{CheckboxOnState, FillOptions};
use crate::source::{DirectoryStore, HttpStore, TemplateStore};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_TEMPLATE_PREFIX: &str = "pdf_templates/";
pub const DEFAULT_TEMPLATE_DIR: &str = "pdf_templates";

/// Where named templates live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateStoreConfig {
    Directory {
        root: PathBuf,
    },
    Http {
        base_url: String,
        key_prefix: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub templates: TemplateStoreConfig,
    /// Allow template URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum template size in bytes (default: 100MB)
    pub max_download_bytes: u64,
    /// Maximum number of cached outputs (default: 100)
    pub cache_max_entries: usize,
    /// Maximum total bytes of cached outputs (default: 512MB)
    pub cache_max_bytes: usize,
    pub fill: FillOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            templates: TemplateStoreConfig::Directory {
                root: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            },
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024,
            cache_max_entries: 100,
            cache_max_bytes: 512 * 1024 * 1024,
            fill: FillOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Read `PDF_FORM_*` environment variables over the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable lookup; unset or unparsable values
    /// keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let templates = match (var("PDF_FORM_TEMPLATE_DIR"), var("PDF_FORM_TEMPLATE_BASE_URL")) {
            (Some(dir), _) => TemplateStoreConfig::Directory {
                root: PathBuf::from(dir),
            },
            (None, Some(base_url)) => TemplateStoreConfig::Http {
                base_url,
                key_prefix: lookup("PDF_FORM_TEMPLATE_PREFIX")
                    .unwrap_or_else(|| DEFAULT_TEMPLATE_PREFIX.to_string()),
            },
            (None, None) => defaults.templates,
        };

        let checkbox_on_state = match var("PDF_FORM_CHECKBOX_ON_STATE")
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("appearance") => CheckboxOnState::FromAppearance,
            _ => CheckboxOnState::Yes,
        };

        Self {
            templates,
            allow_private_urls: var("PDF_FORM_ALLOW_PRIVATE_URLS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.allow_private_urls),
            max_download_bytes: var("PDF_FORM_MAX_DOWNLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_download_bytes),
            cache_max_entries: var("PDF_FORM_CACHE_MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            cache_max_bytes: var("PDF_FORM_CACHE_MAX_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_bytes),
            fill: FillOptions {
                checkbox_on_state,
                need_appearances: var("PDF_FORM_NEED_APPEARANCES")
                    .and_then(|v| parse_flag(&v))
                    .unwrap_or(defaults.fill.need_appearances),
            },
        }
    }

    /// Construct the configured template store
    pub fn build_store(&self) -> Result<Arc<dyn TemplateStore>> {
        let store: Arc<dyn TemplateStore> = match &self.templates {
            TemplateStoreConfig::Directory { root } => {
                Arc::new(DirectoryStore::new(root.clone(), self.max_download_bytes))
            }
            TemplateStoreConfig::Http {
                base_url,
                key_prefix,
            } => Arc::new(HttpStore::new(
                base_url,
                key_prefix.clone(),
                self.allow_private_urls,
                self.max_download_bytes,
            )?),
        };
        Ok(store)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
