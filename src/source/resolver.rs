//! Template source selection and resolution

use crate::error::{Error, Result};
use crate::source::{OutputCache, TemplateStore};
use base64::Engine;
use schemars::JsonSchema;
use serde::Serialize;

/// Where a fill request takes its template from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum TemplateSource {
    /// Template kept in the configured template store
    Named {
        /// Template file name, e.g. "w9.pdf"
        template_name: String,
    },
    /// Template supplied inline
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
    /// Output of an earlier fill
    CacheRef {
        /// Cache key returned by a previous fill_form call
        cache_key: String,
    },
}

impl TemplateSource {
    pub fn named(name: impl Into<String>) -> Self {
        TemplateSource::Named {
            template_name: name.into(),
        }
    }

    /// Short label for logs and results
    pub fn label(&self) -> String {
        match self {
            TemplateSource::Named { template_name } => template_name.clone(),
            TemplateSource::Base64 { .. } => "<base64>".to_string(),
            TemplateSource::CacheRef { cache_key } => format!("<cache:{}>", cache_key),
        }
    }
}

const SOURCE_KEYS: &str = "\"template_name\", \"base64\", or \"cache_key\"";

impl<'de> serde::Deserialize<'de> for TemplateSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let value = serde_json::Value::deserialize(deserializer)?;
        let Some(obj) = value.as_object() else {
            return Err(D::Error::custom(format!(
                "Invalid source: expected an object with one of {}",
                SOURCE_KEYS
            )));
        };

        let string_field = |key: &str| -> std::result::Result<Option<String>, D::Error> {
            match obj.get(key) {
                None => Ok(None),
                Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(D::Error::custom(format!("\"{}\" must be a string", key))),
            }
        };

        if let Some(template_name) = string_field("template_name")? {
            return Ok(TemplateSource::Named { template_name });
        }
        if let Some(base64) = string_field("base64")? {
            return Ok(TemplateSource::Base64 { base64 });
        }
        if let Some(cache_key) = string_field("cache_key")? {
            return Ok(TemplateSource::CacheRef { cache_key });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(D::Error::custom(format!(
            "Invalid source: expected an object with one of {}, but got keys: {:?}",
            SOURCE_KEYS, keys
        )))
    }
}

/// Template bytes ready to fill
#[derive(Debug, Clone)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
    /// Name the filled output is derived from
    pub file_name: String,
}

/// Decode an inline base64 template
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
        file_name: "template.pdf".to_string(),
    })
}

/// Look up an earlier output by cache key
pub fn resolve_cache(cache_key: &str, cache: &OutputCache) -> Result<ResolvedPdf> {
    let cached = cache
        .get(cache_key)
        .ok_or_else(|| Error::CacheKeyNotFound {
            key: cache_key.to_string(),
        })?;

    Ok(ResolvedPdf {
        data: cached.data,
        source_name: format!("<cache:{}>", cache_key),
        file_name: cached.file_name,
    })
}

/// Fetch a named template from the store
pub async fn resolve_named(name: &str, store: &dyn TemplateStore) -> Result<ResolvedPdf> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("templateName parameter is required"));
    }

    let data = store.fetch(name).await?;

    Ok(ResolvedPdf {
        data,
        source_name: name.to_string(),
        file_name: name.to_string(),
    })
}

/// Resolve any template source
pub async fn resolve(
    source: &TemplateSource,
    store: &dyn TemplateStore,
    cache: &OutputCache,
) -> Result<ResolvedPdf> {
    match source {
        TemplateSource::Named { template_name } => resolve_named(template_name, store).await,
        TemplateSource::Base64 { base64 } => resolve_base64(base64),
        TemplateSource::CacheRef { cache_key } => resolve_cache(cache_key, cache),
    }
}

/// `w9.pdf` -> `w9_output.pdf`
pub fn output_file_name(template_name: &str) -> String {
    let stem = template_name
        .strip_suffix(".pdf")
        .or_else(|| template_name.strip_suffix(".PDF"))
        .unwrap_or(template_name);
    let stem = stem.strip_suffix("_output").unwrap_or(stem);
    format!("{}_output.pdf", stem)
}
