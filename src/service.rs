//! Fill service: resolve a template, fill it off the async runtime, cache the output

use crate::error::{Error, Result};
use crate::pdf::{self, FieldInfo, FillOptions, FormData, FormDocument, MutationReport};
use crate::source::{
    output_file_name, resolve, CachedPdf, OutputCache, ResolvedPdf, TemplateSource,
    TemplateStore,
};
use std::sync::Arc;

/// A filled PDF ready to hand back to a caller
#[derive(Debug, Clone)]
pub struct FilledPdf {
    pub data: Vec<u8>,
    pub file_name: String,
    pub source_name: String,
    pub page_count: u32,
    pub report: MutationReport,
    /// Key under which the output was cached, if it fit the cache budget
    pub cache_key: Option<String>,
}

/// Fields of a template, for discovering names before filling
#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub source_name: String,
    pub page_count: u32,
    pub fields: Vec<FieldInfo>,
}

/// Entry point for every transport
#[derive(Clone)]
pub struct FillService {
    store: Arc<dyn TemplateStore>,
    cache: Arc<OutputCache>,
    options: FillOptions,
}

impl FillService {
    pub fn new(store: Arc<dyn TemplateStore>, cache: Arc<OutputCache>, options: FillOptions) -> Self {
        tracing::debug!(store = %store.describe(), "Created fill service");
        Self {
            store,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    pub fn cache(&self) -> &OutputCache {
        &self.cache
    }

    /// Fill a template and cache the output for chaining
    pub async fn fill(&self, source: &TemplateSource, form: FormData) -> Result<FilledPdf> {
        if form.is_empty() {
            return Err(Error::invalid_input("formData is required"));
        }

        let resolved = resolve(source, self.store.as_ref(), &self.cache).await?;
        let ResolvedPdf {
            data,
            source_name,
            file_name,
        } = resolved;

        tracing::info!(
            source = %source_name,
            template_bytes = data.len(),
            keys = form.len(),
            "Filling template"
        );

        let options = self.options.clone();
        let filled = tokio::task::spawn_blocking(move || {
            pdf::fill_with_options(&data, &form, &options)
        })
        .await
        .map_err(|e| Error::Worker {
            reason: format!("Task join error: {}", e),
        })??;

        let file_name = output_file_name(&file_name);
        let cache_key = self.cache.insert(CachedPdf {
            data: filled.data.clone(),
            file_name: file_name.clone(),
        });

        tracing::info!(
            source = %source_name,
            output_bytes = filled.data.len(),
            filled = filled.report.mutated_count(),
            unmatched = filled.report.unmatched_keys.len(),
            "Filled template"
        );

        Ok(FilledPdf {
            data: filled.data,
            file_name,
            source_name,
            page_count: filled.page_count,
            report: filled.report,
            cache_key,
        })
    }

    /// List the form fields of a template
    pub async fn inspect(&self, source: &TemplateSource) -> Result<TemplateFields> {
        let resolved = resolve(source, self.store.as_ref(), &self.cache).await?;
        let source_name = resolved.source_name;
        let data = resolved.data;

        let (page_count, fields) = tokio::task::spawn_blocking(move || {
            let document = FormDocument::parse(&data)?;
            Ok::<_, Error>((document.page_count(), document.fields()))
        })
        .await
        .map_err(|e| Error::Worker {
            reason: format!("Task join error: {}", e),
        })??;

        tracing::debug!(source = %source_name, fields = fields.len(), "Listed template fields");

        Ok(TemplateFields {
            source_name,
            page_count,
            fields,
        })
    }
}
