//! MCP server exposing form filling as tools

use crate::config::ServerConfig;
use crate::pdf::{FieldInfo, FieldOutcome, FormData};
use crate::service::FillService;
use crate::source::{OutputCache, TemplateSource};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Request/Response types for fill_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillFormParams {
    /// Template to fill
    pub source: TemplateSource,
    /// Field name to value. Checkboxes are selected by "yes", "true" or "on"
    /// (any case); any other value clears them.
    pub form_data: HashMap<String, serde_json::Value>,
    /// Include the filled PDF as base64 in the result (default: true)
    #[serde(default = "default_true")]
    pub include_pdf: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct FillFormResult {
    /// Template identifier
    pub source: String,
    /// Cache key for the output PDF, usable as {"cache_key": ...} in later calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache_key: Option<String>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
    pub output_page_count: u32,
    /// Number of field widgets rewritten
    pub fields_filled: u32,
    /// Form data names that matched no field
    pub unmatched_keys: Vec<String>,
    pub fields: Vec<FieldOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for extract_form_fields
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractFormFieldsParams {
    /// Template to inspect
    pub source: TemplateSource,
}

#[derive(Debug, Serialize)]
pub struct ExtractFormFieldsResult {
    pub source: String,
    pub page_count: u32,
    pub fields: Vec<FieldInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// PDF form filling MCP server
#[derive(Clone)]
pub struct FormServer {
    service: FillService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FormServer {
    pub fn new(service: FillService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Build the server and its template store from configuration
    pub fn with_config(config: &ServerConfig) -> crate::error::Result<Self> {
        let store = config.build_store()?;
        let cache = OutputCache::new(config.cache_max_entries, config.cache_max_bytes);
        let service = FillService::new(store, Arc::new(cache), config.fill.clone());
        Ok(Self::new(service))
    }

    /// Fill form fields of a template PDF
    #[tool(
        description = "Fill the AcroForm fields of a template PDF and return the filled PDF.

form_data maps field names to values. Names match the field name with one pair of wrapping parentheses removed; matching is case-sensitive.
- Text and other fields: the value is written as text (numbers and booleans as their JSON text, null as empty)
- Checkboxes: \"yes\", \"true\" or \"on\" (any case) select the box; any other value clears it
Cached appearances of changed fields are removed so viewers redraw them.

The output is cached (output_cache_key) so it can be filled again.

Source format: one of {\"template_name\": \"w9.pdf\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn fill_form(&self, Parameters(params): Parameters<FillFormParams>) -> String {
        let result = self.process_fill_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "fill_form failed");
            FillFormResult {
                source: params.source.label(),
                output_cache_key: None,
                file_name: String::new(),
                pdf_base64: None,
                output_page_count: 0,
                fields_filled: 0,
                unmatched_keys: vec![],
                fields: vec![],
                error: Some(e.client_message()),
            }
        });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// List form fields of a template PDF
    #[tool(
        description = "List the form fields of a template PDF: page, stored name, match name, kind (text, checkbox, other), current value, appearance state and checkbox on-states. Use this to discover the names fill_form expects.

Source format: one of {\"template_name\": \"w9.pdf\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn extract_form_fields(
        &self,
        Parameters(params): Parameters<ExtractFormFieldsParams>,
    ) -> String {
        let result = self
            .process_extract_form_fields(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_form_fields failed");
                ExtractFormFieldsResult {
                    source: params.source.label(),
                    page_count: 0,
                    fields: vec![],
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

impl FormServer {
    pub async fn process_fill_form(
        &self,
        params: &FillFormParams,
    ) -> crate::error::Result<FillFormResult> {
        let form: FormData = params
            .form_data
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();

        let filled = self.service.fill(&params.source, form).await?;

        let pdf_base64 = params
            .include_pdf
            .then(|| base64::engine::general_purpose::STANDARD.encode(&filled.data));

        Ok(FillFormResult {
            source: filled.source_name,
            output_cache_key: filled.cache_key,
            file_name: filled.file_name,
            pdf_base64,
            output_page_count: filled.page_count,
            fields_filled: filled.report.mutated_count() as u32,
            unmatched_keys: filled.report.unmatched_keys,
            fields: filled.report.fields,
            error: None,
        })
    }

    pub async fn process_extract_form_fields(
        &self,
        params: &ExtractFormFieldsParams,
    ) -> crate::error::Result<ExtractFormFieldsResult> {
        let listed = self.service.inspect(&params.source).await?;
        Ok(ExtractFormFieldsResult {
            source: listed.source_name,
            page_count: listed.page_count,
            fields: listed.fields,
            error: None,
        })
    }
}

#[tool_handler]
impl ServerHandler for FormServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF form filler: fill AcroForm templates with fill_form and discover field \
                 names with extract_form_fields."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server over stdio
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = FormServer::with_config(&config)?;

    tracing::info!("PDF form filler MCP server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
