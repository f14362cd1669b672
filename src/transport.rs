//! API gateway request/response envelope
//!
//! Requests name a template with the `templateName` query parameter and carry
//! `{"formData": {...}}` as the JSON body. Successful responses carry the
//! filled PDF base64 encoded.

use crate::error::{Error, Result};
use crate::pdf::FormData;
use crate::service::{FilledPdf, FillService};
use crate::source::TemplateSource;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound gateway event
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// Outbound gateway response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl GatewayResponse {
    fn pdf(filled: &FilledPdf) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        let headers = HashMap::from([
            ("Content-Type".to_string(), "application/pdf".to_string()),
            (
                "Content-Disposition".to_string(),
                format!("inline; filename=\"{}\"", filled.file_name),
            ),
        ]);
        Self {
            status_code: 200,
            headers,
            body: engine.encode(&filled.data),
            is_base64_encoded: true,
        }
    }

    fn error(error: &Error) -> Self {
        let status_code = error.status_code();
        let body = if status_code >= 500 {
            serde_json::json!({
                "message": "Internal server error",
                "error": error.client_message(),
            })
        } else {
            serde_json::json!({ "message": error.client_message() })
        };
        Self {
            status_code,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    #[serde(default)]
    form_data: Option<serde_json::Value>,
}

/// Template name and form data carried by a request
pub fn decode_request(request: &GatewayRequest) -> Result<(TemplateSource, FormData)> {
    let template_name = request
        .query_string_parameters
        .as_ref()
        .and_then(|params| params.get("templateName"))
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::invalid_input("templateName parameter is required"))?;

    let form_required = || Error::invalid_input("formData is required");

    let raw = request.body.as_deref().ok_or_else(form_required)?;
    let body: Vec<u8> = if request.is_base64_encoded {
        base64::engine::general_purpose::STANDARD.decode(raw.trim())?
    } else {
        raw.as_bytes().to_vec()
    };
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(form_required());
    }

    let parsed: RequestBody = serde_json::from_slice(&body)?;
    let form = match parsed.form_data {
        None | Some(serde_json::Value::Null) => return Err(form_required()),
        Some(value) => FormData::from_json(&value)?,
    };
    if form.is_empty() {
        return Err(form_required());
    }

    Ok((TemplateSource::named(template_name), form))
}

/// Handle one gateway event; every outcome becomes a response
pub async fn handle(service: &FillService, request: &GatewayRequest) -> GatewayResponse {
    let result = match decode_request(request) {
        Ok((source, form)) => service.fill(&source, form).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(filled) => {
            tracing::info!(
                file_name = %filled.file_name,
                bytes = filled.data.len(),
                "Returning filled PDF"
            );
            GatewayResponse::pdf(&filled)
        }
        Err(e) => {
            if e.status_code() >= 500 {
                tracing::error!(error = %e, "Error generating PDF");
            } else {
                tracing::warn!(error = %e, "Rejected request");
            }
            GatewayResponse::error(&e)
        }
    }
}
