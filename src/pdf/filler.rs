//! Form filling: match form data to field widgets and rewrite them

use crate::error::{Error, Result};
use crate::pdf::document::{FieldHandle, FormDocument};
use crate::pdf::field::{FieldKind, DEFAULT_ON_STATE, OFF_STATE};
use lopdf::Object;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A value supplied for one form field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Boolean(bool),
    /// Decimal text of a JSON number
    Number(String),
    Null,
}

impl FieldValue {
    /// Text written into `/V` of text and other fields
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Boolean(flag) => flag.to_string(),
            FieldValue::Number(number) => number.clone(),
            FieldValue::Null => String::new(),
        }
    }

    /// Checkbox reading: only the strings yes/true/on (any case) select.
    /// Non-string values deselect.
    pub fn is_checked(&self) -> bool {
        match self {
            FieldValue::Text(text) => {
                matches!(text.to_ascii_lowercase().as_str(), "yes" | "true" | "on")
            }
            FieldValue::Boolean(_) | FieldValue::Number(_) | FieldValue::Null => false,
        }
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => FieldValue::Text(text.clone()),
            serde_json::Value::Bool(flag) => FieldValue::Boolean(*flag),
            serde_json::Value::Number(number) => FieldValue::Number(number.to_string()),
            serde_json::Value::Null => FieldValue::Null,
            // Arrays and objects are written as their JSON text
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Field name to value mapping supplied by a caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    values: BTreeMap<String, FieldValue>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; a later insert for the same name replaces the earlier one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FormData {
    /// Build form data from a JSON object of field names to values
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(Error::invalid_input("formData must be a JSON object"));
        };
        Ok(map
            .iter()
            .map(|(name, value)| (name.as_str(), FieldValue::from(value)))
            .collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (name, value) in iter {
            form.insert(name, value);
        }
        form
    }
}

/// How the "checked" token of a checkbox is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckboxOnState {
    /// Always `/Yes`
    #[default]
    Yes,
    /// First non-`Off` state of the widget's `/AP /N`, falling back to `/Yes`
    FromAppearance,
}

/// Fill behavior knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOptions {
    pub checkbox_on_state: CheckboxOnState,
    /// Set `/NeedAppearances true` on the AcroForm after any field changed
    pub need_appearances: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            checkbox_on_state: CheckboxOnState::Yes,
            need_appearances: true,
        }
    }
}

/// What happened to one field widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldAction {
    /// No form data for this field; left untouched
    Untouched,
    /// `/V` set to the given text
    ValueSet { value: String },
    /// `/V` and `/AS` set to the given state
    CheckboxSet { checked: bool, state: String },
}

/// Per-widget fill record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    /// Page number (1-indexed)
    pub page: u32,
    pub name: String,
    pub kind: FieldKind,
    #[serde(flatten)]
    pub action: FieldAction,
    /// Whether a cached `/AP` appearance was removed
    pub appearance_cleared: bool,
}

impl FieldOutcome {
    pub fn is_mutated(&self) -> bool {
        !matches!(self.action, FieldAction::Untouched)
    }
}

/// Record of a fill pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationReport {
    /// One entry per field widget, in page and annotation order
    pub fields: Vec<FieldOutcome>,
    /// Form data names that matched no field
    pub unmatched_keys: Vec<String>,
}

impl MutationReport {
    /// Number of widgets that were rewritten
    pub fn mutated_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_mutated()).count()
    }

    /// Outcomes recorded for a field name
    pub fn outcomes_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldOutcome> {
        self.fields.iter().filter(move |f| f.name == name)
    }
}

/// Filled PDF bytes together with the fill record
#[derive(Debug, Clone)]
pub struct FilledForm {
    pub data: Vec<u8>,
    pub report: MutationReport,
    pub page_count: u32,
}

/// Fill a template with default options and return the new PDF bytes
pub fn fill(template: &[u8], form: &FormData) -> Result<Vec<u8>> {
    fill_with_options(template, form, &FillOptions::default()).map(|filled| filled.data)
}

/// Parse, fill and serialize a template
pub fn fill_with_options(
    template: &[u8],
    form: &FormData,
    options: &FillOptions,
) -> Result<FilledForm> {
    if form.is_empty() {
        return Err(Error::invalid_input("formData is required"));
    }

    let mut document = FormDocument::parse(template)?;
    let report = apply(&mut document, form, options)?;
    let data = document.serialize()?;

    Ok(FilledForm {
        data,
        report,
        page_count: document.page_count(),
    })
}

/// Apply form data to every matching field widget of a parsed document
pub fn apply(
    document: &mut FormDocument,
    form: &FormData,
    options: &FillOptions,
) -> Result<MutationReport> {
    let mut report = MutationReport::default();
    let mut matched: BTreeSet<&str> = BTreeSet::new();

    for page in document.pages() {
        for annotation in document.annotations(&page) {
            let Some(field) = document.field(&annotation) else {
                continue;
            };

            tracing::debug!(
                page = page.number,
                name = %field.info.raw_name,
                kind = field.info.kind.as_str(),
                value = ?field.info.value,
                "Found form field"
            );

            let outcome = match form.values.get_key_value(field.info.name.as_str()) {
                Some((name, value)) => {
                    matched.insert(name.as_str());
                    mutate_field(document, &field, value, options)?
                }
                None => FieldOutcome {
                    page: page.number,
                    name: field.info.name.clone(),
                    kind: field.info.kind,
                    action: FieldAction::Untouched,
                    appearance_cleared: false,
                },
            };
            report.fields.push(outcome);
        }
    }

    report.unmatched_keys = form
        .names()
        .filter(|name| !matched.contains(name))
        .map(str::to_string)
        .collect();

    for name in &report.unmatched_keys {
        tracing::debug!(name = %name, "Form data key matched no field");
    }

    if options.need_appearances && report.mutated_count() > 0 {
        document.set_need_appearances()?;
    }

    tracing::info!(
        fields = report.fields.len(),
        mutated = report.mutated_count(),
        unmatched = report.unmatched_keys.len(),
        "Applied form data"
    );

    Ok(report)
}

fn mutate_field(
    document: &mut FormDocument,
    field: &FieldHandle,
    value: &FieldValue,
    options: &FillOptions,
) -> Result<FieldOutcome> {
    let info = &field.info;

    let action = match info.kind {
        FieldKind::Checkbox => {
            let checked = value.is_checked();
            let state = if checked {
                on_state(field, options.checkbox_on_state)
            } else {
                OFF_STATE.to_string()
            };
            document.set_field_value(field, Object::Name(state.as_bytes().to_vec()))?;
            document.set_appearance_state(field, &state)?;
            tracing::debug!(name = %info.name, checked, state = %state, "Set checkbox");
            FieldAction::CheckboxSet { checked, state }
        }
        FieldKind::Text | FieldKind::Other => {
            if info.kind == FieldKind::Other {
                tracing::warn!(
                    name = %info.name,
                    page = info.page,
                    "Unrecognized field type, writing value as text"
                );
            }
            let text = value.as_text();
            document.set_field_value(field, lopdf::text_string(&text))?;
            tracing::debug!(name = %info.name, value = %text, "Set field value");
            FieldAction::ValueSet { value: text }
        }
    };

    let appearance_cleared = document.clear_appearance(field)?;

    Ok(FieldOutcome {
        page: info.page,
        name: info.name.clone(),
        kind: info.kind,
        action,
        appearance_cleared,
    })
}

fn on_state(field: &FieldHandle, policy: CheckboxOnState) -> String {
    match policy {
        CheckboxOnState::Yes => DEFAULT_ON_STATE.to_string(),
        CheckboxOnState::FromAppearance => field
            .info
            .on_states
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ON_STATE.to_string()),
    }
}
