//! Form field model shared by the document adapter and the filler

use lopdf::Object;
use serde::Serialize;

/// Appearance state / value token for an unchecked checkbox
pub const OFF_STATE: &str = "Off";

/// Default appearance state / value token for a checked checkbox
pub const DEFAULT_ON_STATE: &str = "Yes";

/// Kind of a form field, resolved once from its (possibly inherited) `/FT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `/FT /Tx`
    Text,
    /// `/FT /Btn`
    Checkbox,
    /// Choice, signature, missing or unknown field types
    Other,
}

impl FieldKind {
    /// Map a `/FT` name to a field kind
    pub fn from_field_type(field_type: Option<&[u8]>) -> Self {
        match field_type {
            Some(b"Tx") => FieldKind::Text,
            Some(b"Btn") => FieldKind::Checkbox,
            _ => FieldKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Other => "other",
        }
    }
}

/// Snapshot of a form field as seen through one widget annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    /// Page number (1-indexed)
    pub page: u32,
    /// Name exactly as stored in `/T`
    pub raw_name: String,
    /// Name used for matching form data
    pub name: String,
    pub kind: FieldKind,
    /// Current `/V`, decoded to text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Current `/AS` of the widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance_state: Option<String>,
    /// Whether the widget carries a cached `/AP` appearance
    pub has_appearance: bool,
    /// Non-`Off` states advertised by the widget's `/AP /N` dictionary
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_states: Vec<String>,
}

/// Strip one leading `(` and one trailing `)` when both are present.
///
/// Some producers store `/T` with the literal-string delimiters included.
/// This is not general trimming: `((a))` becomes `(a)`.
pub fn clean_field_name(raw: &str) -> &str {
    raw.strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw)
}

/// Read a name-or-string object as text.
///
/// Strings are PDF text strings: UTF-16BE or UTF-8 behind a byte order mark,
/// PDFDocEncoding otherwise.
pub(crate) fn object_text(object: &Object) -> Option<String> {
    match object {
        Object::String(..) => {
            let text = lopdf::decode_text_string(object).ok()?;
            Some(match text.strip_prefix('\u{FEFF}') {
                Some(rest) => rest.to_string(),
                None => text,
            })
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
