//! PDF form layer
//!
//! `document` adapts a `lopdf` document to pages, annotations and fields;
//! `filler` applies form data to it.

mod document;
mod field;
mod filler;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod fixtures;

pub use document::{AnnotationRef, FieldHandle, FormDocument, PageRef};
pub use field::{clean_field_name, FieldInfo, FieldKind, DEFAULT_ON_STATE, OFF_STATE};
pub use filler::{
    apply, fill, fill_with_options, CheckboxOnState, FieldAction, FieldOutcome, FieldValue,
    FillOptions, FilledForm, FormData, MutationReport,
};
