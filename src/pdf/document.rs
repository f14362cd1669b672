//! Document model adapter over `lopdf`
//!
//! Exposes a PDF as pages, their ordered widget annotations and the form
//! field each annotation belongs to, plus the handful of mutations the
//! filler needs. Everything else in the document is left as loaded.

use crate::error::{Error, Result};
use crate::pdf::field::{clean_field_name, object_text, FieldInfo, FieldKind, OFF_STATE};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Guard against cyclic `/Parent` chains in broken field trees
const MAX_FIELD_DEPTH: usize = 32;

/// A page of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    /// Page number (1-indexed)
    pub number: u32,
    pub id: ObjectId,
}

/// Where a page's `/Annots` array lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnnotsArray {
    /// Directly inside the page dictionary
    InPage(ObjectId),
    /// Separate indirect array object
    Indirect(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Indirect(ObjectId),
    Inline { array: AnnotsArray, index: usize },
}

/// One entry of a page's `/Annots` array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationRef {
    /// Page number (1-indexed)
    pub page: u32,
    slot: Slot,
}

/// Dictionary that holds the field's `/T` and `/V`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldHome {
    /// Merged field and widget dictionary
    Widget,
    /// Ancestor reached through `/Parent`
    Ancestor(ObjectId),
}

/// A form field reached through one of its widget annotations
#[derive(Debug, Clone)]
pub struct FieldHandle {
    annotation: AnnotationRef,
    home: FieldHome,
    pub info: FieldInfo,
}

impl FieldHandle {
    pub fn annotation(&self) -> AnnotationRef {
        self.annotation
    }
}

/// Parsed PDF with access to its interactive form fields
pub struct FormDocument {
    inner: Document,
}

impl FormDocument {
    /// Parse PDF bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::malformed("missing %PDF header"));
        }

        let inner = Document::load_mem(data).map_err(|e| Error::malformed(e.to_string()))?;

        if inner.is_encrypted() {
            return Err(Error::malformed("encrypted documents are not supported"));
        }

        let document = Self { inner };
        let root_id = document
            .catalog_id()
            .ok_or_else(|| Error::malformed("trailer has no /Root reference"))?;
        document
            .inner
            .get_dictionary(root_id)
            .map_err(|e| Error::malformed(format!("unreadable catalog: {}", e)))?;

        Ok(document)
    }

    /// Serialize the document, including any mutations, to bytes
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| Error::Serialization {
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    /// Access the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn page_count(&self) -> u32 {
        self.inner.get_pages().len() as u32
    }

    /// Pages in document order
    pub fn pages(&self) -> Vec<PageRef> {
        self.inner
            .get_pages()
            .into_iter()
            .map(|(number, id)| PageRef { number, id })
            .collect()
    }

    /// Annotations of a page, in `/Annots` order
    pub fn annotations(&self, page: &PageRef) -> Vec<AnnotationRef> {
        let Ok(page_dict) = self.inner.get_dictionary(page.id) else {
            return Vec::new();
        };

        let (array, items) = match page_dict.get(b"Annots") {
            Ok(Object::Array(items)) => (AnnotsArray::InPage(page.id), items),
            Ok(Object::Reference(id)) => match self.inner.get_object(*id) {
                Ok(Object::Array(items)) => (AnnotsArray::Indirect(*id), items),
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let slot = match item {
                    Object::Reference(id) => match self.inner.get_object(*id) {
                        Ok(Object::Dictionary(_)) => Slot::Indirect(*id),
                        _ => return None,
                    },
                    Object::Dictionary(_) => Slot::Inline { array, index },
                    _ => return None,
                };
                Some(AnnotationRef {
                    page: page.number,
                    slot,
                })
            })
            .collect()
    }

    /// The form field an annotation belongs to, if any
    pub fn field(&self, annotation: &AnnotationRef) -> Option<FieldHandle> {
        let widget = self.annotation_dict(annotation)?;
        let (home, field_dict) = self.field_home(widget)?;

        let raw_name = field_dict.get(b"T").ok().and_then(object_text)?;
        let name = clean_field_name(&raw_name).to_string();

        let field_type = match self.inherited(widget, b"FT") {
            Some(Object::Name(field_type)) => Some(field_type.as_slice()),
            _ => None,
        };
        let kind = FieldKind::from_field_type(field_type);

        let value = self.inherited(field_dict, b"V").and_then(object_text);
        let appearance_state = widget
            .get(b"AS")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(object_text);

        let info = FieldInfo {
            page: annotation.page,
            raw_name,
            name,
            kind,
            value,
            appearance_state,
            has_appearance: widget.has(b"AP"),
            on_states: self.on_states(widget),
        };

        Some(FieldHandle {
            annotation: *annotation,
            home,
            info,
        })
    }

    /// Every field widget in the document, in page and annotation order
    pub fn fields(&self) -> Vec<FieldInfo> {
        self.pages()
            .iter()
            .flat_map(|page| self.annotations(page))
            .filter_map(|annotation| self.field(&annotation))
            .map(|handle| handle.info)
            .collect()
    }

    /// Set `/V` on the field dictionary
    pub fn set_field_value(&mut self, field: &FieldHandle, value: Object) -> Result<()> {
        let dict = match field.home {
            FieldHome::Widget => self.annotation_dict_mut(&field.annotation)?,
            FieldHome::Ancestor(id) => self
                .inner
                .get_dictionary_mut(id)
                .map_err(|e| Error::malformed(format!("field {:?} vanished: {}", id, e)))?,
        };
        dict.set("V", value);
        Ok(())
    }

    /// Set `/AS` on the widget annotation
    pub fn set_appearance_state(&mut self, field: &FieldHandle, state: &str) -> Result<()> {
        let widget = self.annotation_dict_mut(&field.annotation)?;
        widget.set("AS", Object::Name(state.as_bytes().to_vec()));
        Ok(())
    }

    /// Remove the widget's cached `/AP`; returns whether one was present
    pub fn clear_appearance(&mut self, field: &FieldHandle) -> Result<bool> {
        let widget = self.annotation_dict_mut(&field.annotation)?;
        Ok(widget.remove(b"AP").is_some())
    }

    /// Set `/NeedAppearances true` on the AcroForm dictionary.
    /// Returns false when the catalog has no AcroForm.
    pub fn set_need_appearances(&mut self) -> Result<bool> {
        let root_id = self
            .catalog_id()
            .ok_or_else(|| Error::malformed("trailer has no /Root reference"))?;

        let acro_form_id = match self
            .inner
            .get_dictionary(root_id)
            .ok()
            .and_then(|catalog| catalog.get(b"AcroForm").ok())
        {
            Some(Object::Reference(id)) => Some(*id),
            Some(Object::Dictionary(_)) => None,
            _ => return Ok(false),
        };

        let acro_form = match acro_form_id {
            Some(id) => self.inner.get_dictionary_mut(id),
            None => self
                .inner
                .get_dictionary_mut(root_id)
                .and_then(|catalog| catalog.get_mut(b"AcroForm"))
                .and_then(Object::as_dict_mut),
        }
        .map_err(|e| Error::malformed(format!("unreadable AcroForm: {}", e)))?;

        acro_form.set("NeedAppearances", true);
        Ok(true)
    }

    fn catalog_id(&self) -> Option<ObjectId> {
        self.inner.trailer.get(b"Root").ok()?.as_reference().ok()
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.inner.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(object)?.as_dict().ok()
    }

    /// Look a key up on a dictionary, then on its `/Parent` chain
    fn inherited<'a>(&'a self, start: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut current = start;
        for _ in 0..MAX_FIELD_DEPTH {
            if let Ok(value) = current.get(key) {
                return self.resolve(value);
            }
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.inner.get_dictionary(parent_id).ok()?;
        }
        None
    }

    fn field_home<'a>(&'a self, widget: &'a Dictionary) -> Option<(FieldHome, &'a Dictionary)> {
        if widget.has(b"T") {
            return Some((FieldHome::Widget, widget));
        }
        let mut current = widget;
        for _ in 0..MAX_FIELD_DEPTH {
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.inner.get_dictionary(parent_id).ok()?;
            if current.has(b"T") {
                return Some((FieldHome::Ancestor(parent_id), current));
            }
        }
        None
    }

    fn on_states(&self, widget: &Dictionary) -> Vec<String> {
        let normal = widget
            .get(b"AP")
            .ok()
            .and_then(|ap| self.resolve_dict(ap))
            .and_then(|ap| ap.get(b"N").ok())
            .and_then(|n| self.resolve_dict(n));

        match normal {
            Some(states) => states
                .iter()
                .map(|(state, _)| String::from_utf8_lossy(state).into_owned())
                .filter(|state| state != OFF_STATE)
                .collect(),
            None => Vec::new(),
        }
    }

    fn annotation_dict(&self, annotation: &AnnotationRef) -> Option<&Dictionary> {
        match annotation.slot {
            Slot::Indirect(id) => self.inner.get_dictionary(id).ok(),
            Slot::Inline { array, index } => {
                let items = match array {
                    AnnotsArray::InPage(page_id) => self
                        .inner
                        .get_dictionary(page_id)
                        .ok()?
                        .get(b"Annots")
                        .ok()?
                        .as_array()
                        .ok()?,
                    AnnotsArray::Indirect(id) => self.inner.get_object(id).ok()?.as_array().ok()?,
                };
                items.get(index)?.as_dict().ok()
            }
        }
    }

    fn annotation_dict_mut(&mut self, annotation: &AnnotationRef) -> Result<&mut Dictionary> {
        let page = annotation.page;
        let vanished = |detail: String| {
            Error::malformed(format!("annotation on page {} vanished: {}", page, detail))
        };

        match annotation.slot {
            Slot::Indirect(id) => self
                .inner
                .get_dictionary_mut(id)
                .map_err(|e| vanished(e.to_string())),
            Slot::Inline { array, index } => {
                let items = match array {
                    AnnotsArray::InPage(page_id) => self
                        .inner
                        .get_dictionary_mut(page_id)
                        .and_then(|page_dict| page_dict.get_mut(b"Annots"))
                        .and_then(Object::as_array_mut),
                    AnnotsArray::Indirect(id) => self
                        .inner
                        .get_object_mut(id)
                        .and_then(Object::as_array_mut),
                }
                .map_err(|e| vanished(e.to_string()))?;

                items
                    .get_mut(index)
                    .ok_or_else(|| vanished(format!("no /Annots entry {}", index)))?
                    .as_dict_mut()
                    .map_err(|e| vanished(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{FixtureField, FormFixture};
    use lopdf::dictionary;

    #[test]
    fn test_parse_rejects_non_pdf() {
        let result = FormDocument::parse(b"not a pdf at all");
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_parse_rejects_truncated_pdf() {
        let data = FormFixture::new().build();
        let result = FormDocument::parse(&data[..12]);
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_fields_expose_name_kind_value_and_appearance() {
        let data = FormFixture::new()
            .field(FixtureField::text("(fname_input)").value("Jane").with_appearance())
            .field(FixtureField::checkbox("q_human_boolean_input"))
            .build();
        let doc = FormDocument::parse(&data).unwrap();

        let fields = doc.fields();
        assert_eq!(fields.len(), 2);

        assert_eq!(fields[0].raw_name, "(fname_input)");
        assert_eq!(fields[0].name, "fname_input");
        assert_eq!(fields[0].kind, FieldKind::Text);
        assert_eq!(fields[0].value.as_deref(), Some("Jane"));
        assert!(fields[0].has_appearance);

        assert_eq!(fields[1].kind, FieldKind::Checkbox);
        assert_eq!(fields[1].appearance_state.as_deref(), Some("Off"));
        assert_eq!(fields[1].on_states, vec!["Yes".to_string()]);
    }

    #[test]
    fn test_annotations_keep_page_order() {
        let data = FormFixture::new()
            .pages(2)
            .field(FixtureField::text("first").on_page(1))
            .field(FixtureField::text("second").on_page(2))
            .field(FixtureField::text("third").on_page(1))
            .build();
        let doc = FormDocument::parse(&data).unwrap();

        let names: Vec<(u32, String)> = doc
            .fields()
            .into_iter()
            .map(|f| (f.page, f.name))
            .collect();
        assert_eq!(
            names,
            vec![
                (1, "first".to_string()),
                (1, "third".to_string()),
                (2, "second".to_string()),
            ]
        );
    }

    #[test]
    fn test_widget_inherits_name_and_type_from_parent() {
        let data = FormFixture::new()
            .field(FixtureField::text("address").value("old").as_kid())
            .build();
        let doc = FormDocument::parse(&data).unwrap();

        let fields = doc.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "address");
        assert_eq!(fields[0].kind, FieldKind::Text);
        assert_eq!(fields[0].value.as_deref(), Some("old"));
    }

    #[test]
    fn test_annotation_without_field_is_skipped() {
        let data = FormFixture::new()
            .plain_annotation(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
            })
            .field(FixtureField::text("only"))
            .build();
        let doc = FormDocument::parse(&data).unwrap();

        let page = doc.pages()[0];
        assert_eq!(doc.annotations(&page).len(), 2);
        assert_eq!(doc.fields().len(), 1);
    }

    #[test]
    fn test_inline_annotation_can_be_mutated() {
        let data = FormFixture::new()
            .field(FixtureField::text("inline").inline().with_appearance())
            .build();
        let mut doc = FormDocument::parse(&data).unwrap();

        let page = doc.pages()[0];
        let annotation = doc.annotations(&page)[0];
        let handle = doc.field(&annotation).unwrap();
        doc.set_field_value(&handle, Object::string_literal("new"))
            .unwrap();
        assert!(doc.clear_appearance(&handle).unwrap());

        let info = doc.field(&annotation).unwrap().info;
        assert_eq!(info.value.as_deref(), Some("new"));
        assert!(!info.has_appearance);
    }

    #[test]
    fn test_set_need_appearances() {
        let data = FormFixture::new().field(FixtureField::text("a")).build();
        let mut doc = FormDocument::parse(&data).unwrap();
        assert!(doc.set_need_appearances().unwrap());

        let output = doc.serialize().unwrap();
        let reloaded = Document::load_mem(&output).unwrap();
        let root = reloaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = reloaded.get_dictionary(root).unwrap();
        let acro_form_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acro_form = reloaded.get_dictionary(acro_form_id).unwrap();
        assert_eq!(
            acro_form.get(b"NeedAppearances").unwrap(),
            &Object::Boolean(true)
        );
    }

    #[test]
    fn test_set_need_appearances_without_acroform() {
        let data = FormFixture::new().without_acroform().build();
        let mut doc = FormDocument::parse(&data).unwrap();
        assert!(!doc.set_need_appearances().unwrap());
    }

    #[test]
    fn test_parse_rejects_encrypted_pdf() {
        let data = FormFixture::new()
            .field(FixtureField::text("a"))
            .encrypted()
            .build();
        match FormDocument::parse(&data) {
            Err(Error::MalformedDocument { reason }) => assert!(reason.contains("encrypted")),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("encrypted document was accepted"),
        }
    }

    #[test]
    fn test_field_name_decoded_from_pdfdoc_encoding() {
        let data = FormFixture::new()
            .field(FixtureField::text("a-b").name_bytes(b"a\x84b"))
            .build();
        let fields = FormDocument::parse(&data).unwrap().fields();
        assert_eq!(fields[0].raw_name, "a\u{2014}b");
        assert_eq!(fields[0].name, "a\u{2014}b");
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let data = FormFixture::new()
            .title("Deterministic")
            .field(FixtureField::text("a"))
            .build();
        let mut first = FormDocument::parse(&data).unwrap();
        let mut second = FormDocument::parse(&data).unwrap();
        assert_eq!(first.serialize().unwrap(), second.serialize().unwrap());
    }
}
