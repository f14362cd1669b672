//! In-memory AcroForm builder shared by unit tests, integration tests and
//! benchmarks

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Text,
    Checkbox,
    Choice,
    Untyped,
}

/// One form field with a single widget annotation
#[derive(Debug, Clone)]
pub struct FixtureField {
    name: String,
    raw_name: Option<Vec<u8>>,
    kind: FixtureKind,
    value: Option<Object>,
    page: u32,
    appearance: bool,
    kid: bool,
    inline: bool,
    checked: bool,
    on_state: String,
}

impl FixtureField {
    fn new(name: &str, kind: FixtureKind) -> Self {
        Self {
            name: name.to_string(),
            raw_name: None,
            kind,
            value: None,
            page: 1,
            appearance: false,
            kid: false,
            inline: false,
            checked: false,
            on_state: "Yes".to_string(),
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FixtureKind::Text)
    }

    /// Unchecked checkbox with `/Yes` and `/Off` appearances
    pub fn checkbox(name: &str) -> Self {
        Self {
            appearance: true,
            ..Self::new(name, FixtureKind::Checkbox)
        }
    }

    pub fn choice(name: &str) -> Self {
        Self::new(name, FixtureKind::Choice)
    }

    /// Field with no `/FT` anywhere in its chain
    pub fn untyped(name: &str) -> Self {
        Self::new(name, FixtureKind::Untyped)
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(Object::string_literal(value));
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn on_state(mut self, state: &str) -> Self {
        self.on_state = state.to_string();
        self
    }

    pub fn with_appearance(mut self) -> Self {
        self.appearance = true;
        self
    }

    /// Store `/T` as these exact string bytes
    pub fn name_bytes(mut self, bytes: &[u8]) -> Self {
        self.raw_name = Some(bytes.to_vec());
        self
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Split into a parent field carrying `/T` and a kid widget
    pub fn as_kid(mut self) -> Self {
        self.kid = true;
        self
    }

    /// Store the widget directly inside the page's `/Annots` array
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

/// Builder for a small PDF with an AcroForm
#[derive(Debug, Clone)]
pub struct FormFixture {
    pages: u32,
    fields: Vec<FixtureField>,
    plain_annotations: Vec<Dictionary>,
    acroform: bool,
    title: Option<String>,
    encrypted: bool,
}

impl Default for FormFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFixture {
    pub fn new() -> Self {
        Self {
            pages: 1,
            fields: Vec::new(),
            plain_annotations: Vec::new(),
            acroform: true,
            title: None,
            encrypted: false,
        }
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    pub fn field(mut self, field: FixtureField) -> Self {
        self.fields.push(field);
        self
    }

    /// Non-field annotation on page 1
    pub fn plain_annotation(mut self, annotation: Dictionary) -> Self {
        self.plain_annotations.push(annotation);
        self
    }

    pub fn without_acroform(mut self) -> Self {
        self.acroform = false;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Reference a standard security handler from the trailer
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let page_ids: Vec<ObjectId> = (0..self.pages).map(|_| doc.new_object_id()).collect();
        let mut annots: Vec<Vec<Object>> = vec![Vec::new(); self.pages as usize];
        let mut field_refs: Vec<Object> = Vec::new();

        for annotation in &self.plain_annotations {
            let id = doc.add_object(annotation.clone());
            annots[0].push(Object::Reference(id));
        }

        for (index, field) in self.fields.iter().enumerate() {
            let page_index = (field.page - 1) as usize;
            let page_id = page_ids[page_index];
            let mut widget = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Rect" => rect(index),
                "P" => page_id,
            };

            let mut field_entries = Dictionary::new();
            let name = match &field.raw_name {
                Some(bytes) => Object::String(bytes.clone(), StringFormat::Literal),
                None => Object::string_literal(field.name.as_str()),
            };
            field_entries.set("T", name);
            if let Some(field_type) = field_type(field.kind) {
                field_entries.set("FT", Object::Name(field_type.as_bytes().to_vec()));
            }

            if field.kind == FixtureKind::Checkbox {
                let state = if field.checked {
                    field.on_state.as_str()
                } else {
                    "Off"
                };
                field_entries.set("V", Object::Name(state.as_bytes().to_vec()));
                widget.set("AS", Object::Name(state.as_bytes().to_vec()));
            } else if let Some(value) = &field.value {
                field_entries.set("V", value.clone());
            }

            if field.appearance {
                let appearance = appearance_dict(&mut doc, field);
                widget.set("AP", appearance);
            }

            if field.kid {
                let widget_id = doc.new_object_id();
                field_entries.set("Kids", vec![Object::Reference(widget_id)]);
                let parent_id = doc.add_object(field_entries);
                widget.set("Parent", parent_id);
                doc.objects.insert(widget_id, Object::Dictionary(widget));
                annots[page_index].push(Object::Reference(widget_id));
                field_refs.push(Object::Reference(parent_id));
            } else {
                for (key, value) in field_entries.iter() {
                    widget.set(key.clone(), value.clone());
                }
                if field.inline {
                    annots[page_index].push(Object::Dictionary(widget));
                } else {
                    let widget_id = doc.add_object(widget);
                    annots[page_index].push(Object::Reference(widget_id));
                    field_refs.push(Object::Reference(widget_id));
                }
            }
        }

        for (index, page_id) in page_ids.iter().enumerate() {
            let content = format!("BT /F1 12 Tf 72 760 Td (Page {}) Tj ET", index + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            };
            if !annots[index].is_empty() {
                page.set("Annots", annots[index].clone());
            }
            doc.objects.insert(*page_id, Object::Dictionary(page));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => self.pages as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if self.acroform {
            let acro_form_id = doc.add_object(dictionary! {
                "Fields" => field_refs,
                "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
                "DR" => dictionary! {
                    "Font" => dictionary! { "Helv" => font_id },
                },
            });
            catalog.set("AcroForm", acro_form_id);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
            });
            doc.trailer.set("Info", info_id);
        }

        if self.encrypted {
            let encrypt_id = doc.add_object(dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "O" => Object::String(vec![0x11; 32], StringFormat::Hexadecimal),
                "U" => Object::String(vec![0x22; 32], StringFormat::Hexadecimal),
                "P" => -4,
            });
            doc.trailer.set("Encrypt", encrypt_id);
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

fn field_type(kind: FixtureKind) -> Option<&'static str> {
    match kind {
        FixtureKind::Text => Some("Tx"),
        FixtureKind::Checkbox => Some("Btn"),
        FixtureKind::Choice => Some("Ch"),
        FixtureKind::Untyped => None,
    }
}

fn rect(index: usize) -> Object {
    let top = 700 - (index as i64 % 30) * 22;
    Object::Array(vec![
        Object::Integer(72),
        Object::Integer(top - 18),
        Object::Integer(300),
        Object::Integer(top),
    ])
}

fn appearance_dict(doc: &mut Document, field: &FixtureField) -> Object {
    let stream = |content: &str| Stream::new(dictionary! {}, content.as_bytes().to_vec());
    match field.kind {
        FixtureKind::Checkbox => {
            let on_id = doc.add_object(stream("q 0 g 2 2 10 10 re f Q"));
            let off_id = doc.add_object(stream("q Q"));
            let mut normal = Dictionary::new();
            normal.set(field.on_state.as_str(), on_id);
            normal.set("Off", off_id);
            Object::Dictionary(dictionary! { "N" => normal })
        }
        _ => {
            let normal_id = doc.add_object(stream("/Tx BMC EMC"));
            Object::Dictionary(dictionary! { "N" => normal_id })
        }
    }
}
