// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF fixtures for unit tests.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Incrementally builds a small PDF: Helvetica as /F1, optional image
/// XObjects, pages with literal content streams.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<ObjectId>,
    images: Vec<(String, ObjectId)>,
    inherit_resources: bool,
    info: Option<Dictionary>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            images: Vec::new(),
            inherit_resources: false,
            info: None,
        }
    }

    /// Put the resource dictionary on the /Pages node instead of each page.
    pub fn inherit_resources(&mut self) -> &mut Self {
        self.inherit_resources = true;
        self
    }

    pub fn font_id(&self) -> ObjectId {
        self.font_id
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Attach an /Info dictionary to the trailer.
    pub fn info(&mut self, entries: Vec<(&str, Object)>) -> &mut Self {
        self.info = Some(Dictionary::from_iter(entries));
        self
    }

    /// Register an 8-bit DeviceRGB image under `name` for later pages.
    pub fn add_rgb_image(&mut self, name: &str, width: u32, height: u32, pixels: Vec<u8>) -> ObjectId {
        let id = self.doc.add_object(image_stream(width, height, b"DeviceRGB", 8, pixels));
        self.images.push((name.to_string(), id));
        id
    }

    /// Register an arbitrary, pre-built image stream under `name`.
    pub fn add_image_object(&mut self, name: &str, stream: Stream) -> ObjectId {
        let id = self.doc.add_object(stream);
        self.images.push((name.to_string(), id));
        id
    }

    /// Default resources: /F1 plus every registered image.
    pub fn default_resources(&self) -> Dictionary {
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(self.font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        if !self.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (name, id) in &self.images {
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        resources
    }

    pub fn add_page(&mut self, content: &str) -> ObjectId {
        self.add_page_with_streams(&[content])
    }

    pub fn add_page_with_streams(&mut self, contents: &[&str]) -> ObjectId {
        let resources = if self.inherit_resources {
            None
        } else {
            Some(self.default_resources())
        };
        self.add_page_with_resources(contents, resources)
    }

    pub fn add_page_with_resources(
        &mut self,
        contents: &[&str],
        resources: Option<Dictionary>,
    ) -> ObjectId {
        let stream_ids: Vec<Object> = contents
            .iter()
            .map(|content| {
                let id = self
                    .doc
                    .add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));
                Object::Reference(id)
            })
            .collect();
        let contents_obj = if stream_ids.len() == 1 {
            stream_ids[0].clone()
        } else {
            Object::Array(stream_ids)
        };

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("Contents", contents_obj);
        if let Some(resources) = resources {
            page.set("Resources", Object::Dictionary(resources));
        }
        let id = self.doc.add_object(page);
        self.kids.push(id);
        id
    }

    /// Add a text page with a recognisable marker string.
    pub fn add_text_page(&mut self, marker: &str) -> ObjectId {
        self.add_page(&format!("BT /F1 12 Tf 72 720 Td ({marker}) Tj ET"))
    }

    pub fn build(mut self) -> Document {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set(
            "Kids",
            Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages.set(
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        );
        if self.inherit_resources {
            pages.set("Resources", Object::Dictionary(self.default_resources()));
        }
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(info) = self.info.take() {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", Object::Reference(info_id));
        }
        self.doc
    }

    pub fn build_bytes(self) -> Vec<u8> {
        let mut doc = self.build();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("serialise test PDF");
        buffer
    }
}

/// A bare image XObject stream with raw (unfiltered) samples.
pub fn image_stream(
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
    samples: Vec<u8>,
) -> Stream {
    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(bits_per_component)),
    ]);
    Stream::new(dict, samples)
}

/// A document with `count` text pages marked `<prefix>-Page-<n>`.
pub fn text_document(count: u32, prefix: &str) -> Document {
    let mut builder = PdfBuilder::new();
    for page in 1..=count {
        builder.add_text_page(&format!("{prefix}-Page-{page}"));
    }
    builder.build()
}

/// Same as [`text_document`], serialised.
pub fn text_document_bytes(count: u32, prefix: &str) -> Vec<u8> {
    let mut doc = text_document(count, prefix);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("serialise test PDF");
    buffer
}

/// A literal string object.
pub fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}
