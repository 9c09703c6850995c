//! Builders for small PDF files used by the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A one-page document under construction.
pub struct PdfBuilder {
    pub doc: Document,
    media_box: [i64; 4],
    contents: Vec<ObjectId>,
    page_resources: Option<Dictionary>,
    inherited_resources: Option<Dictionary>,
}

impl PdfBuilder {
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            doc: Document::with_version("1.7"),
            media_box: [0, 0, width, height],
            contents: Vec::new(),
            page_resources: None,
            inherited_resources: None,
        }
    }

    pub fn add(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Add an unfiltered stream.
    pub fn stream(&mut self, dict: Dictionary, data: &[u8]) -> ObjectId {
        self.doc.add_object(Stream::new(dict, data.to_vec()))
    }

    /// Add a `/FlateDecode` stream holding `data`.
    pub fn flate_stream(&mut self, mut dict: Dictionary, data: &[u8]) -> ObjectId {
        dict.set("Filter", "FlateDecode");
        self.doc.add_object(Stream::new(dict, zlib(data)))
    }

    /// Append a content stream to the page's `/Contents`.
    pub fn content(&mut self, data: &[u8]) -> &mut Self {
        let id = self.stream(dictionary! {}, data);
        self.contents.push(id);
        self
    }

    /// `/Resources` on the page itself.
    pub fn resources(&mut self, resources: Dictionary) -> &mut Self {
        self.page_resources = Some(resources);
        self
    }

    /// `/Resources` on the `/Pages` node, inherited by the page.
    pub fn inherited_resources(&mut self, resources: Dictionary) -> &mut Self {
        self.inherited_resources = Some(resources);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        let pages_id = self.doc.new_object_id();

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        match self.contents.as_slice() {
            [] => {}
            [single] => page.set("Contents", *single),
            many => page.set(
                "Contents",
                many.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            ),
        }
        if let Some(resources) = self.page_resources.take() {
            page.set("Resources", resources);
        }
        let page_id = self.doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => self.media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        };
        if let Some(resources) = self.inherited_resources.take() {
            pages.set("Resources", resources);
        }
        self.doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf).unwrap();
        buf
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A ToUnicode CMap with a two-byte codespace and the given `bfrange` lines.
pub fn to_unicode_cmap(ranges: &[&str]) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    cmap.push_str(&format!("{} beginbfrange\n", ranges.len()));
    for range in ranges {
        cmap.push_str(range);
        cmap.push('\n');
    }
    cmap.push_str("endbfrange\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap.into_bytes()
}
