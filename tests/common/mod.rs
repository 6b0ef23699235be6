//! Fixtures shared by the integration tests

#![allow(dead_code)]

use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::sync::Arc;

use countersign::auth::{TokenAuthenticator, TokenHasher};
use countersign::db::QuoteDoc;
use countersign::signing::SigningController;
use countersign::store::{DocumentStore, InMemoryDocumentStore};
use countersign::types::BlobKind;

pub const SECRET: &str = "integration-secret";

/// US Letter PDF with `pages` pages of text
pub fn letter_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 18 Tf 72 700 Td (Quote page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Solid-colour PNG
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Bytes {
    let img = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

/// Operand lists of every `cm` on page `page`
pub fn cm_operands(pdf: &[u8], page: u32) -> Vec<Vec<f64>> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().get(&page).unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "cm")
        .map(|op| {
            op.operands
                .iter()
                .map(|o| match o {
                    Object::Integer(i) => *i as f64,
                    Object::Real(f) => (*f).into(),
                    other => panic!("unexpected cm operand {:?}", other),
                })
                .collect()
        })
        .collect()
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

pub struct Fixture {
    pub store: Arc<InMemoryDocumentStore>,
    pub controller: SigningController,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let hasher = TokenHasher::new(SECRET).unwrap();
        let controller =
            SigningController::new(TokenAuthenticator::new(hasher, dyn_store.clone()), dyn_store);
        Self { store, controller }
    }

    /// Seed a quote for the two tokens, optionally with its original PDF
    pub async fn seed(&self, quote_id: &str, buyer: &str, seller: &str, original: Option<Vec<u8>>) {
        let hasher = TokenHasher::new(SECRET).unwrap();
        self.store
            .insert_quote(QuoteDoc::new(
                quote_id,
                hasher.identifier(buyer),
                hasher.identifier(seller),
            ))
            .await
            .unwrap();
        if let Some(pdf) = original {
            self.store
                .put_blob(Bytes::from(pdf), BlobKind::Original, quote_id, None)
                .await
                .unwrap();
        }
    }
}

/// multipart/form-data body with one file field
pub fn multipart(boundary: &str, field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"sig.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary,
            f = field
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
