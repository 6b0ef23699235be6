//! PDF overlay with lopdf
//!
//! Page one gets three additions: a `q` stream before its existing content, a
//! `Q` + draw stream after it, and an image XObject in its own copy of the
//! resource dictionary. Nothing else in the document is touched.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::geometry::{PageBox, Placement, US_LETTER};
use super::CompositeError;

/// A decoded signature ready to embed
pub(crate) struct SignatureRaster {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Vec<u8>,
}

impl SignatureRaster {
    /// Decode PNG or JPEG bytes into separate colour and alpha planes
    pub fn decode(bytes: &[u8]) -> Result<Self, CompositeError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| CompositeError::InvalidImage(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();

        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        Ok(Self {
            width,
            height,
            rgb,
            alpha,
        })
    }
}

pub(crate) fn load(source: &[u8]) -> Result<(Document, ObjectId), CompositeError> {
    let doc = Document::load_mem(source)
        .map_err(|e| CompositeError::InvalidDocument(e.to_string()))?;
    let first = doc
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| CompositeError::InvalidDocument("document has no pages".into()))?;
    Ok((doc, first))
}

/// MediaBox of the page, inherited through `Parent`
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(found) = media_box(doc, dict) {
            return found;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    US_LETTER
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<PageBox> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let page = PageBox::from_corners(
        number(&arr[0])?,
        number(&arr[1])?,
        number(&arr[2])?,
        number(&arr[3])?,
    );
    (page.width > 0.0 && page.height > 0.0).then_some(page)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

/// Resources in effect for the page, inherited through `Parent`, as an owned
/// dictionary with references resolved one level deep
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, CompositeError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_dictionary(id)
            .map_err(|e| CompositeError::InvalidDocument(format!("page tree: {}", e)))?;
        if let Ok(raw) = dict.get(b"Resources") {
            return match raw {
                Object::Reference(res_id) => doc
                    .get_dictionary(*res_id)
                    .cloned()
                    .map_err(|e| CompositeError::InvalidDocument(format!("resources: {}", e))),
                Object::Dictionary(d) => Ok(d.clone()),
                _ => Err(CompositeError::InvalidDocument("resources is not a dictionary".into())),
            };
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(Dictionary::new())
}

/// First `SigN` name not already used by an XObject on the page
fn unused_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|n| format!("Sig{}", n))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| "Sig".to_string())
}

fn encode(operations: Vec<Operation>) -> Result<Vec<u8>, CompositeError> {
    Content { operations }
        .encode()
        .map_err(|e| CompositeError::Render(e.to_string()))
}

/// Draw `raster` onto `page_id` at `placement`, returning the new document bytes
pub(crate) fn draw(
    mut doc: Document,
    page_id: ObjectId,
    page: &PageBox,
    placement: &Placement,
    raster: SignatureRaster,
) -> Result<Vec<u8>, CompositeError> {
    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width as i64,
            "Height" => raster.height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        raster.alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width as i64,
            "Height" => raster.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        raster.rgb,
    ));

    let mut resources = effective_resources(&doc, page_id)?;
    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .cloned()
            .map_err(|e| CompositeError::InvalidDocument(format!("xobjects: {}", e)))?,
        _ => Dictionary::new(),
    };
    let name = unused_name(&xobjects);
    xobjects.set(name.clone(), image_id);
    resources.set("XObject", xobjects);

    let [a, b, c, d, e, f] = placement.to_matrix(page);
    let prefix = encode(vec![Operation::new("q", vec![])])?;
    let overlay = encode(vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            [a, b, c, d, e, f]
                .into_iter()
                .map(|v| Object::Real(v as _))
                .collect(),
        ),
        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        Operation::new("Q", vec![]),
    ])?;

    let existing = doc.get_page_contents(page_id);
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), prefix));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(overlay_id));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CompositeError::InvalidDocument(format!("page: {}", e)))?;
    page_dict.set("Resources", resources);
    page_dict.set("Contents", contents);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| CompositeError::Render(e.to_string()))?;
    Ok(out)
}
