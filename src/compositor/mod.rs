//! Signature compositor
//!
//! Renders a signature image onto the first page of a PDF at a bottom-up
//! anchor, scaled uniformly to a target width. Later pages pass through
//! untouched and the input bytes are never modified.

mod geometry;
mod overlay;

pub use geometry::{scaled_height, PageBox, Placement, SignatureAnchor, SIGNATURE_WIDTH, US_LETTER};

/// Compositor failures
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    /// Source is not a PDF with at least one page
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Signature is not a decodable PNG/JPEG or has no width
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("render failed: {0}")]
    Render(String),
}

/// Overlay `signature_image` on page one of `source_pdf`.
///
/// `anchor_x`/`anchor_y` locate the bottom-left corner of the rendered image,
/// measured from the bottom-left of the page. The image keeps its aspect
/// ratio at `target_width` points wide.
pub fn compose(
    source_pdf: &[u8],
    signature_image: &[u8],
    anchor_x: f64,
    anchor_y: f64,
    target_width: f64,
) -> Result<Vec<u8>, CompositeError> {
    let (doc, page_id) = overlay::load(source_pdf)?;
    let raster = overlay::SignatureRaster::decode(signature_image)?;

    let page = overlay::page_box(&doc, page_id);
    let placement = Placement::compute(
        page.height,
        anchor_x,
        anchor_y,
        target_width,
        raster.width as f64,
        raster.height as f64,
    )?;

    overlay::draw(doc, page_id, &page, &placement, raster)
}

/// [`compose`] at a predefined anchor
pub fn compose_at(
    source_pdf: &[u8],
    signature_image: &[u8],
    anchor: SignatureAnchor,
) -> Result<Vec<u8>, CompositeError> {
    compose(source_pdf, signature_image, anchor.x, anchor.y, anchor.width)
}
