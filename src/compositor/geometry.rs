//! Placement geometry
//!
//! Anchors are given bottom-up from the page's bottom-left corner. The
//! placement rectangle is expressed top-down (`top_y = page_height - anchor_y`)
//! and mapped back to PDF user space only when the draw operator is emitted.

use super::CompositeError;
use crate::types::Role;

/// Width every signature is scaled to, in points
pub const SIGNATURE_WIDTH: f64 = 180.0;

/// Page size used when neither the page nor its ancestors carry a MediaBox
pub const US_LETTER: PageBox = PageBox {
    llx: 0.0,
    lly: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Where a role's signature goes on page one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureAnchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl SignatureAnchor {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Buyer => Self {
                x: 120.0,
                y: 120.0,
                width: SIGNATURE_WIDTH,
            },
            Role::Seller => Self {
                x: 380.0,
                y: 120.0,
                width: SIGNATURE_WIDTH,
            },
        }
    }
}

/// Page bounds taken from a MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// From MediaBox corners, normalised so width and height are positive
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }
}

/// Placement rectangle in top-down page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub right: f64,
    /// Larger y; the image's lower edge
    pub bottom: f64,
    /// Smaller y; the image's upper edge
    pub top: f64,
}

impl Placement {
    /// Compute where an image of `image_width` x `image_height` pixels lands
    /// when scaled uniformly to `target_width` with its bottom-left corner at
    /// the anchor.
    pub fn compute(
        page_height: f64,
        anchor_x: f64,
        anchor_y: f64,
        target_width: f64,
        image_width: f64,
        image_height: f64,
    ) -> Result<Self, CompositeError> {
        if !(target_width > 0.0) {
            return Err(CompositeError::Render(format!(
                "target width must be positive, got {}",
                target_width
            )));
        }
        let height = scaled_height(image_width, image_height, target_width)?;
        let top_y = page_height - anchor_y;

        Ok(Self {
            left: anchor_x,
            right: anchor_x + target_width,
            bottom: top_y,
            top: top_y - height,
        })
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// `cm` operands `[w 0 0 h x y]` placing a unit-square image in PDF user
    /// space for the given page box
    pub fn to_matrix(&self, page: &PageBox) -> [f64; 6] {
        let x = page.llx + self.left;
        let y = page.lly + (page.height - self.bottom);
        [self.width(), 0.0, 0.0, self.height(), x, y]
    }
}

/// Height preserving the aspect ratio at `target_width`
pub fn scaled_height(
    image_width: f64,
    image_height: f64,
    target_width: f64,
) -> Result<f64, CompositeError> {
    if !(image_width > 0.0) {
        return Err(CompositeError::InvalidImage(format!(
            "image width must be positive, got {}",
            image_width
        )));
    }
    Ok(image_height * (target_width / image_width))
}
