//! Bounding boxes and quad-points for anchored comments

use crate::comment::{AnnotationKind, Rect};

/// Axis-aligned box in PDF user space, `[llx lly urx ury]` order when rendered
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    fn point(x: f64, y: f64) -> Self {
        Self {
            left: x,
            bottom: y,
            right: x,
            top: y,
        }
    }

    fn union(self, other: BoundingBox) -> Self {
        Self {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    /// `left bottom right top`
    pub fn to_ps(&self) -> String {
        format!("{} {} {} {}", self.left, self.bottom, self.right, self.top)
    }
}

impl From<&Rect> for BoundingBox {
    /// Normalize a rectangle whose corners may be given in any order
    fn from(rect: &Rect) -> Self {
        Self {
            left: rect.tl[0].min(rect.br[0]),
            bottom: rect.tl[1].min(rect.br[1]),
            right: rect.tl[0].max(rect.br[0]),
            top: rect.tl[1].max(rect.br[1]),
        }
    }
}

/// Where an annotation sits on its page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub bbox: BoundingBox,
    pub quad_points: Vec<f64>,
}

impl Placement {
    /// Space-joined quad-point numbers, empty when there are none
    pub fn quad_points_ps(&self) -> String {
        self.quad_points
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Compute the placement of a comment of the given kind.
///
/// An empty rectangle list yields a zero box.
pub fn place(rects: &[Rect], kind: AnnotationKind) -> Placement {
    if kind.is_markup() {
        let mut quad_points = Vec::with_capacity(rects.len() * 8);
        let mut bbox: Option<BoundingBox> = None;

        for rect in rects {
            let b = BoundingBox::from(rect);
            // Acrobat does not follow ISO 32000 here: it expects
            // [tl tr bl br] rather than [bl br tr tl]. Keep Acrobat's order.
            quad_points.extend_from_slice(&[
                b.left, b.top, // tl
                b.right, b.top, // tr
                b.left, b.bottom, // bl
                b.right, b.bottom, // br
            ]);
            bbox = Some(bbox.map_or(b, |acc| acc.union(b)));
        }

        Placement {
            bbox: bbox.unwrap_or_default(),
            quad_points,
        }
    } else {
        // Text notes collapse to a point. Each rectangle overwrites the last,
        // so only the final `tl` counts; kept for compatibility with existing
        // exports.
        let bbox = rects
            .last()
            .map(|rect| BoundingBox::point(rect.tl[0], rect.tl[1]))
            .unwrap_or_default();
        Placement {
            bbox,
            quad_points: Vec::new(),
        }
    }
}
