//! Rectangle and point primitives plus the scaling and alignment algebra
//! used to place a device's input region inside a display output.
//!
//! Everything here is exact integer/float arithmetic on plain values; the
//! rectangles describing outputs, device axis ranges, and intermediate
//! placements all share the same representation.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle stored as its four edges.
///
/// Edges are kept directly (`top`/`left`/`bottom`/`right`) rather than as
/// origin + size because alignment and calibration manipulate individual
/// edges. A well-formed rectangle has `right >= left` and `bottom >= top`;
/// this is not enforced on construction — widths and heights end up as
/// divisors in transform normalization, so rejecting degenerate rectangles
/// is the producing caller's input validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Rect {
    /// Creates a rectangle from its four edges.
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self { top, left, bottom, right }
    }

    /// Horizontal extent (`right - left`).
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Vertical extent (`bottom - top`).
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Multiplies every edge by the per-axis factor, truncating toward zero.
    pub fn scale(&self, sx: f32, sy: f32) -> Rect {
        Rect {
            top: (self.top as f32 * sy) as i32,
            left: (self.left as f32 * sx) as i32,
            bottom: (self.bottom as f32 * sy) as i32,
            right: (self.right as f32 * sx) as i32,
        }
    }

    /// Returns `true` when `point` lies inside the rectangle or on any of
    /// its edges. All four boundaries are inclusive, so a point on the seam
    /// between two adjacent rectangles is contained in both.
    pub fn contains(&self, point: Point) -> bool {
        self.left as f64 <= point.x
            && point.x <= self.right as f64
            && self.top as f64 <= point.y
            && point.y <= self.bottom as f64
    }
}

/// A position in continuous coordinates.
///
/// Axis readings arrive as fixed-point 32.32 values on the wire, so `f64`
/// keeps the fractional part instead of rounding it away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// How the scaled input region's shape relates to the target output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectMode {
    /// Leave the input region unscaled (ratio 1.0).
    None,
    /// Scale uniformly so the input region covers the output in both
    /// dimensions; the overhang on one axis is handled by alignment.
    Fit,
    /// Scale uniformly so the widths match exactly.
    MatchWidth,
    /// Scale uniformly so the heights match exactly.
    MatchHeight,
}

/// Horizontal half of an alignment: which vertical edge (or the center) of
/// the reference the alignee sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HorizontalAffinity {
    Left,
    Right,
    Centered,
}

/// Vertical half of an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAffinity {
    Top,
    Bottom,
    Centered,
}

/// Full alignment: one affinity per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affinity {
    pub horizontal: HorizontalAffinity,
    pub vertical: VerticalAffinity,
}

/// Picks the uniform scale factor that realizes `mode` when mapping
/// `original` onto `target`.
///
/// `Fit` takes the larger of the two per-axis ratios, so the scaled
/// original covers the target in both dimensions. `MatchWidth` and
/// `MatchHeight` use the ratio of the named dimension alone. `None` leaves
/// the original untouched; callers that assemble their input rectangle
/// directly (physical-unit calibration) rely on that identity.
pub fn select_aspect_ratio(target: &Rect, original: &Rect, mode: AspectMode) -> f32 {
    let width_ratio = target.width() as f32 / original.width() as f32;
    let height_ratio = target.height() as f32 / original.height() as f32;
    match mode {
        AspectMode::Fit => width_ratio.max(height_ratio),
        AspectMode::MatchWidth => width_ratio,
        AspectMode::MatchHeight => height_ratio,
        AspectMode::None => 1.0,
    }
}

/// Scales `original` by the ratio [`select_aspect_ratio`] picks for `mode`.
///
/// The result is anchored at (0, 0); positioning is alignment's job. The
/// ratio is returned alongside the rectangle so callers can report it.
pub fn scale_preserve_aspect(target: &Rect, original: &Rect, mode: AspectMode) -> (f32, Rect) {
    let ratio = select_aspect_ratio(target, original, mode);
    let scaled = Rect {
        top: 0,
        left: 0,
        bottom: (original.height() as f32 * ratio) as i32,
        right: (original.width() as f32 * ratio) as i32,
    };
    (ratio, scaled)
}

/// Positions `alignee` relative to `reference` according to `affinity`.
///
/// Only the alignee's size matters; its own position is discarded. With no
/// affinity the alignee is anchored at the reference's top-left corner.
/// Otherwise each axis starts from that anchor and shifts by the size
/// difference between alignee and reference: the full difference for
/// `Right`/`Bottom` so the trailing edges line up, half of it for
/// `Centered` so the centers line up, and nothing for `Left`/`Top`. The
/// rule is symmetric in size — an alignee larger than the reference
/// overhangs on the side away from the anchor, a smaller one sits inside.
pub fn align(reference: &Rect, alignee: &Rect, affinity: Option<Affinity>) -> Rect {
    let width = alignee.width();
    let height = alignee.height();

    let mut left = reference.left;
    let mut top = reference.top;

    if let Some(affinity) = affinity {
        let x_excess = width - reference.width();
        match affinity.horizontal {
            HorizontalAffinity::Left => {}
            HorizontalAffinity::Right => left -= x_excess,
            HorizontalAffinity::Centered => left -= x_excess / 2,
        }

        let y_excess = height - reference.height();
        match affinity.vertical {
            VerticalAffinity::Top => {}
            VerticalAffinity::Bottom => top -= y_excess,
            VerticalAffinity::Centered => top -= y_excess / 2,
        }
    }

    Rect {
        top,
        left,
        bottom: top + height,
        right: left + width,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
