//! The Coordinate Transformation Matrix and the pipeline that builds one
//! from a target output, a device input region, and the overall screen.

use tracing::debug;

use super::rect::{align, scale_preserve_aspect, Affinity, AspectMode, Rect};

/// A row-major 3×3 affine transform in normalized device coordinates.
///
/// Only the four affine cells vary; rotation and shear stay zero and the
/// last row is always `[0, 0, 1]`. X servers consume the matrix as nine
/// 32-bit floats, which fixes the element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f32; 9]);

impl Transform {
    /// The identity matrix; applying it un-restricts a device so it maps
    /// to the whole screen again.
    pub const IDENTITY: Transform = Transform([
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0,
    ]);

    /// Builds a pure scale + offset matrix.
    pub const fn from_affine(x_scale: f32, y_scale: f32, x_offset: f32, y_offset: f32) -> Self {
        Transform([
            x_scale, 0.0, x_offset, //
            0.0, y_scale, y_offset, //
            0.0, 0.0, 1.0,
        ])
    }

    pub fn x_scale(&self) -> f32 {
        self.0[0]
    }

    pub fn y_scale(&self) -> f32 {
        self.0[4]
    }

    pub fn x_offset(&self) -> f32 {
        self.0[2]
    }

    pub fn y_offset(&self) -> f32 {
        self.0[5]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.0;
        write!(
            f,
            "[{} {} {}; {} {} {}; {} {} {}]",
            m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8]
        )
    }
}

/// Scaling and placement choices for [`build_transform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignConfig {
    pub aspect: AspectMode,
    pub affinity: Affinity,
}

impl Default for AlignConfig {
    /// Cover the output and pin the overhang to its top-left corner.
    fn default() -> Self {
        AlignConfig {
            aspect: AspectMode::Fit,
            affinity: Affinity {
                horizontal: super::rect::HorizontalAffinity::Left,
                vertical: super::rect::VerticalAffinity::Top,
            },
        }
    }
}

/// Computes the transform that maps `input` onto `target` within `screen`.
///
/// Three steps: scale `input` per the aspect mode, align the scaled
/// rectangle against `target`, then normalize the aligned rectangle by the
/// screen's dimensions. Each offset is divided by the screen dimension of
/// its own axis (x by width, y by height), so the matrix is correct on
/// non-square screens.
///
/// The caller guarantees `screen` is non-degenerate; a zero-sized screen
/// rectangle would divide by zero here.
pub fn build_transform(target: &Rect, input: &Rect, screen: &Rect, config: &AlignConfig) -> Transform {
    let (ratio, scaled) = scale_preserve_aspect(target, input, config.aspect);
    let aligned = align(target, &scaled, Some(config.affinity));

    let x_scale = aligned.width() as f32 / screen.width() as f32;
    let y_scale = aligned.height() as f32 / screen.height() as f32;
    let x_offset = aligned.left as f32 / screen.width() as f32;
    let y_offset = aligned.top as f32 / screen.height() as f32;

    debug!(
        ratio,
        ?aligned,
        x_scale,
        y_scale,
        x_offset,
        y_offset,
        "computed device transform"
    );

    Transform::from_affine(x_scale, y_scale, x_offset, y_offset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
