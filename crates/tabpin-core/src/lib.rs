//! # tabpin-core
//!
//! The display-server-independent engine behind `tabpin`: rectangle
//! algebra, output topology, device input regions, physical-unit
//! calibration, and construction of the normalized 3×3 transform that
//! restricts an absolute pointing device to one output.
//!
//! ## Architecture overview (for beginners)
//!
//! Restricting a tablet to one monitor is, at its core, a coordinate
//! change. An absolute device reports positions in its own axis range
//! (say 0..4000), the display server stretches that range over the whole
//! combined screen, and the "Coordinate Transformation Matrix" property
//! lets us insert an affine transform in between. This crate computes
//! that matrix in four steps:
//!
//! 1. [`topology`] snapshots the active outputs and where each one sits
//!    inside the combined screen.
//! 2. [`device`] finds a device's absolute X/Y valuators and their ranges,
//!    giving the device's own input rectangle.
//! 3. [`geometry`] scales the input rectangle against the chosen output
//!    (aspect handling), aligns it (which edge the overhang hangs off),
//!    and normalizes the result by the screen size into a [`Transform`].
//! 4. [`calibration`] optionally replaces the input rectangle with a
//!    virtual one sized so the mapping is 1:1 in physical units.
//!
//! Everything here is pure: the crate never talks to a display server.
//! Session handling, property writes, and the interactive click picker
//! live in `tabpin-cli`, behind traits the tests replace with mocks.

pub mod calibration;
pub mod device;
pub mod geometry;
pub mod topology;

pub use calibration::{one_to_one_region, CalibrationError};
pub use device::{
    device_region, find_absolute_axes, read_point, AbsAxisLabels, AxisLabel, AxisMode, DeviceError,
    DeviceId, DeviceRegion, ValuatorCaps, ValuatorIndices,
};
pub use geometry::rect::{
    align, scale_preserve_aspect, select_aspect_ratio, Affinity, AspectMode, HorizontalAffinity,
    Point, Rect, VerticalAffinity,
};
pub use geometry::transform::{build_transform, AlignConfig, Transform};
pub use topology::{CrtcEntry, OutputRegion, OutputTopology, TopologyError};
