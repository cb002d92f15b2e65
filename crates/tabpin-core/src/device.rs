//! Pointing-device capabilities: locating the absolute X/Y axes among a
//! device's valuators, deriving the device's input region from their
//! ranges, and decoding axis values out of sparse valuator reports.

use thiserror::Error;

use crate::geometry::rect::{Point, Rect};

/// A device identifier as the input extension reports it.
pub type DeviceId = u16;

/// An interned axis-label identifier.
///
/// Labels are display-server atoms; the session layer interns the label
/// strings once at startup and hands the resulting ids in as plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLabel(pub u32);

/// The interned labels naming the two absolute axes ("Abs X" / "Abs Y").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsAxisLabels {
    pub x: AxisLabel,
    pub y: AxisLabel,
}

/// Valuator numbers of the selected X and Y axes on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuatorIndices {
    pub x: u16,
    pub y: u16,
}

/// Whether a valuator reports positions or deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    Absolute,
    Relative,
}

/// One valuator's capabilities, as reported by the device query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuatorCaps {
    pub number: u16,
    pub label: AxisLabel,
    pub mode: AxisMode,
    pub min: f64,
    pub max: f64,
    pub resolution: u32,
}

/// The input region of an absolute pointing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRegion {
    pub axes: ValuatorIndices,
    /// Axis ranges: `left..right` is the X valuator's min..max, `top..bottom`
    /// the Y valuator's.
    pub rect: Rect,
    /// X axis resolution in device units per meter.
    pub hres: u32,
    /// Y axis resolution in device units per meter.
    pub vres: u32,
}

/// Device capability errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device has no absolute-mode valuator for one of the two
    /// position labels. Relative devices (mice) and devices whose axes
    /// carry other labels end up here.
    #[error("device has no absolute X/Y axes")]
    NoAbsoluteAxes,
    /// A valuator report did not include a value for a required axis.
    #[error("axis report carries no value for valuator {valuator}")]
    MissingAxisValue { valuator: u16 },
}

/// Finds the valuator numbers of the absolute X and Y axes.
///
/// The capability list is unordered and mixes axis kinds; only valuators
/// that are both in absolute mode and carry the expected label qualify.
/// The first match per label wins.
pub fn find_absolute_axes(
    classes: &[ValuatorCaps],
    labels: &AbsAxisLabels,
) -> Result<ValuatorIndices, DeviceError> {
    let find = |label: AxisLabel| {
        classes
            .iter()
            .find(|caps| caps.mode == AxisMode::Absolute && caps.label == label)
            .map(|caps| caps.number)
    };
    let x = find(labels.x).ok_or(DeviceError::NoAbsoluteAxes)?;
    let y = find(labels.y).ok_or(DeviceError::NoAbsoluteAxes)?;
    Ok(ValuatorIndices { x, y })
}

/// Builds the device's input region from the selected axes' ranges.
///
/// Looks the valuator numbers up again rather than trusting positions in
/// the list; a number that cannot be re-located means the capability list
/// does not describe the device the indices came from.
pub fn device_region(
    classes: &[ValuatorCaps],
    axes: ValuatorIndices,
) -> Result<DeviceRegion, DeviceError> {
    let caps_for = |number: u16| classes.iter().find(|caps| caps.number == number);
    let x = caps_for(axes.x).ok_or(DeviceError::NoAbsoluteAxes)?;
    let y = caps_for(axes.y).ok_or(DeviceError::NoAbsoluteAxes)?;
    Ok(DeviceRegion {
        axes,
        rect: Rect {
            top: y.min as i32,
            left: x.min as i32,
            bottom: y.max as i32,
            right: x.max as i32,
        },
        hres: x.resolution,
        vres: y.resolution,
    })
}

/// Value of one valuator in a sparse report, if present.
///
/// The mask is little-endian within each 32-bit word: valuator `n` is bit
/// `n % 32` of word `n / 32`. Values are packed densely in ascending
/// valuator order, one per set bit, so the value's index is the number of
/// set bits below the valuator's own.
fn report_value(mask_words: &[u32], values: &[f64], valuator: u16) -> Option<f64> {
    let word = usize::from(valuator / 32);
    let offset = valuator % 32;
    let word_bits = *mask_words.get(word)?;
    if word_bits & (1 << offset) == 0 {
        return None;
    }
    let mut index = 0usize;
    for bits in &mask_words[..word] {
        index += bits.count_ones() as usize;
    }
    index += (word_bits & ((1u32 << offset) - 1)).count_ones() as usize;
    values.get(index).copied()
}

/// Decodes the X/Y position out of a sparse valuator report.
///
/// Motion and button events report only the valuators that changed, so
/// either axis may be absent; the caller decides whether to fall back to
/// an earlier report or give up.
pub fn read_point(
    mask_words: &[u32],
    values: &[f64],
    axes: ValuatorIndices,
) -> Result<Point, DeviceError> {
    let x = report_value(mask_words, values, axes.x)
        .ok_or(DeviceError::MissingAxisValue { valuator: axes.x })?;
    let y = report_value(mask_words, values, axes.y)
        .ok_or(DeviceError::MissingAxisValue { valuator: axes.y })?;
    Ok(Point { x, y })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
