//! Physical-unit calibration: computes the virtual input rectangle that
//! gives a device a 1:1 physical mapping onto one output, so a centimeter
//! of pen travel is a centimeter of cursor travel.

use thiserror::Error;

use crate::device::DeviceRegion;
use crate::geometry::rect::Rect;
use crate::topology::OutputRegion;

/// Calibration input errors. Both would otherwise surface as a division
/// by zero, i.e. an infinite scale.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalibrationError {
    /// The output does not report its physical size. Common for
    /// projectors and for CRTCs driving more than one output.
    #[error("output {crtc} reports no physical {dimension}")]
    ZeroPhysicalSize { crtc: u32, dimension: &'static str },
    /// The device does not report a resolution for the axis.
    #[error("device reports zero resolution on the {axis} axis")]
    ZeroResolution { axis: &'static str },
}

/// Computes the input rectangle for a 1:1 physical mapping.
///
/// The result spans as many device units as the output spans physically:
/// its width is `1000 · output_px · device_units / resolution / output_mm`
/// per axis (resolution is in units per meter, the factor 1000 converts to
/// millimeters), anchored at the device region's top-left corner.
///
/// The rectangle is virtual and routinely far larger than the device's
/// real range; fed to the transform builder unscaled, it makes exactly the
/// physically-matching slice of the device surface land on the output.
pub fn one_to_one_region(
    output: &OutputRegion,
    device: &DeviceRegion,
) -> Result<Rect, CalibrationError> {
    if output.width_mm == 0 {
        return Err(CalibrationError::ZeroPhysicalSize {
            crtc: output.crtc,
            dimension: "width",
        });
    }
    if output.height_mm == 0 {
        return Err(CalibrationError::ZeroPhysicalSize {
            crtc: output.crtc,
            dimension: "height",
        });
    }
    if device.hres == 0 {
        return Err(CalibrationError::ZeroResolution { axis: "x" });
    }
    if device.vres == 0 {
        return Err(CalibrationError::ZeroResolution { axis: "y" });
    }

    // Intermediates exceed 32 bits for ordinary hardware (a full-HD output
    // on a mid-size tablet is already ~7.7e9), so widen before multiplying.
    let width = 1000i64 * i64::from(output.rect.width()) * i64::from(device.rect.width())
        / i64::from(device.hres)
        / i64::from(output.width_mm);
    let height = 1000i64 * i64::from(output.rect.height()) * i64::from(device.rect.height())
        / i64::from(device.vres)
        / i64::from(output.height_mm);

    Ok(Rect {
        top: device.rect.top,
        left: device.rect.left,
        bottom: device.rect.top + height as i32,
        right: device.rect.left + width as i32,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
