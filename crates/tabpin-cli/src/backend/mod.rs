//! Display-server access, split behind two traits so the mapping logic
//! never touches a real server in tests.
//!
//! [`DisplayTopology`] answers "what outputs exist and how big is the
//! screen"; [`PointerDevices`] covers everything device-side: enumeration,
//! valuator capabilities, the transform property, and the interactive
//! click grab.
//!
//! # Implementations
//!
//! | Module | Server | API used                                   |
//! |--------|--------|--------------------------------------------|
//! | `x11`  | X11    | x11rb (RandR for outputs, XInput2 for devices) |
//!
//! The native implementation is selected at compile time and re-exported
//! as `NativeSession`; only this module contains the platform condition.
//! A [`MockBackend`] is always compiled (not guarded by `#[cfg]`) so tests
//! run on any platform without a display.

use thiserror::Error;

use tabpin_core::{
    AbsAxisLabels, CrtcEntry, DeviceId, Point, Rect, Transform, ValuatorCaps, ValuatorIndices,
};

/// Errors from the display-server session.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not open a connection to the display server.
    ///
    /// The inner string carries the server-side detail, e.g.
    /// "DISPLAY is unset" or the connect error's own message.
    #[error("cannot connect to the display server: {0}")]
    Connect(String),
    /// A request failed after the connection was established.
    #[error("display server request failed: {0}")]
    Request(String),
    /// No pointer device with the given id exists.
    #[error("no pointer device with id {0}")]
    NoSuchDevice(DeviceId),
    /// The device's transform property exists but is not a 3×3 float
    /// matrix (wrong type, wrong length, or wrong format).
    #[error("transform property of device {device} is malformed: {detail}")]
    BadProperty { device: DeviceId, detail: String },
}

/// A pointer device eligible for restriction: it reports absolute X/Y axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerInfo {
    pub id: DeviceId,
    pub name: String,
}

/// Read access to the output topology.
pub trait DisplayTopology: Send + Sync {
    /// The combined screen rectangle all outputs tile.
    fn screen_rect(&self) -> Result<Rect, BackendError>;

    /// All CRTCs the server reports, active or not, in server order.
    fn crtc_entries(&self) -> Result<Vec<CrtcEntry>, BackendError>;
}

/// Access to pointer devices and their transform property.
pub trait PointerDevices: Send + Sync {
    /// The interned "Abs X" / "Abs Y" label identifiers for this session.
    fn axis_labels(&self) -> Result<AbsAxisLabels, BackendError>;

    /// Pointer devices carrying absolute X/Y axes, in server order.
    fn absolute_pointers(&self) -> Result<Vec<PointerInfo>, BackendError>;

    /// Valuator capabilities of one device.
    fn valuator_classes(&self, device: DeviceId) -> Result<Vec<ValuatorCaps>, BackendError>;

    /// Current transform matrix of the device. Devices that never had a
    /// transform set report the identity.
    fn transform(&self, device: DeviceId) -> Result<Transform, BackendError>;

    /// Writes the device's transform matrix property.
    fn set_transform(&self, device: DeviceId, transform: &Transform) -> Result<(), BackendError>;

    /// Grabs the device and blocks until a button release, returning the
    /// position of the release (or of the last motion before it) in
    /// screen coordinates. The grab is released before returning, on
    /// success and failure alike.
    fn wait_for_click(
        &self,
        device: DeviceId,
        axes: ValuatorIndices,
    ) -> Result<Point, BackendError>;
}

// ── X11 implementation ────────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
pub mod x11;

/// Re-export the X11 session as `NativeSession` on Linux, so the rest of
/// the crate never names the platform.
#[cfg(target_os = "linux")]
pub use x11::X11Session as NativeSession;

// ── Mock implementation (always compiled for tests) ───────────────────────────

pub mod mock;

pub use mock::MockBackend;
