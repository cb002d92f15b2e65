//! X11 implementation of the backend traits via x11rb.
//!
//! RandR answers the topology side (CRTC placement, output names,
//! physical dimensions); XInput2 answers the device side (valuator
//! classes, the "Coordinate Transformation Matrix" property, and the
//! interactive device grab).
//!
//! # Implementation notes
//!
//! All atoms the session ever needs are interned once at open time, so
//! the query paths never pay an intern round-trip. The transform property
//! travels as nine 32-bit words holding `f32` bit patterns of type
//! `FLOAT`; reads and writes go through `f32::from_bits`/`to_bits`
//! rather than any numeric cast.

use tracing::{debug, info, warn};

use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xinput::{
    self, ConnectionExt as _, DeviceClassData, DeviceType, Fp3232, GrabOwner, ValuatorMode,
    XIChangePropertyAux, XIEventMask, XIGetPropertyItems,
};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::rust_connection::RustConnection;

use tabpin_core::{
    find_absolute_axes, read_point, AbsAxisLabels, AxisLabel, AxisMode, CrtcEntry, DeviceId,
    Point, Rect, Transform, ValuatorCaps, ValuatorIndices,
};

use super::{BackendError, DisplayTopology, PointerDevices, PointerInfo};

/// XIQueryDevice wildcard covering every device.
const ALL_DEVICES: u16 = 0;

/// The transform property is nine 32-bit items.
const MATRIX_WORDS: u32 = 9;

/// An open X11 connection plus the atoms the session works with.
pub struct X11Session {
    conn: RustConnection,
    root: xproto::Window,
    atoms: Atoms,
}

#[derive(Debug, Clone, Copy)]
struct Atoms {
    abs_x: xproto::Atom,
    abs_y: xproto::Atom,
    transform: xproto::Atom,
    float: xproto::Atom,
}

impl From<ConnectError> for BackendError {
    fn from(error: ConnectError) -> Self {
        BackendError::Connect(error.to_string())
    }
}

impl From<ConnectionError> for BackendError {
    fn from(error: ConnectionError) -> Self {
        BackendError::Request(error.to_string())
    }
}

impl From<ReplyError> for BackendError {
    fn from(error: ReplyError) -> Self {
        BackendError::Request(error.to_string())
    }
}

impl X11Session {
    /// Connects to the display named by `DISPLAY`, negotiates XInput 2,
    /// and interns the session's atoms.
    pub fn open() -> Result<Self, BackendError> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        // XInput requests are only valid after version negotiation.
        let version = conn.xinput_xi_query_version(2, 0)?.reply()?;
        debug!(
            major = version.major_version,
            minor = version.minor_version,
            "negotiated XInput version"
        );

        let atoms = Atoms {
            abs_x: intern(&conn, b"Abs X")?,
            abs_y: intern(&conn, b"Abs Y")?,
            transform: intern(&conn, b"Coordinate Transformation Matrix")?,
            float: intern(&conn, b"FLOAT")?,
        };

        Ok(X11Session { conn, root, atoms })
    }

    /// XIQueryDevice for one device, mapping the server's "no such
    /// device" error onto [`BackendError::NoSuchDevice`].
    fn query_device(&self, device: DeviceId) -> Result<xinput::XIQueryDeviceReply, BackendError> {
        self.conn
            .xinput_xi_query_device(device)?
            .reply()
            .map_err(|error| match &error {
                ReplyError::X11Error(e) if e.error_kind == ErrorKind::XinputDevice => {
                    BackendError::NoSuchDevice(device)
                }
                _ => BackendError::Request(error.to_string()),
            })
    }

    fn ungrab(&self, device: DeviceId) -> Result<(), BackendError> {
        self.conn
            .xinput_xi_ungrab_device(x11rb::CURRENT_TIME, device)?
            .check()?;
        Ok(())
    }

    /// Consumes events until the device releases a button. Motion events
    /// keep the most recent position; the release's own axis report wins
    /// when it carries one, matching how a pen tap reports.
    fn click_loop(
        &self,
        device: DeviceId,
        axes: ValuatorIndices,
    ) -> Result<Point, BackendError> {
        let mut last_motion = None;
        loop {
            match self.conn.wait_for_event()? {
                Event::XinputMotion(motion) if motion.deviceid == device => {
                    let values = fp3232_values(&motion.axisvalues);
                    if let Ok(point) = read_point(&motion.valuator_mask, &values, axes) {
                        last_motion = Some(point);
                    }
                }
                Event::XinputButtonRelease(release) if release.deviceid == device => {
                    let values = fp3232_values(&release.axisvalues);
                    return match read_point(&release.valuator_mask, &values, axes) {
                        Ok(point) => Ok(point),
                        Err(_) => last_motion.ok_or_else(|| {
                            BackendError::Request(
                                "button release carried no axis data and no motion preceded it"
                                    .into(),
                            )
                        }),
                    };
                }
                _ => {}
            }
        }
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<xproto::Atom, BackendError> {
    Ok(conn.intern_atom(false, name)?.reply()?.atom)
}

/// XInput's fixed-point 32.32 to `f64`; the fraction is an unsigned
/// offset added to the signed integral part.
fn fp3232_to_f64(value: Fp3232) -> f64 {
    f64::from(value.integral) + f64::from(value.frac) / (f64::from(u32::MAX) + 1.0)
}

fn fp3232_values(values: &[Fp3232]) -> Vec<f64> {
    values.iter().map(|&value| fp3232_to_f64(value)).collect()
}

/// Extracts the valuator classes out of a device's class list.
fn collect_valuators(classes: &[xinput::DeviceClass]) -> Vec<ValuatorCaps> {
    classes
        .iter()
        .filter_map(|class| {
            let DeviceClassData::Valuator(v) = &class.data else {
                return None;
            };
            Some(ValuatorCaps {
                number: v.number,
                label: AxisLabel(v.label),
                mode: if v.mode == ValuatorMode::ABSOLUTE {
                    AxisMode::Absolute
                } else {
                    AxisMode::Relative
                },
                min: fp3232_to_f64(v.min),
                max: fp3232_to_f64(v.max),
                resolution: v.resolution,
            })
        })
        .collect()
}

fn is_pointer(device_type: DeviceType) -> bool {
    device_type == DeviceType::SLAVE_POINTER || device_type == DeviceType::FLOATING_SLAVE
}

impl DisplayTopology for X11Session {
    fn screen_rect(&self) -> Result<Rect, BackendError> {
        let geometry = self.conn.get_geometry(self.root)?.reply()?;
        Ok(Rect {
            top: i32::from(geometry.y),
            left: i32::from(geometry.x),
            bottom: i32::from(geometry.y) + i32::from(geometry.height),
            right: i32::from(geometry.x) + i32::from(geometry.width),
        })
    }

    fn crtc_entries(&self) -> Result<Vec<CrtcEntry>, BackendError> {
        let resources = self.conn.randr_get_screen_resources(self.root)?.reply()?;
        let mut entries = Vec::with_capacity(resources.crtcs.len());
        for &crtc in &resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)?
                .reply()?;
            // Output name and physical size are only meaningful when the
            // CRTC drives exactly one output; mirrored CRTCs report neither.
            let (output, name, width_mm, height_mm) = if info.outputs.len() == 1 {
                let output = info.outputs[0];
                let output_info = self
                    .conn
                    .randr_get_output_info(output, resources.config_timestamp)?
                    .reply()?;
                (
                    Some(output),
                    String::from_utf8(output_info.name).ok(),
                    output_info.mm_width,
                    output_info.mm_height,
                )
            } else {
                (None, None, 0, 0)
            };
            entries.push(CrtcEntry {
                crtc,
                output,
                name,
                width_mm,
                height_mm,
                rect: Rect {
                    top: i32::from(info.y),
                    left: i32::from(info.x),
                    bottom: i32::from(info.y) + i32::from(info.height),
                    right: i32::from(info.x) + i32::from(info.width),
                },
            });
        }
        Ok(entries)
    }
}

impl PointerDevices for X11Session {
    fn axis_labels(&self) -> Result<AbsAxisLabels, BackendError> {
        Ok(AbsAxisLabels {
            x: AxisLabel(self.atoms.abs_x),
            y: AxisLabel(self.atoms.abs_y),
        })
    }

    fn absolute_pointers(&self) -> Result<Vec<PointerInfo>, BackendError> {
        let reply = self.query_device(ALL_DEVICES)?;
        let labels = self.axis_labels()?;
        let mut pointers = Vec::new();
        for info in reply.infos {
            if !is_pointer(info.type_) {
                continue;
            }
            let classes = collect_valuators(&info.classes);
            if find_absolute_axes(&classes, &labels).is_ok() {
                pointers.push(PointerInfo {
                    id: info.deviceid,
                    name: String::from_utf8_lossy(&info.name).into_owned(),
                });
            }
        }
        Ok(pointers)
    }

    fn valuator_classes(&self, device: DeviceId) -> Result<Vec<ValuatorCaps>, BackendError> {
        let reply = self.query_device(device)?;
        let info = reply
            .infos
            .iter()
            .find(|info| info.deviceid == device)
            .ok_or(BackendError::NoSuchDevice(device))?;
        Ok(collect_valuators(&info.classes))
    }

    fn transform(&self, device: DeviceId) -> Result<Transform, BackendError> {
        let reply = self
            .conn
            .xinput_xi_get_property(
                device,
                false,
                self.atoms.transform,
                self.atoms.float,
                0,
                MATRIX_WORDS,
            )?
            .reply()?;

        if reply.type_ == x11rb::NONE {
            // Property never set; the server applies the identity.
            return Ok(Transform::IDENTITY);
        }
        if reply.type_ != self.atoms.float {
            return Err(BackendError::BadProperty {
                device,
                detail: format!("property has type atom {}, not FLOAT", reply.type_),
            });
        }
        let XIGetPropertyItems::Data32(words) = &reply.items else {
            return Err(BackendError::BadProperty {
                device,
                detail: "property format is not 32-bit".into(),
            });
        };
        if words.len() != MATRIX_WORDS as usize {
            return Err(BackendError::BadProperty {
                device,
                detail: format!("expected {MATRIX_WORDS} items, found {}", words.len()),
            });
        }

        let mut matrix = [0.0f32; 9];
        for (cell, word) in matrix.iter_mut().zip(words) {
            *cell = f32::from_bits(*word);
        }
        Ok(Transform(matrix))
    }

    fn set_transform(&self, device: DeviceId, transform: &Transform) -> Result<(), BackendError> {
        let words: Vec<u32> = transform.0.iter().map(|cell| cell.to_bits()).collect();
        self.conn
            .xinput_xi_change_property(
                device,
                xproto::PropMode::REPLACE,
                self.atoms.transform,
                self.atoms.float,
                MATRIX_WORDS,
                &XIChangePropertyAux::Data32(words),
            )?
            .check()?;
        debug!(device, %transform, "wrote transform property");
        Ok(())
    }

    fn wait_for_click(
        &self,
        device: DeviceId,
        axes: ValuatorIndices,
    ) -> Result<Point, BackendError> {
        let mask =
            u32::from(XIEventMask::MOTION) | u32::from(XIEventMask::BUTTON_RELEASE);
        let reply = self
            .conn
            .xinput_xi_grab_device(
                self.root,
                x11rb::CURRENT_TIME,
                x11rb::NONE,
                device,
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::ASYNC,
                GrabOwner::NO_OWNER,
                &[mask],
            )?
            .reply()?;
        if reply.status != xproto::GrabStatus::SUCCESS {
            return Err(BackendError::Request(format!(
                "device grab refused: {:?}",
                reply.status
            )));
        }
        info!(device, "device grabbed; click on the target output");

        let result = self.click_loop(device, axes);
        // Release the grab whether or not a point was obtained; a device
        // left grabbed is unusable for the whole session.
        if let Err(error) = self.ungrab(device) {
            warn!(device, %error, "failed to release device grab");
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp3232_integral_part_only() {
        assert_eq!(fp3232_to_f64(Fp3232 { integral: 5, frac: 0 }), 5.0);
        assert_eq!(fp3232_to_f64(Fp3232 { integral: 0, frac: 0 }), 0.0);
    }

    #[test]
    fn test_fp3232_fraction_is_an_unsigned_offset() {
        let half = Fp3232 {
            integral: 5,
            frac: 0x8000_0000,
        };
        assert_eq!(fp3232_to_f64(half), 5.5);

        // -2.5 is integral -3 plus fraction 0.5.
        let negative = Fp3232 {
            integral: -3,
            frac: 0x8000_0000,
        };
        assert_eq!(fp3232_to_f64(negative), -2.5);
    }

    #[test]
    fn test_pointer_type_filter() {
        assert!(is_pointer(DeviceType::SLAVE_POINTER));
        assert!(is_pointer(DeviceType::FLOATING_SLAVE));
        assert!(!is_pointer(DeviceType::MASTER_POINTER));
        assert!(!is_pointer(DeviceType::SLAVE_KEYBOARD));
    }

    /// Smoke-test against a real server: if DISPLAY is set the session
    /// must open and report a non-empty screen.
    #[test]
    #[ignore = "needs a running X server"]
    fn test_open_session_smoke() {
        let session = X11Session::open().expect("open session");
        let screen = session.screen_rect().expect("screen rect");
        assert!(screen.width() > 0 && screen.height() > 0);

        let entries = session.crtc_entries().expect("crtc entries");
        for entry in &entries {
            assert!(entry.rect.width() >= 0);
        }
    }

    #[test]
    #[ignore = "needs a running X server"]
    fn test_enumerate_pointers_smoke() {
        let session = X11Session::open().expect("open session");
        let pointers = session.absolute_pointers().expect("pointers");
        for pointer in &pointers {
            let classes = session.valuator_classes(pointer.id).expect("classes");
            assert!(!classes.is_empty());
        }
    }
}
