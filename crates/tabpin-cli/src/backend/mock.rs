//! A scriptable in-memory backend. Stores transforms in a map, records
//! every write and grab, and serves queued click positions, so tests can
//! drive the whole apply pipeline without a display server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tabpin_core::{
    find_absolute_axes, AbsAxisLabels, AxisLabel, AxisMode, CrtcEntry, DeviceId, Point, Rect,
    Transform, ValuatorCaps, ValuatorIndices,
};

use super::{BackendError, DisplayTopology, PointerDevices, PointerInfo};

const ABS_X: AxisLabel = AxisLabel(100);
const ABS_Y: AxisLabel = AxisLabel(101);
const REL_SCROLL: AxisLabel = AxisLabel(102);

/// One simulated input device.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub id: DeviceId,
    pub name: String,
    pub classes: Vec<ValuatorCaps>,
}

/// A configurable fake display-server session.
///
/// Construction sets up the static topology and device list; the mutable
/// pieces (stored transforms, recorded calls, queued clicks) sit behind
/// mutexes so the backend traits can stay `&self`.
pub struct MockBackend {
    pub screen: Rect,
    pub entries: Vec<CrtcEntry>,
    pub labels: AbsAxisLabels,
    pub devices: Vec<MockDevice>,
    transforms: Mutex<HashMap<DeviceId, Transform>>,
    set_calls: Mutex<Vec<(DeviceId, Transform)>>,
    clicks: Mutex<VecDeque<Point>>,
    grabs: Mutex<Vec<DeviceId>>,
    fail_set: Option<DeviceId>,
    read_back_override: Mutex<Option<Transform>>,
}

/// Locks a mutex, recovering the data if a previous test panicked with
/// the lock held.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    /// Two 1920×1080 outputs side by side and one 4000×3000 tablet
    /// (device 12). Only "DP-1" reports physical dimensions, so
    /// one-to-one mode works on output 0 and fails on output 1.
    pub fn dual_head() -> Self {
        MockBackend {
            screen: Rect::new(0, 0, 1080, 3840),
            entries: vec![
                CrtcEntry {
                    crtc: 1,
                    output: Some(11),
                    name: Some("DP-1".into()),
                    width_mm: 300,
                    height_mm: 200,
                    rect: Rect::new(0, 0, 1080, 1920),
                },
                CrtcEntry {
                    crtc: 2,
                    output: Some(12),
                    name: Some("HDMI-1".into()),
                    width_mm: 0,
                    height_mm: 0,
                    rect: Rect::new(0, 1920, 1080, 3840),
                },
            ],
            labels: AbsAxisLabels { x: ABS_X, y: ABS_Y },
            devices: vec![MockDevice {
                id: 12,
                name: "Wacom Intuos Pen".into(),
                classes: tablet_classes(),
            }],
            transforms: Mutex::new(HashMap::new()),
            set_calls: Mutex::new(Vec::new()),
            clicks: Mutex::new(VecDeque::new()),
            grabs: Mutex::new(Vec::new()),
            fail_set: None,
            read_back_override: Mutex::new(None),
        }
    }

    /// Adds a second tablet (device 13) with the same axis layout.
    pub fn with_second_tablet(mut self) -> Self {
        self.devices.push(MockDevice {
            id: 13,
            name: "Graphics Tablet Pen".into(),
            classes: tablet_classes(),
        });
        self
    }

    /// Adds a relative-only mouse (device 14); it must never be treated
    /// as restrictable.
    pub fn with_relative_mouse(mut self) -> Self {
        self.devices.push(MockDevice {
            id: 14,
            name: "Generic USB Mouse".into(),
            classes: vec![
                caps(0, ABS_X, AxisMode::Relative, 0.0, 0.0, 0),
                caps(1, ABS_Y, AxisMode::Relative, 0.0, 0.0, 0),
            ],
        });
        self
    }

    /// Makes `set_transform` fail for one device.
    pub fn fail_set_for(mut self, device: DeviceId) -> Self {
        self.fail_set = Some(device);
        self
    }

    /// Queues a click position for the next `wait_for_click`.
    pub fn push_click(&self, point: Point) {
        lock(&self.clicks).push_back(point);
    }

    /// Forces every subsequent `transform` read to return `transform`,
    /// regardless of what was written. Simulates a server that mangles
    /// the property.
    pub fn override_read_back(&self, transform: Transform) {
        *lock(&self.read_back_override) = Some(transform);
    }

    /// Pre-sets a device's stored transform without recording a write.
    pub fn seed_transform(&self, device: DeviceId, transform: Transform) {
        lock(&self.transforms).insert(device, transform);
    }

    /// Every `set_transform` call so far, in order.
    pub fn set_calls(&self) -> Vec<(DeviceId, Transform)> {
        lock(&self.set_calls).clone()
    }

    /// The transform currently stored for a device, if any write reached it.
    pub fn written(&self, device: DeviceId) -> Option<Transform> {
        lock(&self.transforms).get(&device).copied()
    }

    /// Devices grabbed by `wait_for_click`, in order.
    pub fn grabs(&self) -> Vec<DeviceId> {
        lock(&self.grabs).clone()
    }

    fn device(&self, id: DeviceId) -> Result<&MockDevice, BackendError> {
        self.devices
            .iter()
            .find(|device| device.id == id)
            .ok_or(BackendError::NoSuchDevice(id))
    }
}

fn caps(number: u16, label: AxisLabel, mode: AxisMode, min: f64, max: f64, resolution: u32) -> ValuatorCaps {
    ValuatorCaps {
        number,
        label,
        mode,
        min,
        max,
        resolution,
    }
}

/// Absolute 4000×3000 X/Y at resolution 40, plus a relative scroll wheel.
fn tablet_classes() -> Vec<ValuatorCaps> {
    vec![
        caps(0, ABS_X, AxisMode::Absolute, 0.0, 4000.0, 40),
        caps(1, ABS_Y, AxisMode::Absolute, 0.0, 3000.0, 40),
        caps(2, REL_SCROLL, AxisMode::Relative, 0.0, 71.0, 0),
    ]
}

impl DisplayTopology for MockBackend {
    fn screen_rect(&self) -> Result<Rect, BackendError> {
        Ok(self.screen)
    }

    fn crtc_entries(&self) -> Result<Vec<CrtcEntry>, BackendError> {
        Ok(self.entries.clone())
    }
}

impl PointerDevices for MockBackend {
    fn axis_labels(&self) -> Result<AbsAxisLabels, BackendError> {
        Ok(self.labels)
    }

    fn absolute_pointers(&self) -> Result<Vec<PointerInfo>, BackendError> {
        Ok(self
            .devices
            .iter()
            .filter(|device| find_absolute_axes(&device.classes, &self.labels).is_ok())
            .map(|device| PointerInfo {
                id: device.id,
                name: device.name.clone(),
            })
            .collect())
    }

    fn valuator_classes(&self, device: DeviceId) -> Result<Vec<ValuatorCaps>, BackendError> {
        Ok(self.device(device)?.classes.clone())
    }

    fn transform(&self, device: DeviceId) -> Result<Transform, BackendError> {
        self.device(device)?;
        if let Some(forced) = *lock(&self.read_back_override) {
            return Ok(forced);
        }
        Ok(lock(&self.transforms)
            .get(&device)
            .copied()
            .unwrap_or(Transform::IDENTITY))
    }

    fn set_transform(&self, device: DeviceId, transform: &Transform) -> Result<(), BackendError> {
        self.device(device)?;
        if self.fail_set == Some(device) {
            return Err(BackendError::Request(format!(
                "simulated write failure on device {device}"
            )));
        }
        lock(&self.transforms).insert(device, *transform);
        lock(&self.set_calls).push((device, *transform));
        Ok(())
    }

    fn wait_for_click(
        &self,
        device: DeviceId,
        _axes: ValuatorIndices,
    ) -> Result<Point, BackendError> {
        self.device(device)?;
        lock(&self.grabs).push(device);
        lock(&self.clicks)
            .pop_front()
            .ok_or_else(|| BackendError::Request("mock has no queued click".into()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_head_fixture_shape() {
        // Arrange
        let backend = MockBackend::dual_head();

        // Assert
        assert_eq!(backend.entries.len(), 2);
        assert_eq!(backend.screen.width(), 3840);
        assert_eq!(backend.devices.len(), 1);
    }

    #[test]
    fn test_absolute_pointers_excludes_relative_mouse() {
        // Arrange
        let backend = MockBackend::dual_head().with_relative_mouse();

        // Act
        let pointers = backend.absolute_pointers().expect("enumerate");

        // Assert: the mouse's axes are relative, so only the tablet shows.
        assert_eq!(pointers.len(), 1);
        assert_eq!(pointers[0].id, 12);
    }

    #[test]
    fn test_set_transform_then_read_back_returns_written_matrix() {
        // Arrange
        let backend = MockBackend::dual_head();
        let written = Transform::from_affine(0.5, 1.0, 0.5, 0.0);

        // Act
        backend.set_transform(12, &written).expect("set");

        // Assert
        assert_eq!(backend.transform(12).expect("read"), written);
        assert_eq!(backend.set_calls(), vec![(12, written)]);
    }

    #[test]
    fn test_read_back_override_wins_over_stored_transform() {
        // Arrange
        let backend = MockBackend::dual_head();
        backend
            .set_transform(12, &Transform::from_affine(0.5, 1.0, 0.5, 0.0))
            .expect("set");

        // Act
        backend.override_read_back(Transform::IDENTITY);

        // Assert
        assert_eq!(backend.transform(12).expect("read"), Transform::IDENTITY);
    }

    #[test]
    fn test_queued_clicks_pop_in_order() {
        // Arrange
        let backend = MockBackend::dual_head();
        backend.push_click(Point { x: 100.0, y: 100.0 });
        backend.push_click(Point { x: 2000.0, y: 500.0 });
        let axes = ValuatorIndices { x: 0, y: 1 };

        // Act / Assert
        assert_eq!(
            backend.wait_for_click(12, axes).expect("first"),
            Point { x: 100.0, y: 100.0 }
        );
        assert_eq!(
            backend.wait_for_click(12, axes).expect("second"),
            Point { x: 2000.0, y: 500.0 }
        );
        assert_eq!(backend.grabs(), vec![12, 12]);
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        let backend = MockBackend::dual_head();
        assert!(matches!(
            backend.set_transform(99, &Transform::IDENTITY),
            Err(BackendError::NoSuchDevice(99))
        ));
        assert!(matches!(
            backend.valuator_classes(99),
            Err(BackendError::NoSuchDevice(99))
        ));
    }
}
