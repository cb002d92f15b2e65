//! The apply pipeline: pick an output, derive the device's input region,
//! build the transform, write it, and verify the write. Batch mode maps
//! every absolute pointer and rolls back on failure.

use thiserror::Error;
use tracing::{debug, info, warn};

use tabpin_core::{
    build_transform, device_region, find_absolute_axes, one_to_one_region, AlignConfig,
    AspectMode, CalibrationError, DeviceError, DeviceId, DeviceRegion, OutputRegion,
    OutputTopology, Rect, Transform, ValuatorIndices,
};

use crate::backend::{BackendError, DisplayTopology, PointerDevices};

/// How the target output is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSelector {
    /// By position in the topology's enumeration order.
    Index(usize),
    /// By exact output name, e.g. "DP-1".
    Name(String),
    /// By grabbing the device and waiting for a click on the wanted output.
    Interactive,
}

/// Per-invocation mapping choices.
#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    pub align: AlignConfig,
    /// Replace the device's input rectangle with the physically-calibrated
    /// virtual one.
    pub one_to_one: bool,
    /// Read the property back after writing and fail on a mismatch.
    pub verify: bool,
    /// Plan and report, but write nothing.
    pub dry_run: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            align: AlignConfig::default(),
            one_to_one: false,
            verify: true,
            dry_run: false,
        }
    }
}

/// Outcome of one device mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMapping {
    pub device: DeviceId,
    pub region_index: usize,
    pub output_name: Option<String>,
    pub transform: Transform,
    /// `false` under `--dry-run`.
    pub written: bool,
}

/// Errors from the apply pipeline.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("display has no active outputs")]
    NoOutputs,
    #[error("no output with index {index}; {available} outputs exist")]
    NoSuchOutput { index: usize, available: usize },
    #[error("no output named {name:?}")]
    NoSuchOutputName { name: String },
    #[error("no pointer devices with absolute axes found")]
    NoPointers,
    #[error("click at ({x:.0}, {y:.0}) landed outside every output")]
    ClickOutsideOutputs { x: f64, y: f64 },
    /// The server accepted the write but reads back something else.
    /// Usually another configuration tool racing against us.
    #[error("device {device} read back {actual} after writing {expected}")]
    VerificationMismatch {
        device: DeviceId,
        expected: Transform,
        actual: Transform,
    },
    #[error("device is not mappable: {0}")]
    Device(#[from] DeviceError),
    #[error("one-to-one calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("display server: {0}")]
    Backend(#[from] BackendError),
}

/// Drives the whole mapping flow against a pair of backend traits.
pub struct MapperService<'a> {
    topology: &'a dyn DisplayTopology,
    devices: &'a dyn PointerDevices,
}

impl<'a> MapperService<'a> {
    pub fn new(topology: &'a dyn DisplayTopology, devices: &'a dyn PointerDevices) -> Self {
        MapperService { topology, devices }
    }

    /// Snapshots the screen rectangle and the active output topology.
    pub fn topology(&self) -> Result<(Rect, OutputTopology), ApplyError> {
        let screen = self.topology.screen_rect()?;
        let topology = OutputTopology::from_entries(self.topology.crtc_entries()?);
        debug!(outputs = topology.len(), ?screen, "snapshotted topology");
        Ok((screen, topology))
    }

    /// The absolute axes and input region of one device.
    pub fn device_region(&self, device: DeviceId) -> Result<DeviceRegion, ApplyError> {
        let labels = self.devices.axis_labels()?;
        let classes = self.devices.valuator_classes(device)?;
        let axes = find_absolute_axes(&classes, &labels)?;
        Ok(device_region(&classes, axes)?)
    }

    fn axes(&self, device: DeviceId) -> Result<ValuatorIndices, ApplyError> {
        let labels = self.devices.axis_labels()?;
        let classes = self.devices.valuator_classes(device)?;
        Ok(find_absolute_axes(&classes, &labels)?)
    }

    /// Resolves a selector to an output index. Interactive selection grabs
    /// `device` and waits for a click.
    pub fn resolve_output(
        &self,
        topology: &OutputTopology,
        selector: &OutputSelector,
        device: DeviceId,
    ) -> Result<usize, ApplyError> {
        if topology.is_empty() {
            return Err(ApplyError::NoOutputs);
        }
        match selector {
            OutputSelector::Index(index) => match topology.get(*index) {
                Some(_) => Ok(*index),
                None => Err(ApplyError::NoSuchOutput {
                    index: *index,
                    available: topology.len(),
                }),
            },
            OutputSelector::Name(name) => topology
                .find_by_name(name)
                .map(|(index, _)| index)
                .ok_or_else(|| ApplyError::NoSuchOutputName { name: name.clone() }),
            OutputSelector::Interactive => {
                let axes = self.axes(device)?;
                info!(device, "waiting for a click on the target output");
                let point = self.devices.wait_for_click(device, axes)?;
                topology
                    .find_containing(point)
                    .map(|(index, _)| index)
                    .ok_or(ApplyError::ClickOutsideOutputs {
                        x: point.x,
                        y: point.y,
                    })
            }
        }
    }

    /// Computes the transform for one device onto one output.
    ///
    /// In one-to-one mode the device rectangle is swapped for the
    /// calibrated virtual one, and scaling is forced off so the virtual
    /// rectangle's size survives into the matrix unchanged.
    pub fn plan(
        &self,
        screen: &Rect,
        target: &OutputRegion,
        device: DeviceId,
        options: &MapOptions,
    ) -> Result<Transform, ApplyError> {
        let region = self.device_region(device)?;
        let (input, config) = if options.one_to_one {
            let virtual_rect = one_to_one_region(target, &region)?;
            let config = AlignConfig {
                aspect: AspectMode::None,
                ..options.align
            };
            (virtual_rect, config)
        } else {
            (region.rect, options.align)
        };
        Ok(build_transform(&target.rect, &input, screen, &config))
    }

    /// Writes a transform and, when asked, verifies the readback matches.
    pub fn commit(
        &self,
        device: DeviceId,
        transform: &Transform,
        verify: bool,
    ) -> Result<(), ApplyError> {
        self.devices.set_transform(device, transform)?;
        if verify {
            let actual = self.devices.transform(device)?;
            if actual != *transform {
                return Err(ApplyError::VerificationMismatch {
                    device,
                    expected: *transform,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Maps one device onto the selected output.
    pub fn apply(
        &self,
        selector: &OutputSelector,
        device: DeviceId,
        options: &MapOptions,
    ) -> Result<AppliedMapping, ApplyError> {
        let (screen, topology) = self.topology()?;
        let index = self.resolve_output(&topology, selector, device)?;
        let Some(target) = topology.get(index) else {
            return Err(ApplyError::NoSuchOutput {
                index,
                available: topology.len(),
            });
        };
        let transform = self.plan(&screen, target, device, options)?;
        if options.dry_run {
            info!(device, index, %transform, "dry run; not writing");
        } else {
            self.commit(device, &transform, options.verify)?;
            info!(device, index, %transform, "applied mapping");
        }
        Ok(AppliedMapping {
            device,
            region_index: index,
            output_name: target.name.clone(),
            transform,
            written: !options.dry_run,
        })
    }

    /// Maps every absolute pointer onto the selected output.
    ///
    /// All transforms are planned before anything is written, so a planning
    /// failure leaves every device untouched. If a write fails partway,
    /// the transforms captured beforehand are restored.
    pub fn apply_all(
        &self,
        selector: &OutputSelector,
        options: &MapOptions,
    ) -> Result<Vec<AppliedMapping>, ApplyError> {
        let pointers = self.devices.absolute_pointers()?;
        if pointers.is_empty() {
            return Err(ApplyError::NoPointers);
        }

        let (screen, topology) = self.topology()?;
        // Interactive selection needs a device to grab; the first pointer
        // stands in for all of them.
        let index = self.resolve_output(&topology, selector, pointers[0].id)?;
        let Some(target) = topology.get(index) else {
            return Err(ApplyError::NoSuchOutput {
                index,
                available: topology.len(),
            });
        };

        let mut planned = Vec::with_capacity(pointers.len());
        for pointer in &pointers {
            let transform = self.plan(&screen, target, pointer.id, options)?;
            planned.push((pointer.id, transform));
        }

        if options.dry_run {
            info!(devices = planned.len(), index, "dry run; not writing");
        } else {
            let mut captured = Vec::with_capacity(planned.len());
            for (device, _) in &planned {
                captured.push((*device, self.devices.transform(*device)?));
            }
            for (device, transform) in &planned {
                if let Err(error) = self.commit(*device, transform, options.verify) {
                    warn!(device, %error, "write failed; rolling back");
                    self.rollback(&captured);
                    return Err(error);
                }
            }
            info!(devices = planned.len(), index, "applied mapping to all pointers");
        }

        Ok(planned
            .into_iter()
            .map(|(device, transform)| AppliedMapping {
                device,
                region_index: index,
                output_name: target.name.clone(),
                transform,
                written: !options.dry_run,
            })
            .collect())
    }

    fn rollback(&self, captured: &[(DeviceId, Transform)]) {
        for (device, transform) in captured {
            if let Err(error) = self.devices.set_transform(*device, transform) {
                warn!(device, %error, "rollback write failed");
            }
        }
    }

    /// Restores a device to the identity transform.
    pub fn reset(&self, device: DeviceId, verify: bool, dry_run: bool) -> Result<(), ApplyError> {
        if dry_run {
            info!(device, "dry run; not resetting");
            return Ok(());
        }
        self.commit(device, &Transform::IDENTITY, verify)?;
        info!(device, "reset to identity");
        Ok(())
    }

    /// Restores every absolute pointer to the identity transform.
    pub fn reset_all(&self, verify: bool, dry_run: bool) -> Result<usize, ApplyError> {
        let pointers = self.devices.absolute_pointers()?;
        if pointers.is_empty() {
            return Err(ApplyError::NoPointers);
        }
        for pointer in &pointers {
            self.reset(pointer.id, verify, dry_run)?;
        }
        Ok(pointers.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use tabpin_core::Point;

    fn service(backend: &MockBackend) -> MapperService<'_> {
        MapperService::new(backend, backend)
    }

    #[test]
    fn test_resolve_output_by_index_checks_range() {
        // Arrange
        let backend = MockBackend::dual_head();
        let mapper = service(&backend);
        let (_, topology) = mapper.topology().expect("topology");

        // Act / Assert
        assert_eq!(
            mapper
                .resolve_output(&topology, &OutputSelector::Index(1), 12)
                .expect("in range"),
            1
        );
        assert!(matches!(
            mapper.resolve_output(&topology, &OutputSelector::Index(5), 12),
            Err(ApplyError::NoSuchOutput {
                index: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn test_resolve_output_by_name() {
        // Arrange
        let backend = MockBackend::dual_head();
        let mapper = service(&backend);
        let (_, topology) = mapper.topology().expect("topology");

        // Act / Assert
        assert_eq!(
            mapper
                .resolve_output(&topology, &OutputSelector::Name("HDMI-1".into()), 12)
                .expect("known name"),
            1
        );
        assert!(matches!(
            mapper.resolve_output(&topology, &OutputSelector::Name("DVI-0".into()), 12),
            Err(ApplyError::NoSuchOutputName { .. })
        ));
    }

    #[test]
    fn test_interactive_resolution_grabs_device_and_uses_click() {
        // Arrange: a click on the second output.
        let backend = MockBackend::dual_head();
        backend.push_click(Point { x: 2500.0, y: 600.0 });
        let mapper = service(&backend);
        let (_, topology) = mapper.topology().expect("topology");

        // Act
        let index = mapper
            .resolve_output(&topology, &OutputSelector::Interactive, 12)
            .expect("resolve");

        // Assert
        assert_eq!(index, 1);
        assert_eq!(backend.grabs(), vec![12]);
    }

    #[test]
    fn test_interactive_click_outside_all_outputs_is_an_error() {
        // Arrange: below the screen.
        let backend = MockBackend::dual_head();
        backend.push_click(Point { x: 100.0, y: 5000.0 });
        let mapper = service(&backend);
        let (_, topology) = mapper.topology().expect("topology");

        // Act / Assert
        assert!(matches!(
            mapper.resolve_output(&topology, &OutputSelector::Interactive, 12),
            Err(ApplyError::ClickOutsideOutputs { .. })
        ));
    }

    #[test]
    fn test_commit_with_verify_detects_mangled_readback() {
        // Arrange: the server "loses" every write.
        let backend = MockBackend::dual_head();
        backend.override_read_back(Transform::IDENTITY);
        let mapper = service(&backend);
        let wanted = Transform::from_affine(0.5, 1.0, 0.5, 0.0);

        // Act / Assert
        assert!(matches!(
            mapper.commit(12, &wanted, true),
            Err(ApplyError::VerificationMismatch { device: 12, .. })
        ));
        // Without verification the same write passes.
        mapper.commit(12, &wanted, false).expect("unverified");
    }

    #[test]
    fn test_plan_one_to_one_ignores_aspect_mode() {
        // Arrange: output 0 knows its physical size.
        let backend = MockBackend::dual_head();
        let mapper = service(&backend);
        let (screen, topology) = mapper.topology().expect("topology");
        let target = topology.get(0).expect("output").clone();
        let options = MapOptions {
            one_to_one: true,
            ..MapOptions::default()
        };

        // Act
        let transform = mapper.plan(&screen, &target, 12, &options).expect("plan");

        // Assert: the virtual rectangle's size flows through unscaled.
        assert_eq!(transform.x_scale(), 640_000.0 / 3840.0);
        assert_eq!(transform.y_scale(), 405_000.0 / 1080.0);
    }

    #[test]
    fn test_plan_one_to_one_needs_physical_dimensions() {
        // Output 1 reports 0×0 mm.
        let backend = MockBackend::dual_head();
        let mapper = service(&backend);
        let (screen, topology) = mapper.topology().expect("topology");
        let target = topology.get(1).expect("output").clone();
        let options = MapOptions {
            one_to_one: true,
            ..MapOptions::default()
        };

        assert!(matches!(
            mapper.plan(&screen, &target, 12, &options),
            Err(ApplyError::Calibration(_))
        ));
    }

    #[test]
    fn test_reset_writes_identity() {
        // Arrange: device starts restricted.
        let backend = MockBackend::dual_head();
        backend.seed_transform(12, Transform::from_affine(0.5, 1.0, 0.5, 0.0));
        let mapper = service(&backend);

        // Act
        mapper.reset(12, true, false).expect("reset");

        // Assert
        assert_eq!(backend.written(12), Some(Transform::IDENTITY));
    }
}
