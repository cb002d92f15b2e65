//! End-to-end pipeline tests: raw CRTC entries and valuator capabilities
//! in, finished transform matrix out. These mirror how the CLI drives the
//! engine, without any display server involved.

use tabpin_core::{
    build_transform, device_region, find_absolute_axes, one_to_one_region, read_point,
    AbsAxisLabels, Affinity, AlignConfig, AspectMode, AxisLabel, AxisMode, CrtcEntry,
    HorizontalAffinity, OutputTopology, Rect, ValuatorCaps, VerticalAffinity,
};

const ABS_X: AxisLabel = AxisLabel(100);
const ABS_Y: AxisLabel = AxisLabel(101);

fn labels() -> AbsAxisLabels {
    AbsAxisLabels { x: ABS_X, y: ABS_Y }
}

/// Two 1920×1080 outputs side by side; the first reports 300×200 mm.
fn dual_head() -> (Rect, OutputTopology) {
    let screen = Rect::new(0, 0, 1080, 3840);
    let topology = OutputTopology::from_entries(vec![
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
    ]);
    (screen, topology)
}

/// A 4000×3000 tablet with a relative scroll valuator mixed in.
fn tablet_classes() -> Vec<ValuatorCaps> {
    vec![
        ValuatorCaps {
            number: 0,
            label: ABS_X,
            mode: AxisMode::Absolute,
            min: 0.0,
            max: 4000.0,
            resolution: 40,
        },
        ValuatorCaps {
            number: 1,
            label: ABS_Y,
            mode: AxisMode::Absolute,
            min: 0.0,
            max: 3000.0,
            resolution: 40,
        },
        ValuatorCaps {
            number: 2,
            label: AxisLabel(102),
            mode: AxisMode::Relative,
            min: 0.0,
            max: 71.0,
            resolution: 0,
        },
    ]
}

fn top_left_fit() -> AlignConfig {
    AlignConfig {
        aspect: AspectMode::Fit,
        affinity: Affinity {
            horizontal: HorizontalAffinity::Left,
            vertical: VerticalAffinity::Top,
        },
    }
}

#[test]
fn test_tablet_restricted_to_second_monitor() {
    // Arrange: dual-head screen, tablet capabilities.
    let (screen, topology) = dual_head();
    let classes = tablet_classes();

    // Act: resolve the device region and map it onto output 1.
    let axes = find_absolute_axes(&classes, &labels()).unwrap();
    let device = device_region(&classes, axes).unwrap();
    let target = topology.get(1).unwrap();
    let transform = build_transform(&target.rect, &device.rect, &screen, &top_left_fit());

    // Assert: Fit matches the 4:3 tablet to the output's width (ratio
    // 0.48), mapping 1920×1440 starting at the screen's midpoint.
    assert_eq!(transform.x_scale(), 0.5);
    assert_eq!(transform.y_scale(), 1440.0 / 1080.0);
    assert_eq!(transform.x_offset(), 0.5);
    assert_eq!(transform.y_offset(), 0.0);
    assert_eq!(&transform.0[6..], &[0.0, 0.0, 1.0]);
}

#[test]
fn test_click_report_selects_output_under_pen() {
    // Arrange: a button-release report with the pen at (2500, 700), which
    // the server has already projected into screen coordinates.
    let (screen, topology) = dual_head();
    let classes = tablet_classes();
    let axes = find_absolute_axes(&classes, &labels()).unwrap();

    // Act: decode the report and look up the output under it.
    let point = read_point(&[0b11], &[2500.0, 700.0], axes).unwrap();
    let (index, target) = topology.find_containing(point).unwrap();
    let device = device_region(&classes, axes).unwrap();
    let transform = build_transform(&target.rect, &device.rect, &screen, &top_left_fit());

    // Assert: the pen was over the second output.
    assert_eq!(index, 1);
    assert_eq!(transform.x_offset(), 0.5);
}

#[test]
fn test_one_to_one_maps_physical_extent_unscaled() {
    // Arrange: the first output knows its physical size.
    let (screen, topology) = dual_head();
    let classes = tablet_classes();
    let axes = find_absolute_axes(&classes, &labels()).unwrap();
    let device = device_region(&classes, axes).unwrap();
    let target = topology.get(0).unwrap();

    // Act: swap the device rectangle for the calibrated virtual one and
    // build without scaling.
    let virtual_rect = one_to_one_region(target, &device).unwrap();
    let config = AlignConfig {
        aspect: AspectMode::None,
        ..top_left_fit()
    };
    let transform = build_transform(&target.rect, &virtual_rect, &screen, &config);

    // Assert: the virtual rectangle spans 640000×405000 device units, so
    // the per-axis scales encode the physical units-per-pixel ratio.
    assert_eq!(virtual_rect, Rect::new(0, 0, 405_000, 640_000));
    assert_eq!(transform.x_scale(), 640_000.0 / 3840.0);
    assert_eq!(transform.y_scale(), 405_000.0 / 1080.0);
    assert_eq!(transform.x_offset(), 0.0);
    assert_eq!(transform.y_offset(), 0.0);
}

#[test]
fn test_one_to_one_fails_without_physical_dimensions() {
    // The second output reports 0×0 mm (a CRTC driving no single output).
    let (_, topology) = dual_head();
    let classes = tablet_classes();
    let axes = find_absolute_axes(&classes, &labels()).unwrap();
    let device = device_region(&classes, axes).unwrap();

    assert!(one_to_one_region(topology.get(1).unwrap(), &device).is_err());
}

#[test]
fn test_centered_match_height_keeps_tablet_proportions() {
    // Arrange: map the full tablet height onto the first output, centered
    // horizontally; the narrower mapped region floats in the middle.
    let (screen, topology) = dual_head();
    let classes = tablet_classes();
    let axes = find_absolute_axes(&classes, &labels()).unwrap();
    let device = device_region(&classes, axes).unwrap();
    let target = topology.get(0).unwrap();
    let config = AlignConfig {
        aspect: AspectMode::MatchHeight,
        affinity: Affinity {
            horizontal: HorizontalAffinity::Centered,
            vertical: VerticalAffinity::Top,
        },
    };

    // Act.
    let transform = build_transform(&target.rect, &device.rect, &screen, &config);

    // Assert: height ratio 1080/3000 = 0.36 scales the tablet to
    // 1440×1080; centering leaves (1920-1440)/2 = 240 px on each side.
    assert_eq!(transform.x_scale(), 1440.0 / 3840.0);
    assert_eq!(transform.y_scale(), 1.0);
    assert_eq!(transform.x_offset(), 240.0 / 3840.0);
    assert_eq!(transform.y_offset(), 0.0);
}
