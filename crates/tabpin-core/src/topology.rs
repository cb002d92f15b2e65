//! The output topology: every active CRTC of the running display server,
//! with its placement inside the combined screen and (when known) its
//! physical dimensions.

use thiserror::Error;
use tracing::debug;

use crate::geometry::rect::{Point, Rect};

/// Topology construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// More active CRTCs than the caller's fixed capacity allows. The
    /// caller cannot tell which entries would have been dropped, so the
    /// whole result is unusable rather than silently truncated.
    #[error("display has {found} active outputs but only {capacity} fit")]
    CapacityExceeded { found: usize, capacity: usize },
}

/// One CRTC as reported by the display server, before filtering.
///
/// `output` and the physical dimensions are present only when the CRTC
/// drives exactly one output; mirrored or dangling CRTCs report neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtcEntry {
    pub crtc: u32,
    pub output: Option<u32>,
    pub name: Option<String>,
    pub width_mm: u32,
    pub height_mm: u32,
    pub rect: Rect,
}

/// An active output region within the combined screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRegion {
    pub crtc: u32,
    pub output: Option<u32>,
    pub name: Option<String>,
    pub width_mm: u32,
    pub height_mm: u32,
    pub rect: Rect,
}

/// The set of active output regions, in server enumeration order.
///
/// Indexes into the topology are what the user-facing surface exposes, so
/// ordering is stable for a given server state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputTopology {
    regions: Vec<OutputRegion>,
}

impl OutputTopology {
    /// Builds a topology from raw CRTC entries, skipping inactive ones.
    ///
    /// A CRTC with non-positive width or height is disabled (or in a
    /// transient configuration state) and contributes no region.
    pub fn from_entries(entries: impl IntoIterator<Item = CrtcEntry>) -> Self {
        let regions = entries
            .into_iter()
            .filter(|entry| {
                let active = entry.rect.width() > 0 && entry.rect.height() > 0;
                if !active {
                    debug!(crtc = entry.crtc, "skipping inactive crtc");
                }
                active
            })
            .map(|entry| OutputRegion {
                crtc: entry.crtc,
                output: entry.output,
                name: entry.name,
                width_mm: entry.width_mm,
                height_mm: entry.height_mm,
                rect: entry.rect,
            })
            .collect();
        OutputTopology { regions }
    }

    /// Like [`from_entries`](Self::from_entries), but fails when more than
    /// `capacity` active regions are found.
    pub fn from_entries_bounded(
        entries: impl IntoIterator<Item = CrtcEntry>,
        capacity: usize,
    ) -> Result<Self, TopologyError> {
        let topology = Self::from_entries(entries);
        if topology.regions.len() > capacity {
            return Err(TopologyError::CapacityExceeded {
                found: topology.regions.len(),
                capacity,
            });
        }
        Ok(topology)
    }

    pub fn regions(&self) -> &[OutputRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The region at a user-facing index.
    pub fn get(&self, index: usize) -> Option<&OutputRegion> {
        self.regions.get(index)
    }

    /// The first region whose output name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<(usize, &OutputRegion)> {
        self.regions
            .iter()
            .enumerate()
            .find(|(_, region)| region.name.as_deref() == Some(name))
    }

    /// The first region containing `point`, edges inclusive.
    ///
    /// Outputs normally tile the screen without overlap, but nothing
    /// enforces that; when regions do overlap, enumeration order decides.
    pub fn find_containing(&self, point: Point) -> Option<(usize, &OutputRegion)> {
        self.regions
            .iter()
            .enumerate()
            .find(|(_, region)| region.rect.contains(point))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(crtc: u32, rect: Rect) -> CrtcEntry {
        CrtcEntry {
            crtc,
            output: Some(crtc + 100),
            name: Some(format!("DP-{crtc}")),
            width_mm: 600,
            height_mm: 340,
            rect,
        }
    }

    /// Two 1920×1080 outputs side by side.
    fn dual_entries() -> Vec<CrtcEntry> {
        vec![
            entry(1, Rect::new(0, 0, 1080, 1920)),
            entry(2, Rect::new(0, 1920, 1080, 3840)),
        ]
    }

    #[test]
    fn test_from_entries_keeps_enumeration_order() {
        let topology = OutputTopology::from_entries(dual_entries());
        assert_eq!(topology.len(), 2);
        assert_eq!(topology.get(0).map(|r| r.crtc), Some(1));
        assert_eq!(topology.get(1).map(|r| r.crtc), Some(2));
    }

    #[test]
    fn test_from_entries_skips_disabled_crtcs() {
        let mut entries = dual_entries();
        // A disabled CRTC reports a zero-sized rectangle.
        entries.insert(1, entry(9, Rect::new(0, 0, 0, 0)));
        let topology = OutputTopology::from_entries(entries);
        assert_eq!(topology.len(), 2);
        assert_eq!(topology.get(1).map(|r| r.crtc), Some(2));
    }

    #[test]
    fn test_from_entries_bounded_accepts_exact_fit() {
        let topology = OutputTopology::from_entries_bounded(dual_entries(), 2);
        assert_eq!(topology.map(|t| t.len()), Ok(2));
    }

    #[test]
    fn test_from_entries_bounded_rejects_overflow_entirely() {
        let result = OutputTopology::from_entries_bounded(dual_entries(), 1);
        assert_eq!(
            result,
            Err(TopologyError::CapacityExceeded {
                found: 2,
                capacity: 1
            })
        );
    }

    #[test]
    fn test_bounded_capacity_counts_active_regions_only() {
        let mut entries = dual_entries();
        entries.push(entry(9, Rect::new(0, 0, 0, 0)));
        // Three raw entries, two active: capacity 2 still fits.
        assert!(OutputTopology::from_entries_bounded(entries, 2).is_ok());
    }

    #[test]
    fn test_find_containing_picks_region_under_point() {
        let topology = OutputTopology::from_entries(dual_entries());
        let hit = topology.find_containing(Point { x: 2500.0, y: 500.0 });
        assert_eq!(hit.map(|(index, _)| index), Some(1));
    }

    #[test]
    fn test_find_containing_includes_region_edges() {
        let topology = OutputTopology::from_entries(dual_entries());
        // Bottom-right corner of the second output.
        let hit = topology.find_containing(Point { x: 3840.0, y: 1080.0 });
        assert_eq!(hit.map(|(index, _)| index), Some(1));
    }

    #[test]
    fn test_find_containing_prefers_first_region_on_shared_seam() {
        let topology = OutputTopology::from_entries(dual_entries());
        // x = 1920 is the right edge of region 0 and the left edge of
        // region 1; enumeration order wins.
        let hit = topology.find_containing(Point { x: 1920.0, y: 500.0 });
        assert_eq!(hit.map(|(index, _)| index), Some(0));
    }

    #[test]
    fn test_find_containing_misses_outside_all_regions() {
        let topology = OutputTopology::from_entries(dual_entries());
        assert!(topology.find_containing(Point { x: 4000.0, y: 500.0 }).is_none());
    }

    #[test]
    fn test_find_by_name_matches_exactly() {
        let topology = OutputTopology::from_entries(dual_entries());
        assert_eq!(topology.find_by_name("DP-2").map(|(index, _)| index), Some(1));
        assert!(topology.find_by_name("DP").is_none());
    }

    #[test]
    fn test_empty_topology() {
        let topology = OutputTopology::from_entries(Vec::new());
        assert!(topology.is_empty());
        assert!(topology.get(0).is_none());
    }
}
