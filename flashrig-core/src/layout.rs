use crate::group::FlashGroups;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Screen arrangement of the stimulus table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Radial,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ring {
    Outer,
    Middle,
    Inner,
}

impl Ring {
    /// Ring of a stimulus index: the table is split into thirds, first third
    /// outermost.
    pub fn of_index(index: usize, total: usize) -> Ring {
        let third = (total / 3).max(1);
        match index / third {
            0 => Ring::Outer,
            1 => Ring::Middle,
            _ => Ring::Inner,
        }
    }

    pub fn tier(self) -> usize {
        match self {
            Ring::Outer => 0,
            Ring::Middle => 1,
            Ring::Inner => 2,
        }
    }
}

/// Which rings are populated this session ("difficulty" in the radial
/// layout). Grid sessions ignore this.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RingSelection {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(untagged)]
    Rings(Vec<Ring>),
}

impl RingSelection {
    pub fn contains(&self, ring: Ring) -> bool {
        match self {
            RingSelection::All => true,
            RingSelection::Rings(rings) => rings.contains(&ring),
        }
    }
}

/// Three concentric rings of evenly spaced stimuli around a fixation point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialGeometry {
    pub center: (f32, f32),
    /// Outer, middle, inner radius in px.
    pub ring_radii: [f32; 3],
    /// Stimulus size per ring, matching `ring_radii` order.
    pub size_tiers: [f32; 3],
    pub per_ring: usize,
}

impl Default for RadialGeometry {
    fn default() -> Self {
        Self {
            center: (640.0, 360.0),
            ring_radii: [320.0, 215.0, 110.0],
            size_tiers: [64.0, 52.0, 40.0],
            per_ring: 9,
        }
    }
}

impl RadialGeometry {
    pub fn slots(&self) -> usize {
        self.per_ring * self.ring_radii.len()
    }

    /// Positions in table order: the outer ring occupies the first
    /// `per_ring` indices, then middle, then inner.
    pub fn positions(&self) -> Vec<(f32, f32)> {
        let mut positions = Vec::with_capacity(self.slots());
        for radius in self.ring_radii {
            for slot in 0..self.per_ring {
                let angle = TAU * slot as f32 / self.per_ring as f32 - TAU / 4.0;
                positions.push((
                    self.center.0 + radius * angle.cos(),
                    self.center.1 + radius * angle.sin(),
                ));
            }
        }
        positions
    }

    pub fn size_for(&self, index: usize) -> f32 {
        self.size_tiers[Ring::of_index(index, self.slots()).tier()]
    }

    /// Two merged partitions: 9 spokes (same angular slot across the rings),
    /// then the 3 rings themselves.
    pub fn groups(&self) -> FlashGroups {
        let rings = self.ring_radii.len();
        let spokes: Vec<Vec<usize>> = (0..self.per_ring)
            .map(|slot| (0..rings).map(|ring| ring * self.per_ring + slot).collect())
            .collect();
        let ring_sets: Vec<Vec<usize>> = (0..rings)
            .map(|ring| (ring * self.per_ring..(ring + 1) * self.per_ring).collect())
            .collect();
        FlashGroups::from_partitions(&[spokes, ring_sets])
    }
}

/// Row-major rectangular matrix of uniformly sized stimuli.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub origin: (f32, f32),
    pub cell: (f32, f32),
    pub rows: usize,
    pub cols: usize,
    pub size: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            origin: (340.0, 160.0),
            cell: (120.0, 100.0),
            rows: 5,
            cols: 6,
            size: 56.0,
        }
    }
}

impl GridGeometry {
    pub fn slots(&self) -> usize {
        self.rows * self.cols
    }

    pub fn positions(&self) -> Vec<(f32, f32)> {
        let mut positions = Vec::with_capacity(self.slots());
        for row in 0..self.rows {
            for col in 0..self.cols {
                positions.push((
                    self.origin.0 + col as f32 * self.cell.0,
                    self.origin.1 + row as f32 * self.cell.1,
                ));
            }
        }
        positions
    }

    /// Literal rows then literal columns, keys continuing across the merge.
    pub fn groups(&self) -> FlashGroups {
        let rows: Vec<Vec<usize>> = (0..self.rows)
            .map(|r| (0..self.cols).map(|c| r * self.cols + c).collect())
            .collect();
        let cols: Vec<Vec<usize>> = (0..self.cols)
            .map(|c| (0..self.rows).map(|r| r * self.cols + c).collect())
            .collect();
        FlashGroups::from_partitions(&[rows, cols])
    }
}
