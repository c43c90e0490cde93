//! Grid-based localization of difference regions.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::types::{DifferenceMap, EngineResult, GridRegion, CANONICAL_SIZE};

/// A pixel counts as changed when its magnitude exceeds this value.
pub const PIXEL_THRESHOLD: f32 = 0.3;

/// A cell is flagged when its changed-pixel ratio exceeds this value.
pub const CELL_RATIO_THRESHOLD: f64 = 0.3;

/// Default number of cells per side.
pub const DEFAULT_GRID_RESOLUTION: u32 = 8;

/// Largest accepted grid. Finer cells would be narrower than one pixel of the canonical map.
pub const MAX_GRID_RESOLUTION: u32 = CANONICAL_SIZE as u32;

/// Number of cells per side of the grid, in `1..=MAX_GRID_RESOLUTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GridResolution(NonZeroU32);

impl GridResolution {
    pub fn new(cells_per_side: u32) -> Option<Self> {
        if cells_per_side > MAX_GRID_RESOLUTION {
            return None;
        }
        NonZeroU32::new(cells_per_side).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for GridResolution {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_GRID_RESOLUTION - 1))
    }
}

impl TryFrom<u32> for GridResolution {
    type Error = InvalidGridResolution;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidGridResolution)
    }
}

impl FromStr for GridResolution {
    type Err = InvalidGridResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| InvalidGridResolution)?;
        Self::try_from(value)
    }
}

impl From<GridResolution> for u32 {
    fn from(value: GridResolution) -> Self {
        value.get()
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned when a grid resolution outside `1..=MAX_GRID_RESOLUTION` is requested.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("grid resolution must be an integer from 1 to 224")]
pub struct InvalidGridResolution;

/// Splits a difference map into `N x N` cells and flags the busy ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAnalyzer {
    resolution: GridResolution,
    pixel_threshold: f32,
    cell_ratio_threshold: f64,
}

impl GridAnalyzer {
    pub fn new(resolution: GridResolution) -> Self {
        Self {
            resolution,
            pixel_threshold: PIXEL_THRESHOLD,
            cell_ratio_threshold: CELL_RATIO_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, pixel_threshold: f32, cell_ratio_threshold: f64) -> Self {
        self.pixel_threshold = pixel_threshold;
        self.cell_ratio_threshold = cell_ratio_threshold;
        self
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    /// Every candidate cell in row-major order, with confidence 0.
    pub fn candidate_cells(&self) -> Vec<GridRegion> {
        let n = self.resolution.get() as usize;
        (0..n * n).map(|i| self.cell_rect(i / n, i % n, 0.0)).collect()
    }

    /// Fraction of pixels in cell `(row, col)` whose magnitude exceeds the pixel threshold.
    ///
    /// Cell `i` spans pixels `[i*len/N, (i+1)*len/N)` on each axis, so cells
    /// cover every pixel even when `N` does not divide the map size. An empty
    /// cell has ratio 0.
    pub fn cell_ratio(&self, map: &DifferenceMap, row: usize, col: usize) -> f64 {
        let n = self.resolution.get() as usize;
        let (y0, y1) = cell_span(row, n, map.height());
        let (x0, x1) = cell_span(col, n, map.width());

        let total = (y1 - y0) * (x1 - x0);
        if total == 0 {
            return 0.0;
        }

        let mut changed = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                if map.get(y, x) > self.pixel_threshold {
                    changed += 1;
                }
            }
        }
        changed as f64 / total as f64
    }

    /// Flag every cell whose ratio exceeds the cell threshold.
    ///
    /// Cells are evaluated in parallel on the current rayon pool; the output
    /// keeps row-major order regardless of thread count.
    pub fn analyze(&self, map: &DifferenceMap, cancel: &CancelToken) -> EngineResult<Vec<GridRegion>> {
        let n = self.resolution.get() as usize;

        let flagged: Vec<Option<GridRegion>> = (0..n * n)
            .into_par_iter()
            .map(|i| {
                if cancel.is_cancelled() {
                    return None;
                }
                let (row, col) = (i / n, i % n);
                let ratio = self.cell_ratio(map, row, col);
                (ratio > self.cell_ratio_threshold).then(|| self.cell_rect(row, col, ratio))
            })
            .collect();

        cancel.check()?;

        let regions: Vec<GridRegion> = flagged.into_iter().flatten().collect();
        tracing::debug!(
            "Grid {n}x{n}: {} of {} cells flagged",
            regions.len(),
            n * n
        );
        Ok(regions)
    }

    fn cell_rect(&self, row: usize, col: usize, confidence: f64) -> GridRegion {
        let n = self.resolution.get() as f64;
        GridRegion {
            x: col as f64 / n,
            y: row as f64 / n,
            width: 1.0 / n,
            height: 1.0 / n,
            confidence,
        }
    }
}

fn cell_span(index: usize, cells: usize, len: usize) -> (usize, usize) {
    (index * len / cells, (index + 1) * len / cells)
}
