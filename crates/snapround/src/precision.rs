//! The fixed precision grid that all noded output is snapped to.
//!
//! A [`PrecisionModel`] holds a positive `scale` (grid cells per unit).
//! Rounding maps every ordinate to the nearest multiple of `1 / scale`.
//!
//! Ties round half up (towards positive infinity), the convention used by
//! `Math.round` and by the geometry toolkits this noder interoperates
//! with. The tie rule decides which cell owns a value lying exactly on a
//! cell boundary, so it is applied identically everywhere a value is
//! snapped: here, and when hot pixels compute their integer centers.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::types::NodingError;

/// A fixed grid defined by a scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PrecisionModel {
    scale: f64,
    /// `1 / scale` when the grid is coarser than one unit.
    ///
    /// Dividing by an integral grid size is exact where multiplying by
    /// its reciprocal is not.
    grid_size: Option<f64>,
}

impl PrecisionModel {
    /// Create a grid with `scale` cells per unit.
    ///
    /// # Errors
    ///
    /// Returns [`NodingError::InvalidScale`] if `scale` is not a finite,
    /// strictly positive number.
    pub fn new(scale: f64) -> Result<Self, NodingError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(NodingError::InvalidScale(scale));
        }
        let grid_size = (scale < 1.0).then(|| {
            let grid = 1.0 / scale;
            let snapped = grid.round();
            if (grid - snapped).abs() <= grid * 1e-12 {
                snapped
            } else {
                grid
            }
        });
        Ok(Self { scale, grid_size })
    }

    /// Grid cells per unit.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Distance between adjacent grid lines.
    #[must_use]
    pub fn grid_size(&self) -> f64 {
        self.grid_size.unwrap_or(1.0 / self.scale)
    }

    /// Snap a single ordinate to the grid.
    #[must_use]
    pub fn make_precise(&self, value: f64) -> f64 {
        match self.grid_size {
            Some(grid) => round_half_up(value / grid) * grid,
            None => round_half_up(value * self.scale) / self.scale,
        }
    }

    /// Snap a coordinate to the grid, component-wise.
    #[must_use]
    pub fn round(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.make_precise(c.x),
            y: self.make_precise(c.y),
        }
    }

    /// Round every point and drop consecutive repeats.
    ///
    /// The result may have a single point when the whole line collapses
    /// into one grid cell.
    #[must_use]
    pub fn round_points(&self, points: &[Coord<f64>]) -> Vec<Coord<f64>> {
        let mut rounded: Vec<Coord<f64>> = Vec::with_capacity(points.len());
        for &p in points {
            let r = self.round(p);
            if rounded.last() != Some(&r) {
                rounded.push(r);
            }
        }
        rounded
    }

    /// Returns `true` if `c` already lies on the grid.
    #[must_use]
    pub fn is_precise(&self, c: Coord<f64>) -> bool {
        self.round(c) == c
    }
}

impl TryFrom<f64> for PrecisionModel {
    type Error = NodingError;

    fn try_from(scale: f64) -> Result<Self, Self::Error> {
        Self::new(scale)
    }
}

impl From<PrecisionModel> for f64 {
    fn from(pm: PrecisionModel) -> Self {
        pm.scale
    }
}

/// Round to the nearest integer, with ties going towards positive infinity.
///
/// `value - value.floor()` is exact for every finite `f64`, so the tie
/// comparison itself introduces no error.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}
