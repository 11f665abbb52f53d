//! Grid topology
//!
//! Read-only neighbour indices and static per-cell attributes, set once per
//! run. Topology generation belongs to the host; the engine only consumes
//! the flat neighbour layout.
//!
//! # Memory layout
//!
//! Neighbour lists live in one flat `Vec` with per-cell offset ranges, so a
//! cell's neighbours are a contiguous slice and iteration order is
//! deterministic.

use crate::error::{Error, Result};

/// Immutable spherical-grid topology with static per-cell attributes.
#[derive(Debug, Clone)]
pub struct GridTopology {
    cell_count: usize,
    /// Flat storage for all neighbour lists
    neighbor_data: Vec<u32>,
    /// `neighbor_offsets[i]` = (start, end) range into `neighbor_data`
    neighbor_offsets: Vec<(usize, usize)>,
    /// Latitude per cell, radians in [-pi/2, pi/2]
    latitude: Vec<f64>,
    /// Longitude per cell, radians in [0, 2*pi)
    longitude: Vec<f64>,
}

impl GridTopology {
    /// Build a topology from externally generated neighbour lists.
    ///
    /// Validates index ranges and attribute lengths; the result is frozen.
    pub fn from_parts(
        neighbors: Vec<Vec<u32>>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
    ) -> Result<Self> {
        let cell_count = neighbors.len();
        if latitude.len() != cell_count {
            return Err(Error::LengthMismatch {
                field: "latitude",
                expected: cell_count,
                actual: latitude.len(),
            });
        }
        if longitude.len() != cell_count {
            return Err(Error::LengthMismatch {
                field: "longitude",
                expected: cell_count,
                actual: longitude.len(),
            });
        }
        let mut neighbor_data = Vec::new();
        let mut neighbor_offsets = Vec::with_capacity(cell_count);
        for list in &neighbors {
            let start = neighbor_data.len();
            for &n in list {
                if n as usize >= cell_count {
                    return Err(Error::InvalidConfig(format!(
                        "neighbour index {n} out of range for {cell_count} cells"
                    )));
                }
                neighbor_data.push(n);
            }
            neighbor_offsets.push((start, neighbor_data.len()));
        }
        Ok(Self {
            cell_count,
            neighbor_data,
            neighbor_offsets,
            latitude,
            longitude,
        })
    }

    /// Deterministic rows x cols lattice wrapped east-west, clamped at the
    /// poles. Stands in for a real spherical grid in tests and demos.
    pub fn lattice(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "lattice dimensions must be nonzero");
        let cells = rows * cols;
        let mut neighbors = Vec::with_capacity(cells);
        let mut latitude = Vec::with_capacity(cells);
        let mut longitude = Vec::with_capacity(cells);
        for r in 0..rows {
            // Band centres, pole to pole
            let lat = std::f64::consts::FRAC_PI_2
                - std::f64::consts::PI * (r as f64 + 0.5) / rows as f64;
            for c in 0..cols {
                let idx = |rr: usize, cc: usize| (rr * cols + cc) as u32;
                let mut list = Vec::with_capacity(4);
                list.push(idx(r, (c + cols - 1) % cols));
                list.push(idx(r, (c + 1) % cols));
                if r > 0 {
                    list.push(idx(r - 1, c));
                }
                if r + 1 < rows {
                    list.push(idx(r + 1, c));
                }
                neighbors.push(list);
                latitude.push(lat);
                longitude.push(std::f64::consts::TAU * c as f64 / cols as f64);
            }
        }
        Self::from_parts(neighbors, latitude, longitude)
            .expect("lattice construction is internally consistent")
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Neighbour indices of a cell, in deterministic order.
    pub fn neighbors(&self, cell: usize) -> &[u32] {
        let (start, end) = self.neighbor_offsets[cell];
        &self.neighbor_data[start..end]
    }

    /// Latitude of a cell, radians.
    pub fn latitude(&self, cell: usize) -> f64 {
        self.latitude[cell]
    }

    /// Longitude of a cell, radians.
    pub fn longitude(&self, cell: usize) -> f64 {
        self.longitude[cell]
    }
}
