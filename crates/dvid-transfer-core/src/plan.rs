//! Partitioning of a block volume into byte-bounded strips.
//!
//! Each Z block-layer is transferred on its own. A layer that would exceed
//! the byte ceiling is cut into equal-width bands along Y; X always spans the
//! full volume.

use crate::config::{BlockShapePolicy, StripCoverage, TransferConfig};
use crate::descriptor::VolumeGeometry;
use crate::error::{Result, TransferError};

/// An axis-aligned box in voxel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripPlan {
    pub origin: [i64; 3],
    pub size: [u64; 3],
}

impl StripPlan {
    /// Voxel count, saturating for boxes too large to address.
    pub fn voxels(&self) -> u64 {
        self.size.iter().fold(1u64, |n, &s| n.saturating_mul(s))
    }
}

/// A strip together with its position in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerStrip {
    /// Z block coordinate of the layer.
    pub z: i64,
    /// Band index within the layer, starting at 0.
    pub band: u64,
    pub strip: StripPlan,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub coverage: StripCoverage,
    pub block_shape: BlockShapePolicy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            coverage: StripCoverage::Complete,
            block_shape: BlockShapePolicy::Warn,
        }
    }
}

impl From<&TransferConfig> for PlanOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            coverage: config.strip_coverage,
            block_shape: config.block_shape,
        }
    }
}

/// The ordered strips for one volume. Strips are generated on demand.
#[derive(Debug, Clone)]
pub struct Plan {
    geometry: VolumeGeometry,
    bytes_per_voxel: u64,
    /// Bytes in one unstripped layer.
    pub layer_bytes: u64,
    /// `floor(layer_bytes / ceiling) + 1` when over the ceiling, else 1.
    pub strips_per_layer: u64,
    /// Band width in block rows.
    pub band_width: u64,
    /// Bands actually emitted per layer.
    pub bands_per_layer: u64,
    pub layers: u64,
}

/// Compute the strip plan for `geometry`.
///
/// The geometry is validated first, so every coordinate below stays within
/// the 32-bit block grid and strip arithmetic cannot overflow.
pub fn plan(
    geometry: &VolumeGeometry,
    byte_ceiling: u64,
    bytes_per_voxel: u64,
    options: PlanOptions,
) -> Result<Plan> {
    geometry
        .validate()
        .map_err(|reason| TransferError::InvalidGeometry { reason })?;

    if !geometry.is_cubic() {
        match options.block_shape {
            BlockShapePolicy::Reject => {
                return Err(TransferError::NonCubicBlocks {
                    block_size: geometry.block_size,
                })
            }
            BlockShapePolicy::Warn => tracing::warn!(
                block_size = ?geometry.block_size,
                "non-cubic block sizes, planning X and Y independently"
            ),
        }
    }

    let (n, extent) = geometry
        .block_extent()
        .zip(geometry.voxel_extent())
        .ok_or_else(|| TransferError::InvalidGeometry {
            reason: format!("extent of {:?} overflows", geometry),
        })?;
    let v = [extent[0], extent[1], geometry.block_size[2] as u64];
    let layer_bytes = v[0]
        .checked_mul(v[1])
        .and_then(|s| s.checked_mul(v[2]))
        .and_then(|s| s.checked_mul(bytes_per_voxel))
        .ok_or(TransferError::SizeOverflow { extent: v })?;

    let byte_ceiling = byte_ceiling.max(1);
    let strips_per_layer = if layer_bytes > byte_ceiling {
        layer_bytes / byte_ceiling + 1
    } else {
        1
    };

    let ny = n[1];
    if strips_per_layer > ny {
        tracing::warn!(
            strips = strips_per_layer,
            block_rows = ny,
            "a single block row exceeds the byte ceiling, transferring one row per strip"
        );
    }
    let band_width = (ny / strips_per_layer).max(1);
    let bands_to_cover = ny.div_ceil(band_width);
    let bands_per_layer = match options.coverage {
        StripCoverage::Complete => bands_to_cover,
        StripCoverage::Legacy => {
            let bands = strips_per_layer.min(bands_to_cover);
            let skipped = ny - (bands * band_width).min(ny);
            if skipped > 0 {
                tracing::warn!(
                    skipped_rows = skipped,
                    "legacy strip coverage leaves trailing block rows untransferred"
                );
            }
            bands
        }
    };

    Ok(Plan {
        geometry: *geometry,
        bytes_per_voxel,
        layer_bytes,
        strips_per_layer,
        band_width,
        bands_per_layer,
        layers: n[2],
    })
}

impl Plan {
    pub fn total_strips(&self) -> u64 {
        self.layers * self.bands_per_layer
    }

    /// Bytes moved per layer, summed over its bands.
    pub fn covered_layer_bytes(&self) -> u64 {
        (0..self.bands_per_layer)
            .map(|band| self.strip(self.geometry.min_index[2], band).voxels() * self.bytes_per_voxel)
            .sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.covered_layer_bytes().saturating_mul(self.layers)
    }

    /// Strips in transfer order: ascending Z layer, then ascending Y band.
    pub fn strips(&self) -> impl Iterator<Item = LayerStrip> + '_ {
        let g = &self.geometry;
        (g.min_index[2]..=g.max_index[2]).flat_map(move |z| {
            (0..self.bands_per_layer).map(move |band| LayerStrip {
                z,
                band,
                strip: self.strip(z, band),
            })
        })
    }

    fn strip(&self, z: i64, band: u64) -> StripPlan {
        let g = &self.geometry;
        let [bx, by, bz] = g.block_size;
        let by0 = g.min_index[1] + (band * self.band_width) as i64;
        let by1 = (by0 + self.band_width as i64 - 1).min(g.max_index[1]);
        let nx = (g.max_index[0] - g.min_index[0] + 1) as u64;

        StripPlan {
            origin: [g.min_index[0] * bx, by0 * by, z * bz],
            size: [
                nx * bx as u64,
                (by1 - by0 + 1) as u64 * by as u64,
                bz as u64,
            ],
        }
    }
}
