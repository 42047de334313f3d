//! Axis-aligned selections over position-shaped blocks (`pos`, `vel`, `accel`).

use crate::error::{Error, Result};
use crate::index::{Sorter, filter_by_ids};
use crate::models::ParticleBlock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// `[min, max]` per axis, padding included.
    pub limits: [[f32; 2]; 3],
    pub center: [f32; 3],
    pub extent: [f32; 3],
}

fn ensure_spatial(block: &ParticleBlock) -> Result<()> {
    if block.width() != 3 {
        return Err(Error::NotSpatial(block.block));
    }
    Ok(())
}

/// Smallest box holding the rows whose identifier is in `ids`, grown by
/// `padding` on each side. `None` when no identifier matches.
pub fn bounding_box(
    block: &ParticleBlock,
    ids: &[u64],
    sorter: Option<Sorter>,
    padding: [f32; 3],
) -> Result<(Option<BoundingBox>, Sorter)> {
    ensure_spatial(block)?;
    let (rows, sorter) = filter_by_ids(block, ids, sorter)?;
    if rows.is_empty() {
        return Ok((None, sorter));
    }

    let mut limits = [[f32::INFINITY, f32::NEG_INFINITY]; 3];
    for (_, row) in rows.rows() {
        for axis in 0..3 {
            limits[axis][0] = limits[axis][0].min(row[axis]);
            limits[axis][1] = limits[axis][1].max(row[axis]);
        }
    }
    let mut center = [0f32; 3];
    let mut extent = [0f32; 3];
    for axis in 0..3 {
        limits[axis][0] -= padding[axis];
        limits[axis][1] += padding[axis];
        center[axis] = (limits[axis][0] + limits[axis][1]) / 2.0;
        extent[axis] = limits[axis][1] - limits[axis][0];
    }

    Ok((
        Some(BoundingBox {
            limits,
            center,
            extent,
        }),
        sorter,
    ))
}

/// Rows strictly inside the box `center ± half_extent`, in block order.
pub fn region(block: &ParticleBlock, center: [f32; 3], half_extent: [f32; 3]) -> Result<ParticleBlock> {
    ensure_spatial(block)?;
    let positions: Vec<usize> = block
        .rows()
        .enumerate()
        .filter(|(_, (_, row))| {
            (0..3).all(|axis| {
                row[axis] > center[axis] - half_extent[axis]
                    && row[axis] < center[axis] + half_extent[axis]
            })
        })
        .map(|(i, _)| i)
        .collect();
    Ok(block.select(&positions))
}
