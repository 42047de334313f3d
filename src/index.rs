//! Identifier lookups over decoded blocks.
//!
//! Block rows are in file order, so identifiers are unsorted. A `Sorter`
//! holds the permutation that sorts a block's identifiers; computing it is
//! the expensive part of a lookup, and it can be handed back in for every
//! further query against the same block.

use std::collections::HashSet;

use log::trace;

use crate::error::{Error, Result};
use crate::models::ParticleBlock;

/// Row permutation that sorts a block's identifiers ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorter {
    perm: Vec<usize>,
}

impl Sorter {
    pub fn for_block(block: &ParticleBlock) -> Self {
        Self::for_ids(&block.ids)
    }

    pub fn for_ids(ids: &[u64]) -> Self {
        let mut perm: Vec<usize> = (0..ids.len()).collect();
        perm.sort_by_key(|&row| ids[row]);
        Self { perm }
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.perm
    }

    /// Row holding `id`, if any.
    pub fn find(&self, block_ids: &[u64], id: u64) -> Option<usize> {
        let i = self.perm.partition_point(|&row| block_ids[row] < id);
        self.perm.get(i).copied().filter(|&row| block_ids[row] == id)
    }
}

/// Keeps the rows of `block` whose identifier appears in `ids`.
///
/// Rows come back in the order of `ids`; identifiers that are not in the
/// block are dropped and repeated identifiers yield their row once. Pass
/// the returned `Sorter` back in to skip re-sorting on the next query.
pub fn filter_by_ids(
    block: &ParticleBlock,
    ids: &[u64],
    sorter: Option<Sorter>,
) -> Result<(ParticleBlock, Sorter)> {
    let sorter = match sorter {
        Some(s) if s.len() != block.len() => {
            return Err(Error::SorterMismatch {
                expected: block.len(),
                found: s.len(),
            });
        }
        Some(s) => s,
        None => Sorter::for_block(block),
    };

    let Some(&last) = sorter.perm.last() else {
        return Ok((block.select(&[]), sorter));
    };
    let max_id = block.ids[last];

    let mut taken = HashSet::new();
    let mut positions = Vec::new();
    for &id in ids.iter().filter(|&&id| id <= max_id) {
        if let Some(row) = sorter.find(&block.ids, id) {
            if taken.insert(row) {
                positions.push(row);
            }
        }
    }
    trace!(
        "{}/{}: {} of {} ids matched",
        block.block,
        block.particle_type,
        positions.len(),
        ids.len()
    );

    Ok((block.select(&positions), sorter))
}
