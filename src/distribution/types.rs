//! The mutable assignment of an item collection to K bins.

use rand::Rng;

use crate::item::ItemId;

/// A full assignment of items to bins.
///
/// Bins are addressed by index for mutation bookkeeping, but bin order
/// carries no meaning to the constraints. The multiset union of all
/// bins always equals the input item collection; the operators in this
/// module and in [`crate::delta`] preserve that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    bins: Vec<Vec<ItemId>>,
}

impl Distribution {
    /// Builds a distribution by dealing items round-robin across bins.
    pub fn even(ids: &[ItemId], bin_count: usize) -> Self {
        assert!(bin_count > 0, "bin count must be at least 1");
        let mut bins = vec![Vec::new(); bin_count];
        for (i, &id) in ids.iter().enumerate() {
            bins[i % bin_count].push(id);
        }
        Self { bins }
    }

    /// Builds a distribution by placing each item in a uniformly random
    /// bin. Bins may come out empty; the search fixes that up over
    /// generations and conversion refuses empty bins.
    pub fn random<R: Rng>(ids: &[ItemId], bin_count: usize, rng: &mut R) -> Self {
        assert!(bin_count > 0, "bin count must be at least 1");
        let mut bins = vec![Vec::new(); bin_count];
        for &id in ids {
            let bin = rng.random_range(0..bin_count);
            bins[bin].push(id);
        }
        Self { bins }
    }

    /// Wraps pre-built bins.
    pub fn from_bins(bins: Vec<Vec<ItemId>>) -> Self {
        assert!(!bins.is_empty(), "bin count must be at least 1");
        Self { bins }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[Vec<ItemId>] {
        &self.bins
    }

    pub(crate) fn bins_mut(&mut self) -> &mut Vec<Vec<ItemId>> {
        &mut self.bins
    }

    /// All item ids across all bins, in bin order.
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.bins.iter().flatten().copied()
    }

    pub fn item_count(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Bin index per item, indexed by the raw id value. `arena_len`
    /// bounds the lookup table; ids not present map to `None`.
    pub fn locate(&self, arena_len: usize) -> Vec<Option<usize>> {
        let mut located = vec![None; arena_len];
        for (bin_index, bin) in self.bins.iter().enumerate() {
            for id in bin {
                located[id.0 as usize] = Some(bin_index);
            }
        }
        located
    }
}
