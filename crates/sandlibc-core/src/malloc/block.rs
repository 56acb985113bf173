//! Block descriptor table.
//!
//! Every region of heap memory is cut into fixed-size blocks when it is
//! acquired. Descriptors are addressed by [`BlockId`] and are never removed:
//! a block is recycled between used and free, or, once its bytes have been
//! absorbed into a neighbour by a merge, it becomes a size-0 hole that a
//! later split can fill with a remainder.
//!
//! Ids of sized descriptors are in address order. Merges only absorb
//! descriptors that follow the candidate, and splits only write into the hole
//! immediately before or after it, so the ordering is preserved.

use std::collections::BTreeMap;
use std::fmt;

use sandlibc_membrane::PAGE_SIZE;

/// Index of a descriptor in the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One allocation unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Address of the first byte (header included).
    pub start: usize,
    /// Bytes covered, header included. Zero for holes.
    pub size: usize,
    /// Linear-memory page holding `start`.
    pub page: usize,
    /// Occupancy flag.
    pub used: bool,
}

impl BlockDescriptor {
    /// Free descriptor with no bytes: a slot a split remainder can move into.
    #[must_use]
    pub const fn is_hole(&self) -> bool {
        !self.used && self.size == 0
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }
}

/// How a grant was carved out of its candidate block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Candidate matched exactly.
    Exact,
    /// The hole before the candidate took the low bytes.
    Before,
    /// The hole after the candidate took the remainder.
    After,
    /// No hole was available; the whole candidate was granted.
    Unsplit,
}

impl SplitKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Before => "split_before",
            Self::After => "split_after",
            Self::Unsplit => "unsplit",
        }
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub id: BlockId,
    /// Sized descriptors absorbed into the candidate.
    pub merged: usize,
    pub split: SplitKind,
}

/// Fixed-capacity descriptor arena.
#[derive(Debug, Clone)]
pub struct BlockTable {
    descs: Vec<BlockDescriptor>,
    capacity: usize,
    /// Sized descriptors per page.
    page_blocks: BTreeMap<usize, usize>,
}

impl BlockTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            descs: Vec::with_capacity(capacity),
            capacity,
            page_blocks: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&BlockDescriptor> {
        self.descs.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockDescriptor)> {
        self.descs
            .iter()
            .enumerate()
            .map(|(i, d)| (BlockId(i as u32), d))
    }

    /// Sized descriptors whose start lies on `page`.
    #[must_use]
    pub fn blocks_on_page(&self, page: usize) -> usize {
        self.page_blocks.get(&page).copied().unwrap_or(0)
    }

    /// Number of descriptors a region of `len` bytes is cut into.
    #[must_use]
    pub fn blocks_for_region(len: usize, block_size: usize) -> usize {
        if len == 0 {
            0
        } else {
            (len / block_size.max(1)).max(1)
        }
    }

    /// Cuts `[start, start + len)` into `block_size` blocks and appends their
    /// descriptors. A tail shorter than one block is folded into the last
    /// block. Returns `None`, leaving the table untouched, when the
    /// descriptors would not fit.
    pub fn append_region(
        &mut self,
        start: usize,
        len: usize,
        block_size: usize,
    ) -> Option<std::ops::Range<usize>> {
        let count = Self::blocks_for_region(len, block_size);
        if self.descs.len() + count > self.capacity {
            return None;
        }
        let first = self.descs.len();
        for i in 0..count {
            let block_start = start + i * block_size;
            let size = if i + 1 == count {
                len - i * block_size
            } else {
                block_size
            };
            self.push(BlockDescriptor {
                start: block_start,
                size,
                page: block_start / PAGE_SIZE,
                used: false,
            });
        }
        Some(first..self.descs.len())
    }

    fn push(&mut self, desc: BlockDescriptor) {
        self.track(desc.page, true);
        self.descs.push(desc);
    }

    fn track(&mut self, page: usize, add: bool) {
        let count = self.page_blocks.entry(page).or_insert(0);
        if add {
            *count += 1;
        } else {
            *count = count.saturating_sub(1);
        }
    }

    /// First-fit search over candidates `start..end` for `need` bytes.
    ///
    /// A free candidate that is too small tries to absorb the descriptors
    /// following it; a candidate that is too large is split when a hole is
    /// adjacent. The grant is marked used.
    pub fn find(&mut self, start: usize, end: usize, need: usize) -> Option<Grant> {
        let end = end.min(self.descs.len());
        let mut id = start;
        while id < end {
            let desc = self.descs[id];
            if desc.used || desc.size == 0 {
                id += 1;
                continue;
            }
            let mut merged = 0;
            if desc.size < need {
                match self.merge(id, need) {
                    Some(n) => merged = n,
                    None => {
                        id += 1;
                        continue;
                    }
                }
            }
            let (granted, split) = self.split(id, need);
            self.descs[granted].used = true;
            return Some(Grant {
                id: BlockId(granted as u32),
                merged,
                split,
            });
        }
        None
    }

    /// Grows descriptor `id` by absorbing the free descriptors after it until
    /// it covers `need` bytes. Holes are skipped over; sized blocks must start
    /// exactly where the run ends. Nothing changes unless the run suffices.
    fn merge(&mut self, id: usize, need: usize) -> Option<usize> {
        let mut total = self.descs[id].size;
        let mut run_end = self.descs[id].end();
        let mut next = id + 1;
        while total < need && next < self.descs.len() {
            let desc = self.descs[next];
            if desc.used {
                break;
            }
            if desc.size > 0 {
                if desc.start != run_end {
                    break;
                }
                total += desc.size;
                run_end = desc.end();
            }
            next += 1;
        }
        if total < need {
            return None;
        }

        let mut absorbed = 0;
        for k in id + 1..next {
            let desc = self.descs[k];
            if desc.size == 0 {
                continue;
            }
            self.track(desc.page, false);
            self.descs[k] = BlockDescriptor {
                page: desc.page,
                ..BlockDescriptor::default()
            };
            absorbed += 1;
        }
        self.descs[id].size = total;
        Some(absorbed)
    }

    fn split(&mut self, id: usize, need: usize) -> (usize, SplitKind) {
        let desc = self.descs[id];
        if desc.size == need {
            return (id, SplitKind::Exact);
        }
        if id > 0 && self.descs[id - 1].is_hole() {
            let hole = id - 1;
            let remainder_start = desc.start + need;
            self.descs[hole] = BlockDescriptor {
                start: desc.start,
                size: need,
                page: desc.page,
                used: false,
            };
            self.track(desc.page, true);
            self.track(desc.page, false);
            self.descs[id] = BlockDescriptor {
                start: remainder_start,
                size: desc.size - need,
                page: remainder_start / PAGE_SIZE,
                used: false,
            };
            self.track(remainder_start / PAGE_SIZE, true);
            return (hole, SplitKind::Before);
        }
        if id + 1 < self.descs.len() && self.descs[id + 1].is_hole() {
            let remainder_start = desc.start + need;
            self.descs[id + 1] = BlockDescriptor {
                start: remainder_start,
                size: desc.size - need,
                page: remainder_start / PAGE_SIZE,
                used: false,
            };
            self.track(remainder_start / PAGE_SIZE, true);
            self.descs[id].size = need;
            return (id, SplitKind::After);
        }
        (id, SplitKind::Unsplit)
    }

    /// Marks `id` free. Returns the previous occupancy.
    pub fn clear_used(&mut self, id: BlockId) -> bool {
        match self.descs.get_mut(id.index()) {
            Some(desc) => std::mem::replace(&mut desc.used, false),
            None => false,
        }
    }

    pub fn set_used(&mut self, id: BlockId) {
        if let Some(desc) = self.descs.get_mut(id.index()) {
            desc.used = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: usize = 2048;

    fn table_with_blocks(n: usize) -> BlockTable {
        let mut table = BlockTable::new(64);
        table.append_region(PAGE_SIZE, n * BS, BS).unwrap();
        table
    }

    #[test]
    fn region_is_cut_into_blocks() {
        let mut table = BlockTable::new(64);
        let range = table.append_region(PAGE_SIZE, 3 * BS + 100, BS).unwrap();
        assert_eq!(range, 0..3);
        let last = table.get(BlockId(2)).unwrap();
        assert_eq!(last.start, PAGE_SIZE + 2 * BS);
        assert_eq!(last.size, BS + 100);
        assert_eq!(table.blocks_on_page(1), 3);
    }

    #[test]
    fn short_region_becomes_one_block() {
        let mut table = BlockTable::new(4);
        table.append_region(100, 40, BS).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(BlockId(0)).unwrap().size, 40);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut table = BlockTable::new(2);
        assert!(table.append_region(0, 3 * BS, BS).is_none());
        assert!(table.is_empty());
        assert!(table.append_region(0, 2 * BS, BS).is_some());
    }

    #[test]
    fn first_fit_is_lowest_free_id() {
        let mut table = table_with_blocks(4);
        let a = table.find(0, usize::MAX, 100).unwrap();
        let b = table.find(0, usize::MAX, 100).unwrap();
        assert_eq!(a.id, BlockId(0));
        assert_eq!(b.id, BlockId(1));
        assert_eq!(a.split, SplitKind::Unsplit);
        table.clear_used(a.id);
        assert_eq!(table.find(0, usize::MAX, 100).unwrap().id, BlockId(0));
    }

    #[test]
    fn merge_absorbs_following_blocks() {
        let mut table = table_with_blocks(4);
        let grant = table.find(0, usize::MAX, 3 * BS).unwrap();
        assert_eq!(grant.id, BlockId(0));
        assert_eq!(grant.merged, 2);
        assert_eq!(grant.split, SplitKind::Exact);
        assert_eq!(table.get(BlockId(0)).unwrap().size, 3 * BS);
        assert!(table.get(BlockId(1)).unwrap().is_hole());
        assert!(table.get(BlockId(2)).unwrap().is_hole());
        assert_eq!(table.blocks_on_page(1), 2);
    }

    #[test]
    fn merge_stops_at_used_block_and_search_moves_on() {
        let mut table = table_with_blocks(4);
        let first = table.find(0, usize::MAX, 10).unwrap();
        let second = table.find(0, usize::MAX, 10).unwrap();
        table.clear_used(first.id);
        // Block 0 cannot grow past block 1, so blocks 2 and 3 are merged.
        let grant = table.find(0, usize::MAX, BS + 1).unwrap();
        assert_eq!(second.id, BlockId(1));
        assert_eq!(grant.id, BlockId(2));
        assert_eq!(grant.merged, 1);
    }

    #[test]
    fn failed_merge_leaves_table_untouched() {
        let mut table = table_with_blocks(2);
        let before = table.clone();
        assert!(table.find(0, usize::MAX, 3 * BS).is_none());
        assert_eq!(
            table.iter().map(|(_, d)| *d).collect::<Vec<_>>(),
            before.iter().map(|(_, d)| *d).collect::<Vec<_>>()
        );
    }

    #[test]
    fn remainder_moves_into_following_hole() {
        let mut table = table_with_blocks(4);
        let big = table.find(0, usize::MAX, 2 * BS).unwrap();
        assert_eq!(big.merged, 1);
        table.clear_used(big.id);
        // Block 1 is now a hole right after block 0.
        let small = table.find(0, usize::MAX, 100).unwrap();
        assert_eq!(small.id, BlockId(0));
        assert_eq!(small.split, SplitKind::After);
        let rest = table.get(BlockId(1)).unwrap();
        assert_eq!(rest.start, PAGE_SIZE + 100);
        assert_eq!(rest.size, 2 * BS - 100);
        assert!(!rest.used);
    }

    #[test]
    fn low_bytes_move_into_preceding_hole() {
        let mut table = table_with_blocks(4);
        let a = table.find(0, usize::MAX, 2 * BS).unwrap();
        assert_eq!(a.split, SplitKind::Exact);
        assert!(table.get(BlockId(1)).unwrap().is_hole());

        let b = table.find(0, usize::MAX, 500).unwrap();
        assert_eq!(b.id, BlockId(1));
        assert_eq!(b.split, SplitKind::Before);
        let granted = *table.get(BlockId(1)).unwrap();
        let remainder = *table.get(BlockId(2)).unwrap();
        assert_eq!(granted.start, PAGE_SIZE + 2 * BS);
        assert_eq!(granted.size, 500);
        assert_eq!(granted.end(), remainder.start);
        assert_eq!(remainder.size, BS - 500);
        assert!(granted.used && !remainder.used);
    }

    #[test]
    fn holes_are_never_candidates() {
        let mut table = table_with_blocks(3);
        let big = table.find(0, usize::MAX, 3 * BS).unwrap();
        assert_eq!(big.merged, 2);
        assert!(table.find(1, usize::MAX, 1).is_none());
    }

    #[test]
    fn clear_used_reports_previous_state() {
        let mut table = table_with_blocks(1);
        let a = table.find(0, 1, 8).unwrap();
        assert!(table.clear_used(a.id));
        assert!(!table.clear_used(a.id));
        assert!(!table.clear_used(BlockId(40)));
    }
}
