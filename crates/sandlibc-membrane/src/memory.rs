//! Simulated linear memory.
//!
//! A flat byte vector that only grows in [`PAGE_SIZE`] steps, the way a
//! wasm memory does. Growth past `max_pages` fails instead of reallocating
//! without bound.

use crate::host::PAGE_SIZE;

/// Page-granular growable byte store.
#[derive(Debug, Clone)]
pub struct PagedMemory {
    bytes: Vec<u8>,
    max_pages: usize,
}

impl PagedMemory {
    /// Creates a memory with `initial_pages` zeroed pages that may grow up to
    /// `max_pages`.
    #[must_use]
    pub fn new(initial_pages: usize, max_pages: usize) -> Self {
        let max_pages = max_pages.max(initial_pages);
        Self {
            bytes: vec![0; initial_pages * PAGE_SIZE],
            max_pages,
        }
    }

    /// Current size in pages.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.bytes.len() / PAGE_SIZE
    }

    /// Upper bound on [`Self::pages`].
    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Appends `pages` zeroed pages and returns the address of the first.
    pub fn grow(&mut self, pages: usize) -> Option<usize> {
        let next = self.pages().checked_add(pages)?;
        if next > self.max_pages {
            return None;
        }
        let base = self.bytes.len();
        self.bytes.resize(next * PAGE_SIZE, 0);
        Some(base)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_returns_old_end() {
        let mut mem = PagedMemory::new(1, 4);
        assert_eq!(mem.grow(2), Some(PAGE_SIZE));
        assert_eq!(mem.pages(), 3);
        assert_eq!(mem.as_slice().len(), 3 * PAGE_SIZE);
    }

    #[test]
    fn grow_past_limit_fails_without_side_effects() {
        let mut mem = PagedMemory::new(2, 3);
        assert_eq!(mem.grow(2), None);
        assert_eq!(mem.pages(), 2);
        assert_eq!(mem.grow(1), Some(2 * PAGE_SIZE));
        assert_eq!(mem.grow(1), None);
    }

    #[test]
    fn zero_page_growth_reports_current_size() {
        let mut mem = PagedMemory::new(1, 1);
        assert_eq!(mem.grow(0), Some(PAGE_SIZE));
    }

    #[test]
    fn max_never_below_initial() {
        let mem = PagedMemory::new(5, 1);
        assert_eq!(mem.max_pages(), 5);
    }
}
