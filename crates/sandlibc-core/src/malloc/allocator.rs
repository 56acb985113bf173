//! Core allocator state.
//!
//! Owns the descriptor table and the list of heap regions, asks the host
//! for pages, and hands out [`Allocation`] handles. Every decision is
//! appended to a bounded structured lifecycle log.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;

use sandlibc_membrane::{Diagnostic, Host, PAGE_SIZE};

use super::block::{BlockDescriptor, BlockId, BlockTable, Grant};
use super::{BLOCK_HEADER_SIZE, BLOCKS_PER_PAGE, MAX_PAGE_COUNT};

const LIFECYCLE_LOG_CAPACITY: usize = 4096;

/// Table and page bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapLimits {
    pub max_pages: usize,
    pub blocks_per_page: usize,
}

impl Default for HeapLimits {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGE_COUNT,
            blocks_per_page: BLOCKS_PER_PAGE,
        }
    }
}

impl HeapLimits {
    #[must_use]
    pub fn block_size(&self) -> usize {
        PAGE_SIZE / self.blocks_per_page.clamp(1, PAGE_SIZE)
    }

    #[must_use]
    pub fn max_blocks(&self) -> usize {
        self.max_pages.saturating_mul(self.blocks_per_page)
    }
}

/// Handle to a live grant.
///
/// Carries the block id next to the address, so release and resize look the
/// descriptor up directly instead of trusting bytes in front of `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    block: BlockId,
    addr: usize,
    len: usize,
}

impl Allocation {
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// First usable byte in linear memory.
    #[must_use]
    pub const fn addr(&self) -> usize {
        self.addr
    }

    /// Usable bytes. At least the requested size.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.addr..self.addr + self.len
    }
}

/// Allocation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("heap exhausted while looking for {requested} bytes")]
    Exhausted { requested: usize },
    #[error("allocation size overflows")]
    Overflow,
    #[error(transparent)]
    Misuse(#[from] Diagnostic),
}

/// Heap occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub pages: usize,
    pub descriptors: usize,
    pub holes: usize,
    pub active_blocks: usize,
    /// Bytes covered by used blocks, headers included.
    pub used_bytes: usize,
    /// Bytes covered by free blocks.
    pub free_bytes: usize,
}

/// Allocator lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl AllocatorLogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Structured allocator lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorLogRecord {
    /// Monotonic decision/event id.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    /// Severity level.
    pub level: AllocatorLogLevel,
    /// API symbol (`malloc`, `free`, `calloc`, `realloc`).
    pub symbol: &'static str,
    /// Event kind (`alloc`, `free`, `add_pages`, ...).
    pub event: &'static str,
    /// Usable address involved in the event.
    pub addr: Option<usize>,
    /// Size value involved in the event.
    pub size: Option<usize>,
    /// Block id involved in the event.
    pub block: Option<u32>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details for debugging.
    pub details: String,
    /// Snapshot: used blocks.
    pub active_blocks: usize,
    /// Snapshot: bytes in used blocks.
    pub used_bytes: usize,
    /// Snapshot: pages acquired.
    pub pages: usize,
    /// Snapshot: descriptors created.
    pub descriptors: usize,
}

#[derive(Debug, Clone, Copy)]
struct Region {
    start: usize,
    len: usize,
    pages: usize,
}

impl Region {
    fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.start + self.len
    }
}

/// Block allocator state.
pub struct BlockAllocator {
    limits: HeapLimits,
    table: BlockTable,
    regions: Vec<Region>,
    /// Usable address -> block of every live grant.
    live: HashMap<usize, BlockId>,
    next_decision_id: u64,
    lifecycle_logs: VecDeque<AllocatorLogRecord>,
}

impl BlockAllocator {
    #[must_use]
    pub fn new(limits: HeapLimits) -> Self {
        Self {
            limits,
            table: BlockTable::new(limits.max_blocks()),
            regions: Vec::new(),
            live: HashMap::new(),
            next_decision_id: 1,
            lifecycle_logs: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn limits(&self) -> HeapLimits {
        self.limits
    }

    fn pages_acquired(&self) -> usize {
        self.regions.iter().map(|r| r.pages).sum()
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            pages: self.pages_acquired(),
            descriptors: self.table.len(),
            ..HeapStats::default()
        };
        for (_, desc) in self.table.iter() {
            if desc.is_hole() {
                stats.holes += 1;
            } else if desc.used {
                stats.active_blocks += 1;
                stats.used_bytes += desc.size;
            } else {
                stats.free_bytes += desc.size;
            }
        }
        stats
    }

    fn next_log_decision_id(&mut self) -> u64 {
        let id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        id
    }

    fn record_lifecycle(
        &mut self,
        level: AllocatorLogLevel,
        symbol: &'static str,
        event: &'static str,
        addr: Option<usize>,
        size: Option<usize>,
        block: Option<BlockId>,
        outcome: &'static str,
        details: impl Into<String>,
    ) {
        let decision_id = self.next_log_decision_id();
        let trace_id = format!("core::malloc::{}::{:016x}", symbol, decision_id);
        let stats = self.stats();
        if self.lifecycle_logs.len() == LIFECYCLE_LOG_CAPACITY {
            self.lifecycle_logs.pop_front();
        }
        self.lifecycle_logs.push_back(AllocatorLogRecord {
            decision_id,
            trace_id,
            level,
            symbol,
            event,
            addr,
            size,
            block: block.map(BlockId::raw),
            outcome,
            details: details.into(),
            active_blocks: stats.active_blocks,
            used_bytes: stats.used_bytes,
            pages: stats.pages,
            descriptors: stats.descriptors,
        });
    }

    /// Returns a view of allocator lifecycle log records, oldest first.
    pub fn lifecycle_logs(&self) -> impl Iterator<Item = &AllocatorLogRecord> {
        self.lifecycle_logs.iter()
    }

    /// Drains allocator lifecycle log records.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<AllocatorLogRecord> {
        self.lifecycle_logs.drain(..).collect()
    }

    /// Descriptor for `id`, if it exists.
    #[must_use]
    pub fn descriptor(&self, id: BlockId) -> Option<BlockDescriptor> {
        self.table.get(id).copied()
    }

    /// Number of live grants.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live grants in address order.
    #[must_use]
    pub fn live_allocations(&self) -> Vec<Allocation> {
        let mut out: Vec<Allocation> = self
            .live
            .iter()
            .filter_map(|(&addr, &block)| self.handle_for(block, addr))
            .collect();
        out.sort_by_key(Allocation::addr);
        out
    }

    fn handle_for(&self, block: BlockId, addr: usize) -> Option<Allocation> {
        let desc = self.table.get(block)?;
        Some(Allocation {
            block,
            addr,
            len: desc.size.saturating_sub(BLOCK_HEADER_SIZE),
        })
    }

    fn in_heap(&self, addr: usize) -> bool {
        self.regions.iter().any(|r| r.contains(addr))
    }

    /// Acquires a region large enough for `need` bytes and cuts it into
    /// blocks. The first region starts at the host heap base and reuses the
    /// rest of the memory already mapped there.
    fn add_pages_for<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        symbol: &'static str,
        need: usize,
    ) -> Result<(), AllocError> {
        let block_size = self.limits.block_size();
        let (fixed_start, tail, grow) = if self.regions.is_empty() {
            let base = host.heap_base_address();
            let tail = host.memory().len().saturating_sub(base);
            (Some(base), tail, need.saturating_sub(tail).div_ceil(PAGE_SIZE))
        } else {
            (None, 0, need.div_ceil(PAGE_SIZE))
        };
        let len = tail + grow * PAGE_SIZE;
        let pages = len.div_ceil(PAGE_SIZE);

        if self.pages_acquired() + pages > self.limits.max_pages {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                symbol,
                "add_pages",
                None,
                Some(need),
                None,
                "page_limit",
                format!(
                    "pages={} requested={} max_pages={}",
                    self.pages_acquired(),
                    pages,
                    self.limits.max_pages
                ),
            );
            return Err(AllocError::Exhausted { requested: need });
        }
        let blocks = BlockTable::blocks_for_region(len, block_size);
        if self.table.len() + blocks > self.table.capacity() {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                symbol,
                "add_pages",
                None,
                Some(need),
                None,
                "descriptor_limit",
                format!(
                    "descriptors={} requested={} capacity={}",
                    self.table.len(),
                    blocks,
                    self.table.capacity()
                ),
            );
            return Err(AllocError::Exhausted { requested: need });
        }

        let region = match (fixed_start, grow) {
            (Some(start), 0) => Region { start, len, pages },
            (fixed, _) => {
                let Some(base) = host.grow_linear_memory(grow) else {
                    self.record_lifecycle(
                        AllocatorLogLevel::Warn,
                        symbol,
                        "add_pages",
                        None,
                        Some(need),
                        None,
                        "host_refused",
                        format!("grow_pages={}", grow),
                    );
                    return Err(AllocError::Exhausted { requested: need });
                };
                match fixed {
                    Some(start) if start + tail == base => Region { start, len, pages },
                    _ => Region {
                        start: base,
                        len: grow * PAGE_SIZE,
                        pages: grow,
                    },
                }
            }
        };

        let Some(range) = self.table.append_region(region.start, region.len, block_size) else {
            self.record_lifecycle(
                AllocatorLogLevel::Error,
                symbol,
                "add_pages",
                Some(region.start),
                Some(region.len),
                None,
                "descriptor_limit",
                "region_cut_rejected",
            );
            return Err(AllocError::Exhausted { requested: need });
        };
        self.regions.push(region);
        self.record_lifecycle(
            AllocatorLogLevel::Info,
            symbol,
            "add_pages",
            Some(region.start),
            Some(region.len),
            None,
            "success",
            format!(
                "grow_pages={} region_pages={} blocks={}..{}",
                grow, region.pages, range.start, range.end
            ),
        );
        Ok(())
    }

    /// Scans the whole table, acquiring pages and rescanning once if nothing
    /// fits.
    fn search_growing<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        symbol: &'static str,
        need: usize,
    ) -> Result<Grant, AllocError> {
        if let Some(grant) = self.table.find(0, usize::MAX, need) {
            return Ok(grant);
        }
        self.add_pages_for(host, symbol, need)?;
        self.table
            .find(0, usize::MAX, need)
            .ok_or(AllocError::Exhausted { requested: need })
    }

    /// Stamps the header and registers the grant.
    fn commit<H: Host + ?Sized>(&mut self, host: &mut H, grant: Grant) -> Option<Allocation> {
        let desc = *self.table.get(grant.id)?;
        let addr = desc.start + BLOCK_HEADER_SIZE;
        if let Some(header) = host.memory_mut().get_mut(desc.start..addr) {
            header.copy_from_slice(&grant.id.raw().to_le_bytes());
        }
        self.live.insert(addr, grant.id);
        self.handle_for(grant.id, addr)
    }

    /// Allocates at least `size` usable bytes.
    pub fn allocate<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        size: usize,
    ) -> Result<Allocation, AllocError> {
        self.allocate_as(host, "malloc", size)
    }

    fn allocate_as<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        symbol: &'static str,
        size: usize,
    ) -> Result<Allocation, AllocError> {
        let Some(need) = size.checked_add(BLOCK_HEADER_SIZE) else {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                symbol,
                "size_overflow",
                None,
                Some(size),
                None,
                "denied",
                "size_plus_header_overflows",
            );
            return Err(AllocError::Overflow);
        };

        let grant = match self.search_growing(host, symbol, need) {
            Ok(grant) => grant,
            Err(err) => {
                self.record_lifecycle(
                    AllocatorLogLevel::Warn,
                    symbol,
                    "alloc",
                    None,
                    Some(size),
                    None,
                    "oom",
                    format!("need={}", need),
                );
                return Err(err);
            }
        };
        let Some(alloc) = self.commit(host, grant) else {
            return Err(AllocError::Exhausted { requested: need });
        };
        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            symbol,
            "alloc",
            Some(alloc.addr),
            Some(size),
            Some(grant.id),
            "success",
            format!("split={} merged={}", grant.split.as_str(), grant.merged),
        );
        Ok(alloc)
    }

    /// Allocates `count * size` zeroed bytes.
    pub fn calloc<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
        size: usize,
    ) -> Result<Allocation, AllocError> {
        let Some(total) = count.checked_mul(size) else {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "calloc",
                "calloc_overflow",
                None,
                None,
                None,
                "denied",
                format!("count={} size={}", count, size),
            );
            return Err(AllocError::Overflow);
        };
        let alloc = self.allocate_as(host, "calloc", total)?;
        if let Some(bytes) = host.memory_mut().get_mut(alloc.range()) {
            bytes.fill(0);
        }
        Ok(alloc)
    }

    /// Checks that `alloc` names a live grant.
    fn validate(&self, op: &'static str, alloc: Allocation) -> Result<BlockDescriptor, Diagnostic> {
        let Some(desc) = self.table.get(alloc.block) else {
            return Err(Diagnostic::PointerOutOfBounds {
                op,
                addr: alloc.addr,
            });
        };
        if desc.start + BLOCK_HEADER_SIZE != alloc.addr || desc.size == 0 {
            return Err(Diagnostic::InvalidPointer {
                op,
                addr: alloc.addr,
            });
        }
        if !desc.used {
            return Err(if op == "free" {
                Diagnostic::DoubleRelease {
                    addr: alloc.addr,
                    block: alloc.block.raw(),
                }
            } else {
                Diagnostic::InvalidPointer {
                    op,
                    addr: alloc.addr,
                }
            });
        }
        Ok(*desc)
    }

    /// Resolves a raw usable address to its live grant.
    pub fn lookup_address(&self, op: &'static str, addr: usize) -> Result<Allocation, Diagnostic> {
        if let Some(&block) = self.live.get(&addr)
            && let Some(alloc) = self.handle_for(block, addr)
        {
            return Ok(alloc);
        }
        if !self.in_heap(addr) {
            return Err(Diagnostic::PointerOutOfBounds { op, addr });
        }
        let released = self
            .table
            .iter()
            .find(|(_, d)| d.size > 0 && d.start + BLOCK_HEADER_SIZE == addr);
        match released {
            Some((block, _)) if op == "free" => Err(Diagnostic::DoubleRelease {
                addr,
                block: block.raw(),
            }),
            _ => Err(Diagnostic::InvalidPointer { op, addr }),
        }
    }

    /// Returns a grant to the free pool.
    pub fn release(&mut self, alloc: Allocation) -> Result<(), AllocError> {
        if let Err(diag) = self.validate("free", alloc) {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "free",
                diag.label(),
                Some(alloc.addr),
                None,
                Some(alloc.block),
                "ignored",
                diag.to_string(),
            );
            return Err(diag.into());
        }
        self.table.clear_used(alloc.block);
        self.live.remove(&alloc.addr);
        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "free",
            "free",
            Some(alloc.addr),
            Some(alloc.len),
            Some(alloc.block),
            "success",
            "",
        );
        Ok(())
    }

    /// Releases by raw address. Address 0 is a no-op.
    pub fn release_address(&mut self, addr: usize) -> Result<(), AllocError> {
        if addr == 0 {
            self.record_lifecycle(
                AllocatorLogLevel::Trace,
                "free",
                "free_null",
                Some(addr),
                None,
                None,
                "noop",
                "null_pointer",
            );
            return Ok(());
        }
        match self.lookup_address("free", addr) {
            Ok(alloc) => self.release(alloc),
            Err(diag) => {
                self.record_lifecycle(
                    AllocatorLogLevel::Warn,
                    "free",
                    diag.label(),
                    Some(addr),
                    None,
                    None,
                    "ignored",
                    diag.to_string(),
                );
                Err(diag.into())
            }
        }
    }

    /// Resizes a grant to at least `size` usable bytes.
    ///
    /// `None` allocates. A grant that already fits is returned unchanged.
    /// Otherwise the replacement is searched forward from the current block
    /// (which may extend it in place), then across the whole table, then
    /// with page growth. The first `min(old, size)` bytes move along. On
    /// failure the original grant is left intact.
    pub fn resize<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        current: Option<Allocation>,
        size: usize,
    ) -> Result<Allocation, AllocError> {
        let Some(current) = current else {
            return self.allocate_as(host, "realloc", size);
        };
        let old = match self.validate("realloc", current) {
            Ok(desc) => desc,
            Err(diag) => {
                self.record_lifecycle(
                    AllocatorLogLevel::Warn,
                    "realloc",
                    diag.label(),
                    Some(current.addr),
                    Some(size),
                    Some(current.block),
                    "ignored",
                    diag.to_string(),
                );
                return Err(diag.into());
            }
        };
        let Some(need) = size.checked_add(BLOCK_HEADER_SIZE) else {
            return Err(AllocError::Overflow);
        };
        if old.size >= need {
            self.record_lifecycle(
                AllocatorLogLevel::Trace,
                "realloc",
                "realloc_fits",
                Some(current.addr),
                Some(size),
                Some(current.block),
                "success",
                format!("block_size={}", old.size),
            );
            return Ok(current);
        }

        self.table.clear_used(current.block);
        let found = if let Some(grant) = self.table.find(current.block.index(), usize::MAX, need) {
            Some((grant, "forward"))
        } else if let Some(grant) = self.table.find(0, usize::MAX, need) {
            Some((grant, "full_scan"))
        } else if self.add_pages_for(host, "realloc", need).is_ok() {
            self.table
                .find(0, usize::MAX, need)
                .map(|grant| (grant, "grown"))
        } else {
            None
        };
        let Some((grant, window)) = found else {
            self.table.set_used(current.block);
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "realloc",
                "realloc",
                Some(current.addr),
                Some(size),
                Some(current.block),
                "oom",
                format!("need={}", need),
            );
            return Err(AllocError::Exhausted { requested: need });
        };

        let Some(new_desc) = self.table.get(grant.id).copied() else {
            return Err(AllocError::Exhausted { requested: need });
        };
        let new_addr = new_desc.start + BLOCK_HEADER_SIZE;
        let keep = (old.size - BLOCK_HEADER_SIZE).min(size);
        let direction = match new_addr.cmp(&current.addr) {
            std::cmp::Ordering::Less => "down",
            std::cmp::Ordering::Equal => "in_place",
            std::cmp::Ordering::Greater => "up",
        };
        let memory = host.memory_mut();
        if current.addr + keep <= memory.len() && new_addr + keep <= memory.len() {
            memory.copy_within(current.addr..current.addr + keep, new_addr);
        }
        self.live.remove(&current.addr);
        let Some(alloc) = self.commit(host, grant) else {
            return Err(AllocError::Exhausted { requested: need });
        };
        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "realloc",
            "realloc_move",
            Some(alloc.addr),
            Some(size),
            Some(grant.id),
            "success",
            format!(
                "old_addr={} old_block={} window={} direction={} copied={} split={}",
                current.addr,
                current.block,
                window,
                direction,
                keep,
                grant.split.as_str()
            ),
        );
        Ok(alloc)
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new(HeapLimits::default())
    }
}
