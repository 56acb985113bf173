//! Dynamic memory allocation.
//!
//! A first-fit block allocator over host-grown linear memory. Pages are cut
//! into fixed blocks when acquired; requests larger than a block merge the
//! free blocks that follow their candidate.

pub mod allocator;
pub mod block;

pub use allocator::{
    AllocError, Allocation, AllocatorLogLevel, AllocatorLogRecord, BlockAllocator, HeapLimits,
    HeapStats,
};
pub use block::{BlockDescriptor, BlockId, SplitKind};

use sandlibc_membrane::PAGE_SIZE;

/// Pages the allocator may acquire.
pub const MAX_PAGE_COUNT: usize = 16;
/// Blocks a fresh page is cut into.
pub const BLOCKS_PER_PAGE: usize = 32;
/// Size of a freshly cut block.
pub const DEFAULT_BLOCK_SIZE: usize = PAGE_SIZE / BLOCKS_PER_PAGE;
/// Descriptor table capacity with the default limits.
pub const MAX_BLOCK_COUNT: usize = MAX_PAGE_COUNT * BLOCKS_PER_PAGE;
/// Bytes in front of every grant holding its block id.
pub const BLOCK_HEADER_SIZE: usize = 4;
