//! Heap entry points: `malloc`, `calloc`, `realloc`, `free`.
//!
//! Pointers are linear-memory addresses; 0 is the null pointer. Failures
//! return 0 and leave `errno` set by the runtime.

use sandlibc_membrane::Host;

use crate::runtime_state::with_runtime;

/// `malloc`. Address of at least `size` usable bytes, or 0.
pub fn malloc(size: usize) -> usize {
    with_runtime(|rt| rt.malloc(size).map_or(0, |g| g.addr())).unwrap_or(0)
}

/// `calloc`. Zeroed `count * size` bytes, or 0.
pub fn calloc(count: usize, size: usize) -> usize {
    with_runtime(|rt| rt.calloc(count, size).map_or(0, |g| g.addr())).unwrap_or(0)
}

/// `realloc`. 0 as `addr` allocates; on failure the old block stays valid.
pub fn realloc(addr: usize, size: usize) -> usize {
    with_runtime(|rt| rt.realloc_address(addr, size)).unwrap_or(0)
}

/// `free`. 0 is a no-op; foreign and released addresses are reported.
pub fn free(addr: usize) {
    // Reentrant frees are dropped: the block stays live.
    let _ = with_runtime(|rt| rt.free_address(addr));
}

/// Copies `bytes` into linear memory at `addr`. Returns the count copied,
/// clamped to memory.
pub fn poke(addr: usize, bytes: &[u8]) -> usize {
    with_runtime(|rt| {
        let memory = rt.host_mut().memory_mut();
        let Some(dest) = memory.get_mut(addr..) else {
            return 0;
        };
        let n = bytes.len().min(dest.len());
        dest[..n].copy_from_slice(&bytes[..n]);
        n
    })
    .unwrap_or(0)
}

/// Copies up to `len` bytes of linear memory at `addr`.
pub fn peek(addr: usize, len: usize) -> Vec<u8> {
    with_runtime(|rt| {
        let memory = rt.host().memory();
        let end = addr.saturating_add(len).min(memory.len());
        memory.get(addr..end).map(<[u8]>::to_vec).unwrap_or_default()
    })
    .unwrap_or_default()
}
