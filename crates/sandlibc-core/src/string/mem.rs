//! Memory operations: memcpy, memmove, memset, memcmp, memchr, memrchr.
//!
//! Each function clamps its count to the slices it is given.

use core::cmp::Ordering;

/// Bytes moved per step by [`memcpy`].
const WORD: usize = core::mem::size_of::<u64>();

/// Copies `n` bytes from `src` to `dest`, a machine word at a time with a
/// byte tail.
///
/// Only copies `min(n, src.len(), dest.len())` bytes and returns that count.
pub fn memcpy(dest: &mut [u8], src: &[u8], n: usize) -> usize {
    let count = n.min(dest.len()).min(src.len());
    let words = count / WORD * WORD;

    for (d, s) in dest[..words]
        .chunks_exact_mut(WORD)
        .zip(src[..words].chunks_exact(WORD))
    {
        d.copy_from_slice(s);
    }
    for (d, s) in dest[words..count].iter_mut().zip(&src[words..count]) {
        *d = *s;
    }
    count
}

/// Moves `n` bytes inside `buf` from offset `src` to offset `dest`.
///
/// The source is staged in a temporary copy first, so the ranges may
/// overlap. The count is clamped so both ranges stay inside `buf`; the
/// number of bytes moved is returned.
pub fn memmove(buf: &mut [u8], dest: usize, src: usize, n: usize) -> usize {
    let room = buf.len().saturating_sub(dest.max(src));
    let count = n.min(room);
    if count == 0 || dest == src {
        return count;
    }
    let staged = buf[src..src + count].to_vec();
    memcpy(&mut buf[dest..dest + count], &staged, count)
}

/// Fills the first `n` bytes of `dest` with `value`. Returns the count set.
pub fn memset(dest: &mut [u8], value: u8, n: usize) -> usize {
    let count = n.min(dest.len());
    dest[..count].fill(value);
    count
}

/// Compares the first `n` bytes of `a` and `b` as unsigned bytes.
pub fn memcmp(a: &[u8], b: &[u8], n: usize) -> Ordering {
    let count = n.min(a.len()).min(b.len());
    a[..count].cmp(&b[..count])
}

/// Index of the first `needle` in the first `n` bytes of `haystack`.
pub fn memchr(haystack: &[u8], needle: u8, n: usize) -> Option<usize> {
    let count = n.min(haystack.len());
    haystack[..count].iter().position(|&b| b == needle)
}

/// Index of the last `needle` in the first `n` bytes of `haystack`.
pub fn memrchr(haystack: &[u8], needle: u8, n: usize) -> Option<usize> {
    let count = n.min(haystack.len());
    haystack[..count].iter().rposition(|&b| b == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memcpy_words_and_tail() {
        let src: Vec<u8> = (0..19).collect();
        let mut dest = [0u8; 19];
        assert_eq!(memcpy(&mut dest, &src, 19), 19);
        assert_eq!(&dest[..], &src[..]);
    }

    #[test]
    fn memcpy_clamps_to_shorter_slice() {
        let mut dest = [0u8; 4];
        assert_eq!(memcpy(&mut dest, b"abcdefgh", 8), 4);
        assert_eq!(&dest, b"abcd");
        assert_eq!(memcpy(&mut dest, b"xy", 8), 2);
        assert_eq!(&dest, b"xycd");
    }

    #[test]
    fn memmove_forward_overlap() {
        let mut buf = *b"abcdefghij";
        assert_eq!(memmove(&mut buf, 2, 0, 6), 6);
        assert_eq!(&buf, b"ababcdefij");
    }

    #[test]
    fn memmove_backward_overlap() {
        let mut buf = *b"abcdefghij";
        assert_eq!(memmove(&mut buf, 0, 3, 7), 7);
        assert_eq!(&buf, b"defghijhij");
    }

    #[test]
    fn memmove_clamps_to_buffer() {
        let mut buf = *b"abcdef";
        assert_eq!(memmove(&mut buf, 4, 0, 10), 2);
        assert_eq!(&buf, b"abcdab");
        assert_eq!(memmove(&mut buf, 9, 0, 1), 0);
    }

    #[test]
    fn memset_fills() {
        let mut buf = [1u8; 5];
        assert_eq!(memset(&mut buf, 0xAB, 3), 3);
        assert_eq!(buf, [0xAB, 0xAB, 0xAB, 1, 1]);
    }

    #[test]
    fn memcmp_orders_unsigned() {
        assert_eq!(memcmp(b"abc", b"abc", 3), Ordering::Equal);
        assert_eq!(memcmp(b"abc", b"abd", 3), Ordering::Less);
        assert_eq!(memcmp(&[0x80], &[0x7f], 1), Ordering::Greater);
        assert_eq!(memcmp(b"abX", b"abY", 2), Ordering::Equal);
    }

    #[test]
    fn memchr_and_memrchr() {
        let hay = b"hello, world";
        assert_eq!(memchr(hay, b'o', hay.len()), Some(4));
        assert_eq!(memrchr(hay, b'o', hay.len()), Some(8));
        assert_eq!(memchr(hay, b'w', 5), None);
        assert_eq!(memrchr(hay, b'z', hay.len()), None);
    }
}
