//! NUL-terminated byte string operations.
//!
//! A string is the prefix of its slice up to the first NUL, or the whole
//! slice when it holds none. Searches report byte indices into the input.

/// The logical string held in `s`.
#[inline]
pub(crate) fn cstr(s: &[u8]) -> &[u8] {
    &s[..strlen(s)]
}

/// Length of the string in `s`, NUL excluded.
pub fn strlen(s: &[u8]) -> usize {
    s.iter().position(|&b| b == 0).unwrap_or(s.len())
}

/// Length of the string in `s`, looking at no more than `max` bytes.
pub fn strnlen(s: &[u8], max: usize) -> usize {
    strlen(&s[..max.min(s.len())])
}

/// Compares two strings as unsigned bytes.
///
/// Returns the difference of the first mismatching bytes (the terminator
/// counts as 0), or 0 when the strings are equal.
pub fn strcmp(s1: &[u8], s2: &[u8]) -> i32 {
    strncmp(s1, s2, usize::MAX)
}

/// [`strcmp`] over at most `n` bytes.
pub fn strncmp(s1: &[u8], s2: &[u8], n: usize) -> i32 {
    let (a, b) = (cstr(s1), cstr(s2));
    let mut i = 0;
    while i < n {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        if x != y {
            return i32::from(x) - i32::from(y);
        }
        if x == 0 {
            break;
        }
        i += 1;
    }
    0
}

/// Copies the string in `src`, terminator included, to the front of `dest`.
///
/// Returns the bytes written, NUL included.
///
/// # Panics
///
/// Panics if `dest` cannot hold the string and its terminator.
pub fn strcpy(dest: &mut [u8], src: &[u8]) -> usize {
    let src = cstr(src);
    assert!(
        dest.len() > src.len(),
        "strcpy: {} byte destination for a {} byte string",
        dest.len(),
        src.len()
    );
    dest[..src.len()].copy_from_slice(src);
    dest[src.len()] = 0;
    src.len() + 1
}

/// Copies at most `n` bytes of the string in `src` and pads the rest of the
/// first `n` bytes of `dest` with NULs.
///
/// When the string is `n` bytes or longer the result is not terminated.
/// Returns `min(n, dest.len())`.
pub fn strncpy(dest: &mut [u8], src: &[u8], n: usize) -> usize {
    let n = n.min(dest.len());
    let src = cstr(src);
    let copied = src.len().min(n);
    dest[..copied].copy_from_slice(&src[..copied]);
    dest[copied..n].fill(0);
    n
}

/// Appends the string in `src` after the string in `dest`.
///
/// Returns the length of the joined string.
///
/// # Panics
///
/// Panics if `dest` cannot hold the joined string and its terminator.
pub fn strcat(dest: &mut [u8], src: &[u8]) -> usize {
    let start = strlen(dest);
    start + strcpy(&mut dest[start..], src) - 1
}

/// Appends at most `n` bytes of the string in `src` and always terminates.
///
/// Returns the length of the joined string.
///
/// # Panics
///
/// Panics if `dest` is too small for the result.
pub fn strncat(dest: &mut [u8], src: &[u8], n: usize) -> usize {
    let start = strlen(dest);
    let src = cstr(src);
    let take = src.len().min(n);
    assert!(
        dest.len() > start + take,
        "strncat: {} byte destination for a {} byte result",
        dest.len(),
        start + take
    );
    dest[start..start + take].copy_from_slice(&src[..take]);
    dest[start + take] = 0;
    start + take
}

/// First occurrence of `c`. Searching for 0 finds the terminator position.
pub fn strchr(s: &[u8], c: u8) -> Option<usize> {
    let s = cstr(s);
    if c == 0 {
        return Some(s.len());
    }
    s.iter().position(|&b| b == c)
}

/// Last occurrence of `c`. Searching for 0 finds the terminator position.
pub fn strrchr(s: &[u8], c: u8) -> Option<usize> {
    let s = cstr(s);
    if c == 0 {
        return Some(s.len());
    }
    s.iter().rposition(|&b| b == c)
}

/// First occurrence of the string `needle` in the string `haystack`.
/// An empty needle matches at 0.
pub fn strstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let (haystack, needle) = (cstr(haystack), cstr(needle));
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the leading run of bytes that appear in `accept`.
pub fn strspn(s: &[u8], accept: &[u8]) -> usize {
    let accept = cstr(accept);
    cstr(s)
        .iter()
        .position(|b| !accept.contains(b))
        .unwrap_or_else(|| strlen(s))
}

/// Length of the leading run of bytes that do not appear in `reject`.
pub fn strcspn(s: &[u8], reject: &[u8]) -> usize {
    strpbrk(s, reject).unwrap_or_else(|| strlen(s))
}

/// First byte of `s` that appears in `accept`.
pub fn strpbrk(s: &[u8], accept: &[u8]) -> Option<usize> {
    let accept = cstr(accept);
    cstr(s).iter().position(|b| accept.contains(b))
}

/// Collation transform. In the C locale this is a bounded copy.
///
/// Writes at most `n` bytes, terminator included, and only when the whole
/// transformed string fits. Returns the transformed length, NUL excluded;
/// a result `>= n` means `dest` was left alone.
pub fn strxfrm(dest: &mut [u8], src: &[u8], n: usize) -> usize {
    let src = cstr(src);
    let n = n.min(dest.len());
    if src.len() < n {
        dest[..src.len()].copy_from_slice(src);
        dest[src.len()] = 0;
    }
    src.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strlen_stops_at_nul_or_end() {
        assert_eq!(strlen(b"hello\0world"), 5);
        assert_eq!(strlen(b"\0"), 0);
        assert_eq!(strlen(b"abc"), 3);
        assert_eq!(strnlen(b"hello\0", 3), 3);
        assert_eq!(strnlen(b"hi\0", 10), 2);
    }

    #[test]
    fn strcmp_orders_by_first_difference() {
        assert_eq!(strcmp(b"abc\0", b"abc\0"), 0);
        assert!(strcmp(b"abc\0", b"abd\0") < 0);
        assert!(strcmp(b"abd\0", b"abc\0") > 0);
        assert!(strcmp(b"ab\0", b"abc\0") < 0);
        assert!(strcmp(b"abc\0", b"ab\0") > 0);
        assert!(strcmp(b"\xff\0", b"a\0") > 0);
        // Bytes after the terminator do not take part.
        assert_eq!(strcmp(b"ab\0x", b"ab\0y"), 0);
    }

    #[test]
    fn strncmp_limits_the_comparison() {
        assert_eq!(strncmp(b"abcdef\0", b"abcxyz\0", 3), 0);
        assert!(strncmp(b"abcdef\0", b"abcxyz\0", 4) < 0);
        assert_eq!(strncmp(b"a\0", b"b\0", 0), 0);
    }

    #[test]
    fn strcpy_and_strcat_terminate() {
        let mut buf = [0xFFu8; 12];
        assert_eq!(strcpy(&mut buf, b"hello\0"), 6);
        assert_eq!(strcat(&mut buf, b" world\0"), 11);
        assert_eq!(&buf, b"hello world\0");
    }

    #[test]
    #[should_panic(expected = "strcpy")]
    fn strcpy_rejects_short_destination() {
        let mut buf = [0u8; 5];
        strcpy(&mut buf, b"hello\0");
    }

    #[test]
    fn strncpy_pads_and_truncates() {
        let mut buf = [0xFFu8; 6];
        assert_eq!(strncpy(&mut buf, b"hi\0", 5), 5);
        assert_eq!(&buf, b"hi\0\0\0\xff");

        let mut short = [0xFFu8; 3];
        strncpy(&mut short, b"hello\0", 3);
        assert_eq!(&short, b"hel");
    }

    #[test]
    fn strncat_appends_prefix() {
        let mut buf = [0u8; 10];
        strcpy(&mut buf, b"hi\0");
        assert_eq!(strncat(&mut buf, b"there\0", 3), 5);
        assert_eq!(&buf[..6], b"hithe\0");
    }

    #[test]
    fn character_search() {
        assert_eq!(strchr(b"hello\0", b'l'), Some(2));
        assert_eq!(strrchr(b"hello\0", b'l'), Some(3));
        assert_eq!(strchr(b"hello\0", b'z'), None);
        assert_eq!(strchr(b"hello\0", 0), Some(5));
        assert_eq!(strrchr(b"hi\0zz", b'z'), None);
    }

    #[test]
    fn substring_search() {
        assert_eq!(strstr(b"hello world\0", b"world\0"), Some(6));
        assert_eq!(strstr(b"hello world\0", b"xyz\0"), None);
        assert_eq!(strstr(b"hello\0", b"\0"), Some(0));
        assert_eq!(strstr(b"ab\0", b"abc\0"), None);
    }

    #[test]
    fn span_functions() {
        assert_eq!(strspn(b"123abc\0", b"0123456789\0"), 3);
        assert_eq!(strspn(b"999\0", b"9\0"), 3);
        assert_eq!(strcspn(b"hello, world\0", b" ,\0"), 5);
        assert_eq!(strcspn(b"hello\0", b"xyz\0"), 5);
        assert_eq!(strpbrk(b"hello, world\0", b"ow\0"), Some(4));
        assert_eq!(strpbrk(b"hello\0", b"xyz\0"), None);
    }

    #[test]
    fn strxfrm_copies_when_it_fits() {
        let mut buf = [0xFFu8; 8];
        assert_eq!(strxfrm(&mut buf, b"abc\0", 8), 3);
        assert_eq!(&buf[..4], b"abc\0");

        let mut small = [0xFFu8; 3];
        assert_eq!(strxfrm(&mut small, b"abc\0", 3), 3);
        assert_eq!(small, [0xFF; 3]);
    }
}
