//! String tokenization: strtok and strtok_r.
//!
//! Both write a NUL over the delimiter that ends each token and resume one
//! byte past it. `strtok` keeps its resume point in a caller-owned
//! [`TokenCursor`] instead of hidden static state, so nested tokenization
//! of different buffers is safe as long as each uses its own cursor.

use core::ops::Range;

use super::str::{cstr, strlen};

/// Resume point of an in-progress [`strtok`] scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCursor {
    next: Option<usize>,
}

impl TokenCursor {
    /// A cursor with nothing to resume; the next [`strtok`] starts at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: None }
    }

    /// A cursor resuming at `offset`.
    #[must_use]
    pub const fn at(offset: usize) -> Self {
        Self { next: Some(offset) }
    }

    /// Where the next scan starts, `None` before the first token.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.next
    }

    /// Forget the resume point so the next call starts a new string.
    pub fn reset(&mut self) {
        self.next = None;
    }
}

/// Next token of `s`, resuming from `cursor`.
///
/// Returns the token's byte range. When the string is exhausted the cursor
/// is parked at the terminator and further calls keep returning `None`.
pub fn strtok(s: &mut [u8], delimiters: &[u8], cursor: &mut TokenCursor) -> Option<Range<usize>> {
    let start = cursor.next.unwrap_or(0);
    match strtok_r(s, delimiters, start) {
        Some((token_start, token_len, next)) => {
            cursor.next = Some(next);
            Some(token_start..token_start + token_len)
        }
        None => {
            let end = s.get(start..).map_or(start, |rest| start + strlen(rest));
            cursor.next = Some(end);
            None
        }
    }
}

/// Reentrant tokenizer.
///
/// Scans from `save_ptr` and returns `(token_start, token_len, next_save)`.
pub fn strtok_r(
    s: &mut [u8],
    delimiters: &[u8],
    save_ptr: usize,
) -> Option<(usize, usize, usize)> {
    let delimiters = cstr(delimiters);
    // Earlier tokens left NULs behind; the remaining string starts here.
    let len = save_ptr + strlen(s.get(save_ptr..)?);

    let token_start = save_ptr
        + s[save_ptr..len]
            .iter()
            .position(|b| !delimiters.contains(b))?;
    let token_end = s[token_start..len]
        .iter()
        .position(|b| delimiters.contains(b))
        .map_or(len, |i| token_start + i);

    let next = if token_end < len {
        s[token_end] = 0;
        token_end + 1
    } else {
        token_end
    };
    Some((token_start, token_end - token_start, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8], delims: &[u8]) -> Vec<Vec<u8>> {
        let mut buf = input.to_vec();
        let mut cursor = TokenCursor::new();
        let mut tokens = Vec::new();
        while let Some(range) = strtok(&mut buf, delims, &mut cursor) {
            tokens.push(buf[range].to_vec());
        }
        tokens
    }

    #[test]
    fn splits_on_any_delimiter() {
        assert_eq!(
            collect(b"a,,b c\0", b", \0"),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn leading_and_trailing_delimiters() {
        assert_eq!(collect(b"  hello  \0", b" \0"), vec![b"hello".to_vec()]);
        assert!(collect(b"   \0", b" \0").is_empty());
        assert!(collect(b"\0", b" \0").is_empty());
    }

    #[test]
    fn writes_nul_over_delimiters() {
        let mut buf = *b"x-y\0";
        let mut cursor = TokenCursor::new();
        assert_eq!(strtok(&mut buf, b"-\0", &mut cursor), Some(0..1));
        assert_eq!(&buf, b"x\0y\0");
        assert_eq!(cursor.position(), Some(2));
    }

    #[test]
    fn exhausted_cursor_stays_exhausted() {
        let mut buf = *b"one\0";
        let mut cursor = TokenCursor::new();
        assert_eq!(strtok(&mut buf, b" \0", &mut cursor), Some(0..3));
        assert_eq!(strtok(&mut buf, b" \0", &mut cursor), None);
        assert_eq!(strtok(&mut buf, b" \0", &mut cursor), None);

        cursor.reset();
        assert_eq!(strtok(&mut buf, b" \0", &mut cursor), Some(0..3));
    }

    #[test]
    fn nested_scans_do_not_interfere() {
        let mut outer = *b"a=1;b=2\0";
        let mut outer_cursor = TokenCursor::new();
        let mut pairs = Vec::new();
        while let Some(range) = strtok(&mut outer, b";\0", &mut outer_cursor) {
            let mut field = outer[range].to_vec();
            field.push(0);
            let mut inner = TokenCursor::new();
            let key = strtok(&mut field, b"=\0", &mut inner).map(|r| field[r].to_vec());
            let value = strtok(&mut field, b"=\0", &mut inner).map(|r| field[r].to_vec());
            pairs.push((key, value));
        }
        assert_eq!(
            pairs,
            vec![
                (Some(b"a".to_vec()), Some(b"1".to_vec())),
                (Some(b"b".to_vec()), Some(b"2".to_vec())),
            ]
        );
    }

    #[test]
    fn strtok_r_threads_save_pointer() {
        let mut buf = *b"hello world foo\0";
        let (start, len, save) = strtok_r(&mut buf, b" \0", 0).expect("first");
        assert_eq!(&buf[start..start + len], b"hello");
        let (start, len, save) = strtok_r(&mut buf, b" \0", save).expect("second");
        assert_eq!(&buf[start..start + len], b"world");
        let (start, len, save) = strtok_r(&mut buf, b" \0", save).expect("third");
        assert_eq!(&buf[start..start + len], b"foo");
        assert!(strtok_r(&mut buf, b" \0", save).is_none());
    }

    #[test]
    fn empty_delimiter_set_yields_whole_string() {
        assert_eq!(collect(b"a b\0", b"\0"), vec![b"a b".to_vec()]);
    }
}
