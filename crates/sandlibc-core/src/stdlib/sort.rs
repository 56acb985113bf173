//! `qsort` and `bsearch` over arrays of fixed-width byte elements.
//!
//! Comparators follow the C contract: negative, zero or positive as the
//! first element orders before, equal to or after the second.

/// Sorts `base` in place as `base.len() / width` elements.
///
/// Bottom-up merge sort through a scratch copy: stable, `O(n log n)`
/// comparisons, and an inconsistent comparator only yields an unspecified
/// order. Trailing bytes past the last whole element are left alone.
pub fn qsort<F>(base: &mut [u8], width: usize, mut compare: F)
where
    F: FnMut(&[u8], &[u8]) -> i32,
{
    if width == 0 {
        return;
    }
    let count = base.len() / width;
    if count < 2 {
        return;
    }
    let len = count * width;
    let mut scratch = vec![0u8; len];
    let mut sorted_in_base = true;
    let mut run = 1;
    while run < count {
        if sorted_in_base {
            merge_pass(&base[..len], &mut scratch, width, run, &mut compare);
        } else {
            merge_pass(&scratch, &mut base[..len], width, run, &mut compare);
        }
        sorted_in_base = !sorted_in_base;
        run *= 2;
    }
    if !sorted_in_base {
        base[..len].copy_from_slice(&scratch);
    }
}

/// Merges adjacent runs of `run` elements from `src` into `dst`.
fn merge_pass<F>(src: &[u8], dst: &mut [u8], width: usize, run: usize, compare: &mut F)
where
    F: FnMut(&[u8], &[u8]) -> i32,
{
    let count = src.len() / width;
    let element = |i: usize| i * width..(i + 1) * width;
    let mut start = 0;
    while start < count {
        let mid = (start + run).min(count);
        let end = (start + 2 * run).min(count);
        let (mut left, mut right, mut out) = (start, mid, start);
        while left < mid && right < end {
            // Ties take the left run.
            let take = if compare(&src[element(right)], &src[element(left)]) < 0 {
                right += 1;
                right - 1
            } else {
                left += 1;
                left - 1
            };
            dst[element(out)].copy_from_slice(&src[element(take)]);
            out += 1;
        }
        let rest = if left < mid {
            &src[left * width..mid * width]
        } else {
            &src[right * width..end * width]
        };
        dst[out * width..out * width + rest.len()].copy_from_slice(rest);
        start = end;
    }
}

/// Binary search of a sorted array for `key`. Returns the index of a
/// matching element.
pub fn bsearch<F>(key: &[u8], base: &[u8], width: usize, mut compare: F) -> Option<usize>
where
    F: FnMut(&[u8], &[u8]) -> i32,
{
    if width == 0 {
        return None;
    }
    let (mut low, mut high) = (0, base.len() / width);
    while low < high {
        let mid = low + (high - low) / 2;
        match compare(key, &base[mid * width..(mid + 1) * width]) {
            0 => return Some(mid),
            cmp if cmp < 0 => high = mid,
            _ => low = mid + 1,
        }
    }
    None
}
