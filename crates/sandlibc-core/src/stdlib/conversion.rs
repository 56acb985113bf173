//! String to number conversion: the `strtol` family, `strtod`/`strtof`
//! and the `ato*` shorthands.
//!
//! Inputs are C strings held in slices: parsing stops at the first NUL.
//! Every parser reports how many bytes it consumed (`end`), which is 0
//! when no number was recognized, matching an `endptr` left at the start.

use crate::string::str::cstr;

/// Outcome of a conversion beyond its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Success,
    /// The value did not fit and was saturated (or flushed to zero for a
    /// float underflow). `errno` becomes `ERANGE`.
    OutOfRange,
    /// Base outside `0` and `2..=36`. `errno` becomes `EINVAL`.
    InvalidBase,
}

/// A parsed prefix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    /// Bytes consumed, leading whitespace included.
    pub end: usize,
    pub status: ConversionStatus,
}

impl<T: Default> Parsed<T> {
    fn nothing(status: ConversionStatus) -> Self {
        Self {
            value: T::default(),
            end: 0,
            status,
        }
    }
}

/// `isspace` in the C locale.
#[inline]
fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t'..=b'\r')
}

/// Skips whitespace and one optional sign. Returns `(negative, index)`.
fn skip_space_and_sign(s: &[u8]) -> (bool, usize) {
    let mut i = s.iter().take_while(|&&c| is_space(c)).count();
    let negative = match s.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    (negative, i)
}

fn has_hex_prefix(s: &[u8]) -> bool {
    s.first() == Some(&b'0') && matches!(s.get(1), Some(b'x' | b'X'))
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

struct Digits {
    magnitude: u64,
    negative: bool,
    end: usize,
    overflow: bool,
}

/// Shared scanner of the integer parsers. `None` for an invalid base.
fn scan_integer(s: &[u8], base: u32) -> Option<Digits> {
    if base == 1 || base > 36 {
        return None;
    }
    let s = cstr(s);
    let (negative, mut i) = skip_space_and_sign(s);
    let hex = has_hex_prefix(&s[i..]) && s.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
    let radix = match base {
        0 if hex => 16,
        0 if s.get(i) == Some(&b'0') => 8,
        0 => 10,
        explicit => explicit,
    };
    if radix == 16 && hex {
        i += 2;
    }

    let start = i;
    let mut magnitude: u64 = 0;
    let mut overflow = false;
    while let Some(digit) = s.get(i).and_then(|&c| char::from(c).to_digit(radix)) {
        match magnitude
            .checked_mul(u64::from(radix))
            .and_then(|m| m.checked_add(u64::from(digit)))
        {
            Some(next) if !overflow => magnitude = next,
            _ => overflow = true,
        }
        i += 1;
    }
    if i == start {
        return Some(Digits {
            magnitude: 0,
            negative: false,
            end: 0,
            overflow: false,
        });
    }
    Some(Digits {
        magnitude,
        negative,
        end: i,
        overflow,
    })
}

/// `strtol`/`strtoll`. Saturates to `i64::MIN`/`i64::MAX` when out of range.
#[must_use]
pub fn strtol(s: &[u8], base: u32) -> Parsed<i64> {
    let Some(digits) = scan_integer(s, base) else {
        return Parsed::nothing(ConversionStatus::InvalidBase);
    };
    let limit = if digits.negative {
        i64::MIN.unsigned_abs()
    } else {
        i64::MAX.unsigned_abs()
    };
    if digits.overflow || digits.magnitude > limit {
        return Parsed {
            value: if digits.negative { i64::MIN } else { i64::MAX },
            end: digits.end,
            status: ConversionStatus::OutOfRange,
        };
    }
    let value = if digits.negative {
        0i64.wrapping_sub_unsigned(digits.magnitude)
    } else {
        digits.magnitude as i64
    };
    Parsed {
        value,
        end: digits.end,
        status: ConversionStatus::Success,
    }
}

/// `strtoul`/`strtoull`. A leading `-` negates modulo 2^64; values past
/// `u64::MAX` saturate.
#[must_use]
pub fn strtoul(s: &[u8], base: u32) -> Parsed<u64> {
    let Some(digits) = scan_integer(s, base) else {
        return Parsed::nothing(ConversionStatus::InvalidBase);
    };
    if digits.overflow {
        return Parsed {
            value: u64::MAX,
            end: digits.end,
            status: ConversionStatus::OutOfRange,
        };
    }
    let value = if digits.negative {
        digits.magnitude.wrapping_neg()
    } else {
        digits.magnitude
    };
    Parsed {
        value,
        end: digits.end,
        status: ConversionStatus::Success,
    }
}

/// `atoi`: base-10 [`strtol`], truncated to `int`.
#[must_use]
pub fn atoi(s: &[u8]) -> i32 {
    strtol(s, 10).value as i32
}

/// `atol`/`atoll`.
#[must_use]
pub fn atol(s: &[u8]) -> i64 {
    strtol(s, 10).value
}

// ---------------------------------------------------------------------------
// Floating point
// ---------------------------------------------------------------------------

enum FloatText {
    Number { value: f64, nonzero_digits: bool },
    Infinity,
    Nan { payload: Option<u32> },
}

struct FloatScan {
    text: FloatText,
    negative: bool,
    end: usize,
}

fn starts_with_ignore_case(s: &[u8], word: &[u8]) -> bool {
    s.len() >= word.len() && s[..word.len()].eq_ignore_ascii_case(word)
}

fn scan_float(s: &[u8]) -> Option<FloatScan> {
    let s = cstr(s);
    let (negative, start) = skip_space_and_sign(s);
    let body = &s[start..];

    let (text, used) = if starts_with_ignore_case(body, b"infinity") {
        (FloatText::Infinity, 8)
    } else if starts_with_ignore_case(body, b"inf") {
        (FloatText::Infinity, 3)
    } else if starts_with_ignore_case(body, b"nan") {
        let (payload, used) = nan_payload(&body[3..]);
        (FloatText::Nan { payload }, 3 + used)
    } else if has_hex_prefix(body)
        && let Some((value, nonzero_digits, used)) = scan_hex_float(&body[2..])
    {
        (
            FloatText::Number {
                value,
                nonzero_digits,
            },
            2 + used,
        )
    } else {
        let (value, nonzero_digits, used) = scan_decimal(body)?;
        (
            FloatText::Number {
                value,
                nonzero_digits,
            },
            used,
        )
    };
    Some(FloatScan {
        text,
        negative,
        end: start + used,
    })
}

/// `(n-char-sequence)` after `nan`. The payload is the sequence read as an
/// unsigned number when it is entirely numeric and in `1..=u32::MAX`. An
/// unclosed parenthesis is not consumed.
fn nan_payload(s: &[u8]) -> (Option<u32>, usize) {
    if s.first() != Some(&b'(') {
        return (None, 0);
    }
    let len = s[1..]
        .iter()
        .take_while(|&&c| c.is_ascii_alphanumeric() || c == b'_')
        .count();
    if s.get(1 + len) != Some(&b')') {
        return (None, 0);
    }
    let sequence = &s[1..1 + len];
    let number = strtoul(sequence, 0);
    let payload = (number.end == sequence.len() && number.status == ConversionStatus::Success)
        .then(|| u32::try_from(number.value).ok())
        .flatten()
        .filter(|&n| n != 0);
    (payload, len + 2)
}

/// Decimal mantissa with optional fraction and exponent. `None` when no
/// digit is present.
fn scan_decimal(s: &[u8]) -> Option<(f64, bool, usize)> {
    let int_digits = s.iter().take_while(|c| c.is_ascii_digit()).count();
    let mut i = int_digits;
    let mut frac_digits = 0;
    if s.get(i) == Some(&b'.') {
        frac_digits = s[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if int_digits + frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    let nonzero_digits = s[..i].iter().any(|&c| matches!(c, b'1'..=b'9'));
    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = s[j.min(s.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    let value = core::str::from_utf8(&s[..i])
        .ok()
        .and_then(|text| text.parse::<f64>().ok())?;
    Some((value, nonzero_digits, i))
}

/// Significant hex digits kept in the mantissa.
const HEX_MANTISSA_DIGITS: u32 = 15;

/// Hexadecimal float after the `0x` prefix: hex mantissa with optional
/// fraction and an optional binary exponent `p[+-]digits`. `None` when no
/// hex digit is present, which leaves the `0` to the decimal parser.
fn scan_hex_float(s: &[u8]) -> Option<(f64, bool, usize)> {
    let mut mantissa: u64 = 0;
    let mut significant = 0u32;
    let mut exponent: i64 = 0;
    let mut digits = 0usize;
    let mut i = 0;
    let mut seen_point = false;

    while let Some(&c) = s.get(i) {
        if c == b'.' && !seen_point {
            seen_point = true;
            i += 1;
            continue;
        }
        let Some(digit) = char::from(c).to_digit(16) else {
            break;
        };
        digits += 1;
        if significant < HEX_MANTISSA_DIGITS {
            mantissa = mantissa * 16 + u64::from(digit);
            if mantissa != 0 {
                significant += 1;
            }
            if seen_point {
                exponent -= 4;
            }
        } else if !seen_point {
            exponent += 4;
        }
        i += 1;
    }
    if digits == 0 {
        return None;
    }
    if matches!(s.get(i), Some(b'p' | b'P')) {
        let exp = strtol(&s[i + 1..], 10);
        let signed_ok = s
            .get(i + 1)
            .is_some_and(|&c| c.is_ascii_digit() || c == b'+' || c == b'-');
        if exp.end > 0 && signed_ok {
            exponent = exponent.saturating_add(exp.value.clamp(-100_000, 100_000));
            i += 1 + exp.end;
        }
    }
    Some((scale_by_power_of_two(mantissa as f64, exponent), mantissa != 0, i))
}

/// `value * 2^exp` without overflowing the intermediate power.
fn scale_by_power_of_two(mut value: f64, mut exp: i64) -> f64 {
    const STEP: i64 = 1000;
    while exp > STEP && value.is_finite() && value != 0.0 {
        value *= 2f64.powi(STEP as i32);
        exp -= STEP;
    }
    while exp < -STEP && value != 0.0 {
        value *= 2f64.powi(-STEP as i32);
        exp += STEP;
    }
    value * 2f64.powi(exp.clamp(-STEP, STEP) as i32)
}

/// `strtod`. Accepts decimal and hexadecimal floats, `inf`, `infinity`,
/// `nan` and `nan(payload)`, all case-insensitive. Overflow gives
/// `±inf`, underflow gives `±0`; both are [`ConversionStatus::OutOfRange`].
#[must_use]
pub fn strtod(s: &[u8]) -> Parsed<f64> {
    let Some(scan) = scan_float(s) else {
        return Parsed::nothing(ConversionStatus::Success);
    };
    let (magnitude, status) = match scan.text {
        FloatText::Infinity => (f64::INFINITY, ConversionStatus::Success),
        FloatText::Nan { payload } => (
            payload.map_or(f64::NAN, |p| {
                f64::from_bits(0x7ff8_0000_0000_0000 | u64::from(p))
            }),
            ConversionStatus::Success,
        ),
        FloatText::Number {
            value,
            nonzero_digits,
        } => (value, float_status(value.is_infinite(), value == 0.0, nonzero_digits)),
    };
    Parsed {
        value: if scan.negative { -magnitude } else { magnitude },
        end: scan.end,
        status,
    }
}

/// `strtof`. NaN payloads keep their low 22 bits.
#[must_use]
pub fn strtof(s: &[u8]) -> Parsed<f32> {
    let Some(scan) = scan_float(s) else {
        return Parsed::nothing(ConversionStatus::Success);
    };
    let (magnitude, status) = match scan.text {
        FloatText::Infinity => (f32::INFINITY, ConversionStatus::Success),
        FloatText::Nan { payload } => (
            payload.map_or(f32::NAN, |p| f32::from_bits(0x7fc0_0000 | (p & 0x3f_ffff))),
            ConversionStatus::Success,
        ),
        FloatText::Number {
            value,
            nonzero_digits,
        } => {
            let narrow = value as f32;
            (
                narrow,
                float_status(narrow.is_infinite(), narrow == 0.0, nonzero_digits),
            )
        }
    };
    Parsed {
        value: if scan.negative { -magnitude } else { magnitude },
        end: scan.end,
        status,
    }
}

fn float_status(overflowed: bool, is_zero: bool, nonzero_digits: bool) -> ConversionStatus {
    if overflowed || (is_zero && nonzero_digits) {
        ConversionStatus::OutOfRange
    } else {
        ConversionStatus::Success
    }
}

/// `atof`.
#[must_use]
pub fn atof(s: &[u8]) -> f64 {
    strtod(s).value
}
