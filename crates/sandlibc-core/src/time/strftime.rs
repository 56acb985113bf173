//! `strftime` directive formatter.
//!
//! Directives are expanded in one pass over the format. Unknown directives
//! produce nothing, `E`/`O` modifiers are accepted and ignored. There is no
//! zone database: `%z` prints the offset handed in and `%Z` is empty.

use super::Calendar;

/// Format `cal` into `out` with a trailing NUL.
///
/// Returns the number of bytes written, NUL excluded, or 0 when the result
/// and its terminator do not fit (`out` contents are then unspecified).
pub fn strftime(out: &mut [u8], format: &[u8], cal: &Calendar, minutes_west: i32) -> usize {
    let text = render(format, cal, minutes_west);
    if text.len() >= out.len() {
        return 0;
    }
    out[..text.len()].copy_from_slice(&text);
    out[text.len()] = 0;
    text.len()
}

/// Expand `format` without a size limit. The format ends at its first NUL.
#[must_use]
pub fn render(format: &[u8], cal: &Calendar, minutes_west: i32) -> Vec<u8> {
    let end = format.iter().position(|&b| b == 0).unwrap_or(format.len());
    let mut out = Vec::with_capacity(end * 2);
    expand(&mut out, &format[..end], cal, minutes_west);
    out
}

fn expand(out: &mut Vec<u8>, format: &[u8], cal: &Calendar, minutes_west: i32) {
    let mut i = 0;
    while i < format.len() {
        let b = format[i];
        i += 1;
        if b != b'%' {
            out.push(b);
            continue;
        }
        if matches!(format.get(i), Some(b'E' | b'O')) {
            i += 1;
        }
        let Some(&directive) = format.get(i) else {
            break;
        };
        i += 1;
        directive_into(out, directive, cal, minutes_west);
    }
}

fn directive_into(out: &mut Vec<u8>, directive: u8, cal: &Calendar, minutes_west: i32) {
    let year = cal.full_year();
    match directive {
        b'a' => push_str(out, cal.weekday_abbr()),
        b'A' => push_str(out, cal.weekday_full()),
        b'b' | b'h' => push_str(out, cal.month_abbr()),
        b'B' => push_str(out, cal.month_full()),
        b'c' => expand(out, b"%a %b %e %H:%M:%S %Y", cal, minutes_west),
        b'C' => push_num(out, year.div_euclid(100), 2, b'0'),
        b'd' => push_num(out, cal.tm_mday.into(), 2, b'0'),
        b'D' | b'x' => expand(out, b"%m/%d/%y", cal, minutes_west),
        b'e' => push_num(out, cal.tm_mday.into(), 2, b' '),
        b'F' => expand(out, b"%Y-%m-%d", cal, minutes_west),
        b'g' => push_num(out, iso_week(cal).0.rem_euclid(100), 2, b'0'),
        b'G' => push_num(out, iso_week(cal).0, 1, b'0'),
        b'H' => push_num(out, cal.tm_hour.into(), 2, b'0'),
        b'I' => push_num(out, hour12(cal.tm_hour), 2, b'0'),
        b'j' => push_num(out, i64::from(cal.tm_yday) + 1, 3, b'0'),
        b'm' => push_num(out, i64::from(cal.tm_mon) + 1, 2, b'0'),
        b'M' => push_num(out, cal.tm_min.into(), 2, b'0'),
        b'n' => out.push(b'\n'),
        b'p' => push_str(out, if cal.tm_hour < 12 { "AM" } else { "PM" }),
        b'r' => expand(out, b"%I:%M:%S %p", cal, minutes_west),
        b'R' => expand(out, b"%H:%M", cal, minutes_west),
        b'S' => push_num(out, cal.tm_sec.into(), 2, b'0'),
        b't' => out.push(b'\t'),
        b'T' | b'X' => expand(out, b"%H:%M:%S", cal, minutes_west),
        b'u' => push_num(out, iso_weekday(cal.tm_wday) + 1, 1, b'0'),
        b'U' => {
            let week = (i64::from(cal.tm_yday) + 7 - i64::from(cal.tm_wday)) / 7;
            push_num(out, week, 2, b'0');
        }
        b'V' => push_num(out, iso_week(cal).1, 2, b'0'),
        b'w' => push_num(out, cal.tm_wday.into(), 1, b'0'),
        b'W' => {
            let week = (i64::from(cal.tm_yday) + 7 - iso_weekday(cal.tm_wday)) / 7;
            push_num(out, week, 2, b'0');
        }
        b'y' => push_num(out, year.rem_euclid(100), 2, b'0'),
        b'Y' => push_num(out, year, 1, b'0'),
        b'z' => {
            let east = -i64::from(minutes_west);
            out.push(if east < 0 { b'-' } else { b'+' });
            let east = east.abs();
            push_num(out, east / 60, 2, b'0');
            push_num(out, east % 60, 2, b'0');
        }
        b'Z' => {}
        b'%' => out.push(b'%'),
        _ => {}
    }
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
}

fn push_num(out: &mut Vec<u8>, value: i64, width: usize, pad: u8) {
    let digits = value.unsigned_abs().to_string();
    if value < 0 {
        out.push(b'-');
    }
    for _ in digits.len()..width {
        out.push(pad);
    }
    out.extend_from_slice(digits.as_bytes());
}

fn hour12(hour: i32) -> i64 {
    match i64::from(hour).rem_euclid(12) {
        0 => 12,
        h => h,
    }
}

/// Monday = 0 .. Sunday = 6.
fn iso_weekday(wday: i32) -> i64 {
    (i64::from(wday) + 6).rem_euclid(7)
}

fn iso_weeks_in_year(year: i64) -> i64 {
    let p = |y: i64| (y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)).rem_euclid(7);
    if p(year) == 4 || p(year - 1) == 3 {
        53
    } else {
        52
    }
}

/// ISO 8601 week-based year and week number.
fn iso_week(cal: &Calendar) -> (i64, i64) {
    let year = cal.full_year();
    let week = (i64::from(cal.tm_yday) - iso_weekday(cal.tm_wday) + 10) / 7;
    if week < 1 {
        (year - 1, iso_weeks_in_year(year - 1))
    } else if week > iso_weeks_in_year(year) {
        (year + 1, 1)
    } else {
        (year, week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::to_calendar;

    fn utc(epoch: i64) -> Calendar {
        to_calendar(epoch, 0).expect("representable")
    }

    fn fmt(format: &str, epoch: i64) -> String {
        String::from_utf8(render(format.as_bytes(), &utc(epoch), 0)).expect("ascii")
    }

    #[test]
    fn date_at_epoch() {
        assert_eq!(fmt("%Y-%m-%d", 0), "1970-01-01");
        assert_eq!(fmt("%F %T", 0), "1970-01-01 00:00:00");
    }

    #[test]
    fn names() {
        // 2009-02-13 23:31:30, Friday
        let t = 1_234_567_890;
        assert_eq!(fmt("%a %A %b %B %h", t), "Fri Friday Feb February Feb");
        assert_eq!(fmt("%c", t), "Fri Feb 13 23:31:30 2009");
    }

    #[test]
    fn twelve_hour_clock() {
        let t = 1_234_567_890;
        assert_eq!(fmt("%I %p", t), "11 PM");
        assert_eq!(fmt("%r", t), "11:31:30 PM");
        assert_eq!(fmt("%I %p", 0), "12 AM");
        assert_eq!(fmt("%I %p", 12 * 3600), "12 PM");
    }

    #[test]
    fn compositions_and_escapes() {
        let t = 1_234_567_890;
        assert_eq!(fmt("%D", t), "02/13/09");
        assert_eq!(fmt("%x|%X", t), "02/13/09|23:31:30");
        assert_eq!(fmt("%R%n%t%%", t), "23:31\n\t%");
        assert_eq!(fmt("%C %y %e", 0), "19 70  1");
    }

    #[test]
    fn day_numbers() {
        let t = 1_234_567_890;
        assert_eq!(fmt("%j %u %w", t), "044 5 5");
        // Sunday 2023-01-01
        assert_eq!(fmt("%u %w %U %W", 1_672_531_200), "7 0 01 00");
    }

    #[test]
    fn last_day_of_year_is_numbered() {
        assert_eq!(fmt("%j", 1_704_067_199), "365");
        // 2024 is a leap year.
        assert_eq!(fmt("%j", 1_735_689_599), "366");
    }

    #[test]
    fn iso_week_boundaries() {
        // 2021-01-01 (Friday) belongs to week 53 of 2020.
        assert_eq!(fmt("%G-W%V %g", 1_609_459_200), "2020-W53 20");
        // 2024-12-30 (Monday) belongs to week 1 of 2025.
        assert_eq!(fmt("%G-W%V", 1_735_516_800), "2025-W01");
        // 2009-02-13
        assert_eq!(fmt("%V", 1_234_567_890), "07");
    }

    #[test]
    fn zone_directives() {
        let cal = utc(0);
        assert_eq!(render(b"%z", &cal, 0), b"+0000");
        assert_eq!(render(b"%z", &cal, 300), b"-0500");
        assert_eq!(render(b"%z", &cal, -330), b"+0530");
        assert_eq!(render(b"[%Z]", &cal, 0), b"[]");
    }

    #[test]
    fn unknown_directives_and_modifiers() {
        assert_eq!(fmt("%Q%Ey%OH|", 0), "7000|");
        assert_eq!(fmt("trailing %", 0), "trailing ");
    }

    #[test]
    fn format_stops_at_nul() {
        assert_eq!(render(b"%Y\0%m", &utc(0), 0), b"1970");
    }

    #[test]
    fn strftime_requires_room_for_nul() {
        let cal = utc(0);
        let mut out = [0xAAu8; 11];
        assert_eq!(strftime(&mut out, b"%Y-%m-%d", &cal, 0), 10);
        assert_eq!(&out, b"1970-01-01\0");

        let mut tight = [0u8; 10];
        assert_eq!(strftime(&mut tight, b"%Y-%m-%d", &cal, 0), 0);
        assert_eq!(strftime(&mut [], b"", &cal, 0), 0);
    }
}
