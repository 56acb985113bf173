//! Time and date functions.
//!
//! Implements the `<time.h>` conversions as pure functions over epoch
//! seconds. Reading the clock and the local zone offset is the host's job;
//! the runtime feeds those values in and keeps the shared calendar record.

pub mod strftime;

pub use strftime::{render, strftime};

/// `clock()` ticks per second. The host clock counts milliseconds.
pub const CLOCKS_PER_SEC: i64 = 1000;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 86_400;
/// Days in a full Gregorian cycle.
const DAYS_PER_400_YEARS: i64 = 146_097;

/// UTC was set 10 s behind TAI on 1972-01-01.
const LEAP_SECOND_CORRECTION: i64 = 10;
/// 1972-01-01T00:00:00Z.
const LEAP_REFERENCE_EPOCH: i64 = 63_072_000;

/// Days in each month for a non-leap year.
const DAYS_IN_MONTH: [i32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days before the first of each month in a non-leap year.
const DAYS_BEFORE_MONTH: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

pub(crate) const WEEKDAY_ABBR: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub(crate) const WEEKDAY_FULL: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
pub(crate) const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
pub(crate) const MONTH_FULL: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Broken-down time (like `struct tm`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calendar {
    /// Seconds (0-59).
    pub tm_sec: i32,
    /// Minutes (0-59).
    pub tm_min: i32,
    /// Hours (0-23).
    pub tm_hour: i32,
    /// Day of month (1-31).
    pub tm_mday: i32,
    /// Month (0-11).
    pub tm_mon: i32,
    /// Years since 1900.
    pub tm_year: i32,
    /// Day of week (0-6, Sunday = 0).
    pub tm_wday: i32,
    /// Day of year (0-365).
    pub tm_yday: i32,
    /// Daylight saving flag: 0 for UTC, -1 when unknown (local time).
    pub tm_isdst: i32,
}

impl Calendar {
    /// The calendar year.
    #[must_use]
    pub fn full_year(&self) -> i64 {
        1900 + i64::from(self.tm_year)
    }

    pub(crate) fn weekday_abbr(&self) -> &'static str {
        lookup(&WEEKDAY_ABBR, self.tm_wday).unwrap_or("?")
    }

    pub(crate) fn weekday_full(&self) -> &'static str {
        lookup(&WEEKDAY_FULL, self.tm_wday).unwrap_or("?")
    }

    pub(crate) fn month_abbr(&self) -> &'static str {
        lookup(&MONTH_ABBR, self.tm_mon).unwrap_or("?")
    }

    pub(crate) fn month_full(&self) -> &'static str {
        lookup(&MONTH_FULL, self.tm_mon).unwrap_or("?")
    }
}

fn lookup<const N: usize>(table: &[&'static str; N], index: i32) -> Option<&'static str> {
    usize::try_from(index).ok().and_then(|i| table.get(i).copied())
}

/// Returns `true` if `year` is a leap year (Gregorian).
#[inline]
pub fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days in month `mon` (0-11) of `year`.
#[must_use]
pub fn days_in_month(year: i64, mon: usize) -> i32 {
    if mon == 1 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[mon % 12]
    }
}

/// Convert seconds since the Unix epoch to broken-down time.
///
/// `minutes_west` is the zone offset as the host reports it (positive when
/// behind UTC); pass 0 for UTC. Local results carry `tm_isdst = -1`.
/// Returns `None` when the shifted instant or its year does not fit.
pub fn to_calendar(epoch_secs: i64, minutes_west: i32) -> Option<Calendar> {
    let local = epoch_secs.checked_sub(i64::from(minutes_west) * SECS_PER_MINUTE)?;

    let days = local.div_euclid(SECS_PER_DAY);
    let rem = local.rem_euclid(SECS_PER_DAY);

    let tm_sec = (rem % SECS_PER_MINUTE) as i32;
    let tm_min = ((rem / SECS_PER_MINUTE) % 60) as i32;
    let tm_hour = (rem / SECS_PER_HOUR) as i32;

    // Jan 1 1970 was a Thursday.
    let tm_wday = (days + 4).rem_euclid(7) as i32;

    // Whole cycles first, then walk years forward from there.
    let cycles = days.div_euclid(DAYS_PER_400_YEARS);
    let mut year = 1970 + cycles * 400;
    let mut remaining_days = days - cycles * DAYS_PER_400_YEARS;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let tm_yday = remaining_days as i32;
    let mut mon = 0usize;
    let mut day_rem = tm_yday;
    while mon < 11 {
        let dim = days_in_month(year, mon);
        if day_rem < dim {
            break;
        }
        day_rem -= dim;
        mon += 1;
    }

    Some(Calendar {
        tm_sec,
        tm_min,
        tm_hour,
        tm_mday: day_rem + 1,
        tm_mon: mon as i32,
        tm_year: i32::try_from(year - 1900).ok()?,
        tm_wday,
        tm_yday,
        tm_isdst: if minutes_west == 0 { 0 } else { -1 },
    })
}

/// Convert broken-down time back to epoch seconds (`mktime` arithmetic).
///
/// Only `tm_year`, `tm_mon`, `tm_mday`, the time of day and `tm_isdst` are
/// read; months outside 0-11 carry into the year. Leap days follow a plain
/// four-year cadence from 1972, so results are exact for 1972 through 2099.
/// Instants before 1972 carry the 10 s leap-second correction.
#[must_use]
pub fn from_calendar(cal: &Calendar) -> i64 {
    let mon = i64::from(cal.tm_mon);
    let year = 1900 + i64::from(cal.tm_year) + mon.div_euclid(12);
    let mon = mon.rem_euclid(12) as usize;

    let leap_days = (year - 1969).div_euclid(4);
    let mut days = (year - 1970) * 365 + leap_days + DAYS_BEFORE_MONTH[mon];
    if mon > 1 && year.rem_euclid(4) == 0 {
        days += 1;
    }
    days += i64::from(cal.tm_mday) - 1;

    let mut hours = i64::from(cal.tm_hour);
    if cal.tm_isdst > 0 {
        hours += 1;
    }

    let mut t = days * SECS_PER_DAY
        + hours * SECS_PER_HOUR
        + i64::from(cal.tm_min) * SECS_PER_MINUTE
        + i64::from(cal.tm_sec);
    if t < LEAP_REFERENCE_EPOCH {
        t += LEAP_SECOND_CORRECTION;
    }
    t
}

/// Difference `end - start` in seconds.
#[must_use]
pub fn difftime(end: i64, start: i64) -> f64 {
    (end as f64) - (start as f64)
}

/// `asctime` text: `"Thu Jan  1 00:00:00 1970\n"`.
#[must_use]
pub fn asctime(cal: &Calendar) -> String {
    format!(
        "{} {}{:3} {:02}:{:02}:{:02} {}\n",
        cal.weekday_abbr(),
        cal.month_abbr(),
        cal.tm_mday,
        cal.tm_hour,
        cal.tm_min,
        cal.tm_sec,
        cal.full_year()
    )
}
