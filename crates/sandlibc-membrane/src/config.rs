//! Diagnostic reporting configuration.
//!
//! The mode is set via the `SANDLIBC_DIAGNOSTICS` environment variable:
//! - `report` (default): misuse and unsupported-operation diagnostics are
//!   written to the host console as `ERROR: <message>` lines.
//! - `silent`: diagnostics are only counted.
//!
//! Diagnostics are counted in both modes.

use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable consulted by [`diagnostic_mode`].
pub const DIAGNOSTICS_ENV: &str = "SANDLIBC_DIAGNOSTICS";

/// Where diagnostics go.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticMode {
    /// Count and print to the host console.
    #[default]
    Report,
    /// Count only.
    Silent,
}

impl DiagnosticMode {
    /// Parse from string (case-insensitive). Unknown values report.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" | "quiet" | "none" => Self::Silent,
            _ => Self::Report,
        }
    }

    /// Returns true if diagnostics are written to the console.
    #[must_use]
    pub const fn emits(self) -> bool {
        matches!(self, Self::Report)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Silent => "silent",
        }
    }
}

// 0=unresolved, 1=Report, 2=Silent.
static CACHED_MODE: AtomicU8 = AtomicU8::new(0);

const MODE_UNRESOLVED: u8 = 0;
const MODE_REPORT: u8 = 1;
const MODE_SILENT: u8 = 2;

fn mode_to_u8(mode: DiagnosticMode) -> u8 {
    match mode {
        DiagnosticMode::Report => MODE_REPORT,
        DiagnosticMode::Silent => MODE_SILENT,
    }
}

fn u8_to_mode(v: u8) -> DiagnosticMode {
    match v {
        MODE_SILENT => DiagnosticMode::Silent,
        _ => DiagnosticMode::Report,
    }
}

/// Get the configured diagnostic mode (reads the environment on first call,
/// caches thereafter).
#[must_use]
pub fn diagnostic_mode() -> DiagnosticMode {
    let cached = CACHED_MODE.load(Ordering::Acquire);
    if cached != MODE_UNRESOLVED {
        return u8_to_mode(cached);
    }
    let mode = std::env::var(DIAGNOSTICS_ENV)
        .map(|v| DiagnosticMode::from_str_loose(&v))
        .unwrap_or_default();
    // A racing resolver read the same environment, so either store wins.
    let _ = CACHED_MODE.compare_exchange(
        MODE_UNRESOLVED,
        mode_to_u8(mode),
        Ordering::AcqRel,
        Ordering::Acquire,
    );
    u8_to_mode(CACHED_MODE.load(Ordering::Acquire))
}
