//! Diagnostic taxonomy.
//!
//! Misuse of a handle and requests for unsupported behaviour never terminate
//! the process. The runtime turns them into a `Diagnostic`, counts it, and
//! (in report mode) writes its message to the console, then returns an
//! ordinary failure value to the caller.

use std::sync::atomic::{AtomicU64, Ordering};

/// Broad class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticClass {
    /// The caller passed a handle or pointer the runtime does not own, or
    /// used a stream in a way its capabilities forbid.
    Misuse,
    /// The operation exists but is not implemented for this target.
    Unsupported,
}

/// A reportable misuse or unsupported-operation event.
///
/// `Display` is the console message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("Segmentation fault: Invalid ptr given to {op}")]
    InvalidPointer { op: &'static str, addr: usize },
    #[error("Index out of bounds: Invalid ptr given to {op}")]
    PointerOutOfBounds { op: &'static str, addr: usize },
    #[error("Double free: block {block} is not in use")]
    DoubleRelease { addr: usize, block: u32 },
    #[error("Only supports mode 'rb', got '{mode}'")]
    UnsupportedOpenMode { mode: String },
    #[error("Cannot put char in read only stream")]
    WriteToReadOnly { slot: usize },
    #[error("Stream {slot} is not open")]
    StreamNotOpen { slot: usize },
    #[error("{op} is not implemented for writable files")]
    PositioningUnsupported { op: &'static str, slot: usize },
    #[error("Seeking from the end of a stream is not supported")]
    SeekFromEnd { slot: usize },
    #[error("Cannot push back into stream {slot}")]
    UngetRejected { slot: usize },
    #[error("Unknown buffering mode {mode}")]
    UnknownBufferMode { mode: i32 },
    #[error("{op} not yet implemented")]
    Unsupported { op: &'static str },
}

impl Diagnostic {
    #[must_use]
    pub const fn class(&self) -> DiagnosticClass {
        match self {
            Self::InvalidPointer { .. }
            | Self::PointerOutOfBounds { .. }
            | Self::DoubleRelease { .. }
            | Self::WriteToReadOnly { .. }
            | Self::StreamNotOpen { .. }
            | Self::UngetRejected { .. }
            | Self::UnknownBufferMode { .. } => DiagnosticClass::Misuse,
            Self::UnsupportedOpenMode { .. }
            | Self::PositioningUnsupported { .. }
            | Self::SeekFromEnd { .. }
            | Self::Unsupported { .. } => DiagnosticClass::Unsupported,
        }
    }

    /// Stable machine-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidPointer { .. } => "invalid_pointer",
            Self::PointerOutOfBounds { .. } => "pointer_out_of_bounds",
            Self::DoubleRelease { .. } => "double_release",
            Self::UnsupportedOpenMode { .. } => "unsupported_open_mode",
            Self::WriteToReadOnly { .. } => "write_to_read_only",
            Self::StreamNotOpen { .. } => "stream_not_open",
            Self::PositioningUnsupported { .. } => "positioning_unsupported",
            Self::SeekFromEnd { .. } => "seek_from_end",
            Self::UngetRejected { .. } => "unget_rejected",
            Self::UnknownBufferMode { .. } => "unknown_buffer_mode",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

/// Point-in-time copy of [`DiagnosticPolicy`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub total: u64,
    pub misuse: u64,
    pub unsupported: u64,
}

/// Diagnostic counters.
pub struct DiagnosticPolicy {
    /// Every diagnostic recorded.
    pub total: AtomicU64,
    /// Handle and capability misuse.
    pub misuse: AtomicU64,
    /// Unsupported operations.
    pub unsupported: AtomicU64,
}

impl DiagnosticPolicy {
    /// Create a new policy with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            misuse: AtomicU64::new(0),
            unsupported: AtomicU64::new(0),
        }
    }

    /// Record a diagnostic.
    pub fn record(&self, diagnostic: &Diagnostic) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match diagnostic.class() {
            DiagnosticClass::Misuse => {
                self.misuse.fetch_add(1, Ordering::Relaxed);
            }
            DiagnosticClass::Unsupported => {
                self.unsupported.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            total: self.total.load(Ordering::Relaxed),
            misuse: self.misuse.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
        }
    }
}

impl Default for DiagnosticPolicy {
    fn default() -> Self {
        Self::new()
    }
}
