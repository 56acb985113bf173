//! Allocator lifecycle traces as structured log entries.

use serde_json::json;

use sandlibc_core::errno::{EINVAL, ENOMEM};
use sandlibc_core::malloc::{AllocatorLogLevel, AllocatorLogRecord, HeapLimits};
use sandlibc_core::{Runtime, RuntimeConfig};
use sandlibc_membrane::{DiagnosticMode, SimHost};

use crate::structured_log::{LogEntry, LogLevel, Outcome};

/// Converts one allocator record into a log entry.
#[must_use]
pub fn to_log_entry(record: &AllocatorLogRecord, mode: DiagnosticMode) -> LogEntry {
    let level = match record.level {
        AllocatorLogLevel::Trace => LogLevel::Trace,
        AllocatorLogLevel::Debug => LogLevel::Debug,
        AllocatorLogLevel::Info => LogLevel::Info,
        AllocatorLogLevel::Warn => LogLevel::Warn,
        AllocatorLogLevel::Error => LogLevel::Error,
    };
    let mut entry = LogEntry::new(record.trace_id.clone(), level, record.event)
        .with_api("malloc", record.symbol)
        .with_mode(mode.as_str())
        .with_details(json!({
            "decision_id": record.decision_id,
            "addr": record.addr,
            "size": record.size,
            "block": record.block,
            "outcome": record.outcome,
            "details": record.details,
            "active_blocks": record.active_blocks,
            "used_bytes": record.used_bytes,
            "pages": record.pages,
            "descriptors": record.descriptors,
        }));
    entry = match record.outcome {
        "success" | "noop" => entry.with_outcome(Outcome::Pass),
        "oom" | "denied" => entry.with_outcome(Outcome::Fail).with_errno(ENOMEM),
        "ignored" => entry.with_outcome(Outcome::Error).with_errno(EINVAL),
        _ => entry,
    };
    entry
}

/// Allocates each size in order, then frees every grant in reverse, on a
/// fresh silent runtime. Returns the lifecycle as log entries.
#[must_use]
pub fn trace_sizes(sizes: &[usize], heap: HeapLimits) -> Vec<LogEntry> {
    let config = RuntimeConfig {
        diagnostics: DiagnosticMode::Silent,
        heap,
    };
    let mut rt = Runtime::with_config(SimHost::new(), config);
    let grants: Vec<_> = sizes.iter().filter_map(|&size| rt.malloc(size)).collect();
    for grant in grants.into_iter().rev() {
        rt.free(grant);
    }
    rt.heap_mut()
        .drain_lifecycle_logs()
        .iter()
        .map(|record| to_log_entry(record, config.diagnostics))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_grant_is_traced_and_released() {
        let entries = trace_sizes(&[16, 4000, 100], HeapLimits::default());
        let allocs = entries
            .iter()
            .filter(|e| e.event == "alloc" && e.outcome == Some(Outcome::Pass))
            .count();
        let frees = entries.iter().filter(|e| e.event == "free").count();
        assert_eq!(allocs, 3);
        assert_eq!(frees, 3);
        let last = entries.last().expect("entries");
        assert_eq!(last.details.as_ref().map(|d| d["active_blocks"].clone()), Some(json!(0)));
        assert!(entries.iter().all(|e| e.mode.as_deref() == Some("silent")));
    }

    #[test]
    fn exhaustion_is_a_failed_entry() {
        let limits = HeapLimits {
            max_pages: 1,
            ..HeapLimits::default()
        };
        let entries = trace_sizes(&[1 << 20], limits);
        let oom = entries
            .iter()
            .find(|e| e.outcome == Some(Outcome::Fail))
            .expect("oom entry");
        assert_eq!(oom.errno, Some(ENOMEM));
        assert_eq!(oom.symbol.as_deref(), Some("malloc"));
    }
}
