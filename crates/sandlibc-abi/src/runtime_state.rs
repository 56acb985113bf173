//! The process runtime.
//!
//! One [`Runtime`] per process, built on first use from the environment
//! ([`NativeHostConfig::from_env`], [`RuntimeConfig::from_env`]). Access is
//! serialized by a lock; a thread that re-enters while it already holds the
//! runtime gets [`RuntimeAccessError::Reentrant`] instead of deadlocking.

use std::cell::Cell;

use parking_lot::Mutex;
use sandlibc_core::{Runtime, RuntimeConfig};

use crate::native_host::{NativeHost, NativeHostConfig};

static RUNTIME: Mutex<Option<Runtime<NativeHost>>> = parking_lot::const_mutex(None);

std::thread_local! {
    static ENTERED: Cell<bool> = const { Cell::new(false) };
}

/// Why the process runtime could not be borrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeAccessError {
    #[error("runtime is already borrowed on this thread")]
    Reentrant,
}

/// Marks the current thread as inside the runtime until dropped, including
/// on unwind.
struct EntryGuard;

impl EntryGuard {
    fn enter() -> Result<Self, RuntimeAccessError> {
        if ENTERED.with(|entered| entered.replace(true)) {
            return Err(RuntimeAccessError::Reentrant);
        }
        Ok(Self)
    }
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        ENTERED.with(|entered| entered.set(false));
    }
}

fn build(host: NativeHostConfig, runtime: RuntimeConfig) -> Runtime<NativeHost> {
    Runtime::with_config(NativeHost::new(host), runtime)
}

/// Runs `f` on the process runtime, creating it on first use.
pub fn with_runtime<R>(
    f: impl FnOnce(&mut Runtime<NativeHost>) -> R,
) -> Result<R, RuntimeAccessError> {
    let _entry = EntryGuard::enter()?;
    let mut slot = RUNTIME.lock();
    let rt = slot.get_or_insert_with(|| {
        build(NativeHostConfig::from_env(), RuntimeConfig::from_env())
    });
    Ok(f(rt))
}

/// Replaces the process runtime with a fresh one. Returns the previous
/// runtime, whose streams have not been flushed.
pub fn install(
    host: NativeHostConfig,
    runtime: RuntimeConfig,
) -> Result<Option<Runtime<NativeHost>>, RuntimeAccessError> {
    let _entry = EntryGuard::enter()?;
    let mut slot = RUNTIME.lock();
    Ok(slot.replace(build(host, runtime)))
}

/// Flushes every stream and drops the process runtime. The next entry point
/// builds a new one.
pub fn shutdown() -> Result<(), RuntimeAccessError> {
    let _entry = EntryGuard::enter()?;
    let mut slot = RUNTIME.lock();
    if let Some(rt) = slot.as_mut() {
        rt.fflush(None);
    }
    *slot = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_nested_entry_and_resets() {
        let outer = EntryGuard::enter().expect("outer");
        assert_eq!(EntryGuard::enter().err(), Some(RuntimeAccessError::Reentrant));
        drop(outer);
        assert!(EntryGuard::enter().is_ok());
    }

    #[test]
    fn guard_is_per_thread() {
        let _outer = EntryGuard::enter().expect("outer");
        let other = std::thread::spawn(|| EntryGuard::enter().is_ok())
            .join()
            .expect("thread");
        assert!(other);
    }
}
