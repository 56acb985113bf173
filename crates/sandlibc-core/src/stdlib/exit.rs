//! `atexit` handler registry.

/// Handlers that may be registered at once.
pub const ATEXIT_MAX: usize = 32;

type Handler = Box<dyn FnOnce() + Send>;

/// Registered exit handlers, run newest first.
#[derive(Default)]
pub struct ExitHandlers {
    handlers: Vec<Handler>,
}

impl ExitHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `atexit`. Returns `false` once [`ATEXIT_MAX`] handlers are registered.
    pub fn register(&mut self, handler: impl FnOnce() + Send + 'static) -> bool {
        if self.handlers.len() >= ATEXIT_MAX {
            return false;
        }
        self.handlers.push(Box::new(handler));
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Take every handler out and run them in reverse registration order.
    /// Handlers registered while running are not run.
    pub fn run(&mut self) {
        let handlers = std::mem::take(&mut self.handlers);
        for handler in handlers.into_iter().rev() {
            handler();
        }
    }
}

impl std::fmt::Debug for ExitHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitHandlers")
            .field("registered", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use parking_lot::Mutex;

    #[test]
    fn runs_in_reverse_order_once() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = ExitHandlers::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            assert!(handlers.register(move || order.lock().push(i)));
        }
        handlers.run();
        handlers.run();
        assert_eq!(*order.lock(), vec![2, 1, 0]);
        assert!(handlers.is_empty());
    }

    #[test]
    fn registration_is_bounded() {
        let mut handlers = ExitHandlers::new();
        for _ in 0..ATEXIT_MAX {
            assert!(handlers.register(|| {}));
        }
        assert!(!handlers.register(|| {}));
        assert_eq!(handlers.len(), ATEXIT_MAX);
    }
}
