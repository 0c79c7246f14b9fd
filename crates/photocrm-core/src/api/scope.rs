use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness handle for a view that issued requests.
///
/// In-flight calls are not aborted when a view goes away; their results are
/// simply not applied once the scope is closed.
#[derive(Debug, Clone)]
pub struct ViewScope {
    active: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run `apply` only if the view is still active. Returns whether it ran.
    pub fn apply_if_active<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if self.is_active() {
            apply(value);
            true
        } else {
            false
        }
    }

    /// Await `fut` and keep its output only if the view outlived it.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let output = fut.await;
        self.is_active().then_some(output)
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}
