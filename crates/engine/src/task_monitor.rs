use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared between a running collection and whoever wants to observe or cancel it, possibly from
/// another thread.
#[derive(Default, Debug)]
pub struct TaskMonitor {
    cancelled: AtomicBool,
    max_progress: AtomicUsize,
    progress: AtomicUsize,
    message: Mutex<Option<Arc<String>>>,
}

impl TaskMonitor {
    pub fn new() -> Arc<TaskMonitor> {
        Arc::new(TaskMonitor::default())
    }

    /// Requests cancellation. The collector stops at the next pass boundary and never touches the
    /// scene after that.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn inc_progress(&self) {
        self.progress.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_max_progress(&self, max_progress: usize) {
        self.progress.store(0, Ordering::Relaxed);
        self.max_progress.store(max_progress, Ordering::Relaxed);
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn max_progress(&self) -> usize {
        self.max_progress.load(Ordering::Relaxed)
    }

    pub fn set_message(&self, message: String) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(message));
    }

    pub fn message(&self) -> Option<Arc<String>> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
