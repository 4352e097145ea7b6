//! Cooperative cancellation and progress reporting.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct TaskState {
    cancelled: AtomicBool,
    progress: AtomicU64,
    status: Mutex<String>,
}

/// Handle shared between a long running operation and whoever may cancel it.
///
/// Clones refer to the same task. Operations poll [`Task::is_cancelled`]
/// between elements and return what they have so far when it is set.
#[derive(Debug, Clone, Default)]
pub struct Task {
    state: Arc<TaskState>,
}

impl Task {
    /// Create a task that is not cancelled, at progress 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once [`Task::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Relaxed)
    }

    /// Set progress (0..=1) and a status line.
    pub fn update(&self, progress: f64, status: &str) {
        self.set_progress(progress);
        let mut current = match self.state.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current != status {
            current.clear();
            current.push_str(status);
        }
    }

    /// Set progress without touching the status line.
    pub fn set_progress(&self, progress: f64) {
        let clamped = progress.clamp(0.0, 1.0);
        self.state.progress.store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// Last reported progress.
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.state.progress.load(Ordering::Relaxed))
    }

    /// Last reported status line.
    pub fn status(&self) -> String {
        match self.state.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// True if a task was given and has been cancelled.
pub(crate) fn is_cancelled(task: Option<&Task>) -> bool {
    task.is_some_and(Task::is_cancelled)
}

/// Report progress on an optional task.
pub(crate) fn report(task: Option<&Task>, done: usize, total: usize) {
    if let Some(task) = task {
        if total > 0 {
            task.set_progress(done as f64 / total as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let task = Task::new();
        let other = task.clone();
        assert!(!other.is_cancelled());

        task.cancel();
        assert!(other.is_cancelled());
        assert!(is_cancelled(Some(&other)));
        assert!(!is_cancelled(None));
    }

    #[test]
    fn test_progress_and_status() {
        let task = Task::new();
        assert_eq!(task.progress(), 0.0);
        assert_eq!(task.status(), "");

        task.update(0.25, "Reading STL");
        assert_eq!(task.progress(), 0.25);
        assert_eq!(task.status(), "Reading STL");

        task.set_progress(3.0);
        assert_eq!(task.progress(), 1.0);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let task = Task::new();
        let remote = task.clone();
        std::thread::spawn(move || remote.cancel())
            .join()
            .unwrap();
        assert!(task.is_cancelled());
    }

    #[test]
    fn test_report_ignores_empty_total() {
        let task = Task::new();
        report(Some(&task), 5, 0);
        assert_eq!(task.progress(), 0.0);
        report(Some(&task), 1, 4);
        assert_eq!(task.progress(), 0.25);
    }
}
