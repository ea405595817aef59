use std::cell::{Cell, RefCell};

/// Observer of sort progress. Has no effect on the result.
pub trait Progress {
    /// A new phase of `total` units of work begins.
    fn start(&self, total: usize, message: &str);

    /// One unit of work of the current phase is done.
    fn tick(&self);

    /// The current phase is done.
    fn finish(&self) {}
}

/// Ignores all progress.
#[derive(Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _total: usize, _message: &str) {}

    fn tick(&self) {}
}

/// Logs progress at info level on every further 10% of a phase.
#[derive(Default)]
pub struct LogProgress {
    message: RefCell<String>,
    total: Cell<usize>,
    done: Cell<usize>,
    reported: Cell<usize>,
}

impl LogProgress {
    pub fn new() -> LogProgress {
        LogProgress::default()
    }

    fn percent(&self) -> usize {
        let total = self.total.get();
        if total == 0 {
            100
        } else {
            (self.done.get() * 100 / total).min(100)
        }
    }
}

impl Progress for LogProgress {
    fn start(&self, total: usize, message: &str) {
        self.message.replace(message.to_string());
        self.total.set(total);
        self.done.set(0);
        self.reported.set(0);
        log::info!("{} 0/{}", message, total);
    }

    fn tick(&self) {
        self.done.set(self.done.get() + 1);
        let percent = self.percent();
        if percent >= self.reported.get() + 10 {
            self.reported.set(percent - percent % 10);
            log::info!("{} {}/{} ({}%)", self.message.borrow(), self.done.get(), self.total.get(), percent);
        }
    }

    fn finish(&self) {
        log::info!("{} done, {} units", self.message.borrow(), self.done.get());
    }
}

#[cfg(test)]
mod tests {
    use crate::progress::{LogProgress, Progress};

    #[test]
    fn test_log_progress_counts() {
        let progress = LogProgress::new();
        progress.start(20, "Sorting chunks");
        for _ in 0..15 {
            progress.tick();
        }
        assert_eq!(progress.done.get(), 15);
        assert_eq!(progress.reported.get(), 70);
        progress.finish();
        assert_eq!(progress.message.borrow().as_str(), "Sorting chunks");

        progress.start(0, "Merging");
        assert_eq!(progress.done.get(), 0);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_estimate_overrun_is_capped() {
        let progress = LogProgress::new();
        progress.start(2, "Splitting");
        for _ in 0..5 {
            progress.tick();
        }
        assert_eq!(progress.percent(), 100);
        assert_eq!(progress.reported.get(), 100);
    }
}
