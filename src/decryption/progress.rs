//! src/decryption/progress.rs

/// Throttles progress callbacks to one per `interval` pages.
///
/// The sequence a caller sees is `(0, total)` once, then every `interval`-th
/// page, and `(total, total)` only when [`finish`](Self::finish) is called
/// after the work is durable. `done` never decreases.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    total: u64,
    interval: u64,
    reported: Option<u64>,
}

impl ProgressTracker {
    pub const fn new(total: u64, interval: u64) -> Self {
        Self {
            total,
            interval: if interval == 0 { 1 } else { interval },
            reported: None,
        }
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Announce the start of work.
    pub fn start<F: FnMut(u64, u64)>(&mut self, on_progress: &mut F) {
        self.emit(0, on_progress);
    }

    /// Record that `done` pages are finished. Completion itself is held
    /// back for [`finish`](Self::finish).
    pub fn advance<F: FnMut(u64, u64)>(&mut self, done: u64, on_progress: &mut F) {
        if done < self.total && done % self.interval == 0 {
            self.emit(done, on_progress);
        }
    }

    /// Report `(total, total)`. Call only once the result has succeeded.
    pub fn finish<F: FnMut(u64, u64)>(&mut self, on_progress: &mut F) {
        self.emit(self.total, on_progress);
    }

    fn emit<F: FnMut(u64, u64)>(&mut self, done: u64, on_progress: &mut F) {
        if self.reported == Some(done) {
            return;
        }
        self.reported = Some(done);
        on_progress(done, self.total);
    }
}
