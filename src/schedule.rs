use std::collections::VecDeque;

/// Monotonically increasing tag given to each deferred dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(pub u64);

/// Coalesces rapid-fire requests so only the newest one is ever applied.
///
/// `dispatch` queues work tagged with a fresh generation. The work runs at
/// the next [`Coalescer::run_pending`] (the next frame); anything whose
/// generation is no longer current at that point is discarded, never applied.
#[derive(Debug)]
pub struct Coalescer<T> {
    current: Generation,
    pending: VecDeque<(Generation, T)>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            current: Generation(0),
            pending: VecDeque::new(),
        }
    }
}

impl<T> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` and make it the current generation.
    pub fn dispatch(&mut self, task: T) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.pending.push_back((self.current, task));
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.current
    }

    /// Whether a dispatched task is still waiting to run.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the queue, applying only the task tagged with the current
    /// generation. Returns the number of stale tasks discarded.
    pub fn run_pending(&mut self, mut apply: impl FnMut(Generation, T)) -> usize {
        let mut discarded = 0;
        while let Some((generation, task)) = self.pending.pop_front() {
            if self.is_current(generation) {
                apply(generation, task);
            } else {
                log::trace!(
                    "discarding stale generation {} (current {})",
                    generation.0,
                    self.current.0
                );
                discarded += 1;
            }
        }
        discarded
    }
}
