//! Key sequence generators

/// Source of auto-assigned document keys
///
/// `next(after)` must return a value strictly greater than `after`. A
/// collection rejects the commit otherwise.
pub trait IdSequence: Send + Sync {
    fn next(&self, after: u64) -> u64;
}

/// Dense keys: `after + 1`
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicSequence;

impl IdSequence for MonotonicSequence {
    fn next(&self, after: u64) -> u64 {
        after.saturating_add(1)
    }
}

/// Keys spaced `step` apart, leaving room for explicit keys in between
#[derive(Debug, Clone, Copy)]
pub struct StepSequence {
    step: u64,
}

impl StepSequence {
    pub fn new(step: u64) -> Self {
        Self { step: step.max(1) }
    }
}

impl IdSequence for StepSequence {
    fn next(&self, after: u64) -> u64 {
        after.saturating_add(self.step)
    }
}
