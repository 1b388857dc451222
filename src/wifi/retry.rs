/// Bounded count of consecutive failed association attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    retry_count: u32,
    max_retry: u32,
}

impl RetryPolicy {
    pub fn new(max_retry: u32) -> Self {
        Self {
            retry_count: 0,
            max_retry,
        }
    }

    /// True while the session still has reconnect budget left.
    pub fn should_retry(&self) -> bool {
        self.retry_count < self.max_retry
    }

    pub fn record_failure(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.retry_count = 0;
    }

    /// Start a new session with a fresh budget.
    pub fn reset(&mut self, max_retry: u32) {
        self.retry_count = 0;
        self.max_retry = max_retry;
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }
}
