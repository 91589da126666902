use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
}

/// Cancellation handle threaded through a run. Clones share the cancel flag.
/// No deadline means waits are unbounded.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// `None` or a zero duration means no timeout.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(t) if !t.is_zero() => Self::with_timeout(t),
            _ => Self::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Interrupted::TimedOut),
            _ => Ok(()),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let t = CancelToken::new();
        assert_eq!(t.check(), Ok(()));
        assert_eq!(t.remaining(), None);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let t = CancelToken::new();
        let c = t.clone();
        c.cancel();
        assert_eq!(t.check(), Err(Interrupted::Cancelled));
    }

    #[test]
    fn expired_deadline_times_out() {
        let t = CancelToken::with_timeout(Duration::ZERO);
        assert_eq!(t.check(), Err(Interrupted::TimedOut));
    }

    #[test]
    fn zero_timeout_from_config_means_unbounded() {
        assert_eq!(CancelToken::from_timeout(Some(Duration::ZERO)).remaining(), None);
        assert!(CancelToken::from_timeout(Some(Duration::from_secs(5))).remaining().is_some());
    }
}
