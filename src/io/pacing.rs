//! Cooperative cancellation and yield points.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Shared flag a caller sets to stop a running import or export.
///
/// Cloning shares the flag. The pipeline observes it only at yield points,
/// so cancellation takes effect at the next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`Error::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the token is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            metrics::counter!("stockpile_transfer_cancelled_total").increment(1);
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Yield points between batches.
#[derive(Debug, Clone)]
pub struct Pacer {
    pause: Duration,
    token: CancellationToken,
}

impl Pacer {
    /// Creates a pacer pausing `pause` at each checkpoint.
    #[must_use]
    pub const fn new(pause: Duration, token: CancellationToken) -> Self {
        Self { pause, token }
    }

    /// Returns the token observed by this pacer.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Yields the thread for the configured pause, then checks cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token is set before or after the pause.
    pub fn checkpoint(&self) -> Result<()> {
        self.token.check()?;
        if self.pause.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.pause);
        }
        self.token.check()
    }

    /// Checks cancellation for unit `n` and pauses every `interval` units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token is set.
    pub fn tick(&self, n: usize, interval: usize) -> Result<()> {
        if interval > 0 && n > 0 && n % interval == 0 {
            self.checkpoint()
        } else {
            self.token.check()
        }
    }
}
