use std::{fmt, future::pending, pin::Pin, time::Duration};

use tokio::time::{Instant, Sleep, sleep_until};

/// A cancelable one-shot timer with at most one pending deadline.
///
/// Intended to be polled from a `tokio::select!` loop through [`Timer::fired`],
/// which never resolves while the timer is unarmed.
#[derive(Default)]
pub struct Timer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn schedule(&mut self, delay: Duration) {
        let deadline = Instant::now() + delay;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(sleep_until(deadline))),
        }
    }

    /// Arms the timer unless it is already pending, returns whether it was armed.
    pub fn schedule_if_idle(&mut self, delay: Duration) -> bool {
        if self.is_armed() {
            false
        } else {
            self.schedule(delay);
            true
        }
    }

    /// Returns whether a pending deadline was canceled.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|s| s.deadline())
    }

    /// Resolves once the pending deadline elapses and disarms the timer.
    ///
    /// Cancel safe, dropping the future keeps the deadline armed.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("deadline", &self.deadline())
            .finish()
    }
}
