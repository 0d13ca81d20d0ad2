//! When to repeat a round trip after inspecting the device status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fiscalwire_frame::DeviceStatus;
use tracing::warn;

/// Decides whether a response should trigger another attempt.
///
/// Consulted before the error check, so a policy can retry on statuses that
/// would otherwise fail the call. `attempt` starts at 1.
pub trait RetryPolicy {
    fn should_retry(&mut self, status: &DeviceStatus, attempt: u32) -> bool;
}

impl<F> RetryPolicy for F
where
    F: FnMut(&DeviceStatus, u32) -> bool,
{
    fn should_retry(&mut self, status: &DeviceStatus, attempt: u32) -> bool {
        self(status, attempt)
    }
}

/// Never retries. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn should_retry(&mut self, _status: &DeviceStatus, _attempt: u32) -> bool {
        false
    }
}

/// Waits out ribbon problems: on ribbon-out or control-ribbon error, notify,
/// sleep, and retry.
pub struct RibbonWait<N> {
    notify: N,
    delay: Duration,
}

/// Default pause between ribbon checks.
pub const DEFAULT_RIBBON_DELAY: Duration = Duration::from_secs(1);

impl RibbonWait<fn(&DeviceStatus)> {
    /// Log a warning on each ribbon error.
    pub fn new(delay: Duration) -> Self {
        Self {
            notify: log_ribbon,
            delay,
        }
    }
}

impl Default for RibbonWait<fn(&DeviceStatus)> {
    fn default() -> Self {
        Self::new(DEFAULT_RIBBON_DELAY)
    }
}

impl<N: FnMut(&DeviceStatus)> RibbonWait<N> {
    /// Call `notify` on each ribbon error, e.g. to prompt an operator.
    ///
    /// No delay follows the callback; it returns once the operator is done.
    pub fn with_notify(notify: N) -> Self {
        Self {
            notify,
            delay: Duration::ZERO,
        }
    }
}

fn log_ribbon(status: &DeviceStatus) {
    warn!(%status, "printer is out of ribbon");
}

impl<N: FnMut(&DeviceStatus)> RetryPolicy for RibbonWait<N> {
    fn should_retry(&mut self, status: &DeviceStatus, _attempt: u32) -> bool {
        if !(status.is_ribbon_out() || status.is_control_ribbon_error()) {
            return false;
        }
        (self.notify)(status);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        true
    }
}

/// Shared flag that stops a session between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, e.g. for a signal handler.
    pub fn as_atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}
