//! Resend throttling.
//!
//! After every successful dispatch the "Resend code" action is locked for a
//! fixed cooldown that counts down once per second. The countdown runs on
//! an owned Tokio task that is cancelled on restart, on `stop()` and on drop.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Default cooldown between dispatches, in seconds.
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 30;

/// Configuration for resend throttling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Seconds the resend action stays locked after a dispatch.
    pub cooldown_secs: u32,
    /// Wall-clock length of one countdown step.
    pub tick_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl ThrottleConfig {
    /// Creates a config with the given cooldown and a one-second tick.
    pub fn new(cooldown_secs: u32) -> Self {
        Self {
            cooldown_secs,
            ..Default::default()
        }
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

/// Observable throttle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleState {
    /// Seconds left before a resend is allowed.
    pub remaining_seconds: u32,
    /// Whether a dispatch request is in flight.
    pub is_dispatching: bool,
}

/// Timer-free countdown.
///
/// `Idle` is `remaining == 0`; a successful dispatch moves it to the full
/// cooldown and each tick takes one second off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    cooldown: u32,
}

impl Countdown {
    /// Creates an idle countdown with the given cooldown.
    pub fn new(cooldown: u32) -> Self {
        Self {
            remaining: 0,
            cooldown,
        }
    }

    /// Restarts the countdown at the full cooldown.
    pub fn on_dispatch_succeed(&mut self) {
        self.remaining = self.cooldown;
    }

    /// Takes one second off, never going below zero. Returns what is left.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// True when a resend is allowed.
    pub fn is_idle(&self) -> bool {
        self.remaining == 0
    }

    /// Returns to idle immediately.
    pub fn reset(&mut self) {
        self.remaining = 0;
    }
}

#[derive(Debug)]
struct Shared {
    countdown: Countdown,
    is_dispatching: bool,
}

#[derive(Debug)]
struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Countdown gate for the resend action, driven by a cancellable ticker.
#[derive(Debug)]
pub struct ResendThrottle {
    config: ThrottleConfig,
    shared: Arc<Mutex<Shared>>,
    ticker: Mutex<Option<Ticker>>,
}

impl Default for ResendThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl ResendThrottle {
    /// Creates an idle throttle.
    pub fn new(config: ThrottleConfig) -> Self {
        let countdown = Countdown::new(config.cooldown_secs);
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared {
                countdown,
                is_dispatching: false,
            })),
            ticker: Mutex::new(None),
        }
    }

    /// Returns the throttle configuration.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> ThrottleState {
        let shared = lock(&self.shared);
        ThrottleState {
            remaining_seconds: shared.countdown.remaining(),
            is_dispatching: shared.is_dispatching,
        }
    }

    /// Seconds left before a resend is allowed.
    pub fn remaining(&self) -> u32 {
        lock(&self.shared).countdown.remaining()
    }

    /// True when the countdown is at zero.
    pub fn is_idle(&self) -> bool {
        lock(&self.shared).countdown.is_idle()
    }

    /// Whether a dispatch is in flight.
    pub fn is_dispatching(&self) -> bool {
        lock(&self.shared).is_dispatching
    }

    /// Marks a dispatch as started. Returns false if one was already in flight.
    pub fn begin_dispatch(&self) -> bool {
        let mut shared = lock(&self.shared);
        if shared.is_dispatching {
            return false;
        }
        shared.is_dispatching = true;
        true
    }

    /// Marks the in-flight dispatch as finished.
    pub fn end_dispatch(&self) {
        lock(&self.shared).is_dispatching = false;
    }

    /// Restarts the countdown at the full cooldown and (re)spawns the ticker.
    ///
    /// Without a Tokio runtime the countdown is set but only advances
    /// through [`ResendThrottle::tick`].
    pub fn on_dispatch_succeed(&self) {
        lock(&self.shared).countdown.on_dispatch_succeed();
        self.restart_ticker();
    }

    /// Takes one second off the countdown. Returns what is left.
    pub fn tick(&self) -> u32 {
        lock(&self.shared).countdown.tick()
    }

    /// True while a ticker task is alive.
    pub fn is_ticking(&self) -> bool {
        lock(&self.ticker)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Cancels the ticker and returns to idle.
    pub fn stop(&self) {
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.cancel();
        }
        let mut shared = lock(&self.shared);
        shared.countdown.reset();
        shared.is_dispatching = false;
    }

    fn restart_ticker(&self) {
        let mut slot = lock(&self.ticker);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, resend countdown will not advance on its own");
            return;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let shared = Arc::clone(&self.shared);
        let period = self.config.tick_interval;

        let handle = runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(period) => {
                        let remaining = lock(&shared).countdown.tick();
                        trace!(remaining, "resend countdown tick");
                        if remaining == 0 {
                            break;
                        }
                    }
                }
            }
        });

        *slot = Some(Ticker { token, handle });
    }
}

impl Drop for ResendThrottle {
    fn drop(&mut self) {
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.cancel();
        }
    }
}
