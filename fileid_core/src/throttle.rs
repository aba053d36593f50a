//! Wire request throttle
//!
//! AniDB bans clients that send too fast or hammer the API continuously for
//! too long. This module enforces both rules: a minimum spacing between any
//! two wire requests, and a periodic cooldown once a bulk window of continuous
//! activity has been open for too long. An idle gap longer than the idle
//! threshold counts as a natural interruption and restarts the window without
//! a cooldown.
//!
//! One instance is shared by every caller in the process; the async mutex over
//! the state is the serialization point, so waiting callers suspend instead of
//! spinning. The throttle never rejects — it only delays.
//!
//! Enforcement is per-process. A second process with its own throttle is not
//! coordinated with this one.

use log::{debug, trace};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Throttle timing parameters.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum spacing between consecutive wire requests.
    pub normal_spacing: Duration,
    /// Stricter spacing applied to FILE lookups.
    pub lookup_spacing: Duration,
    /// A gap longer than this counts as an interruption of bulk activity.
    pub idle_threshold: Duration,
    /// Continuous activity beyond this triggers a cooldown.
    pub window_limit: Duration,
    /// Length of the forced pause after a saturated bulk window.
    pub cooldown: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            normal_spacing: Duration::from_millis(2500),
            lookup_spacing: Duration::from_secs(4),
            idle_threshold: Duration::from_secs(120),
            window_limit: Duration::from_secs(30 * 60),
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// Class of wire request, selecting which spacing applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Generic,
    FileLookup,
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_request: Option<Instant>,
    window_started: Option<Instant>,
    requests_in_window: u32,
}

/// Snapshot of the bulk window bookkeeping, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStats {
    pub requests_in_window: u32,
    pub window_age: Option<Duration>,
}

/// Process-wide request gate. Construct once and share via `Arc`.
pub struct RequestThrottle {
    config: ThrottleConfig,
    state: Mutex<ThrottleState>,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Suspend until it is safe to issue the next wire request, then reserve
    /// the turn. The turn is held until this call returns; no second caller
    /// can pass the gate within the minimum spacing.
    ///
    /// Ordering between concurrent callers is whoever acquires the gate next;
    /// every waiter eventually runs.
    pub async fn acquire(&self, kind: RequestKind) {
        let mut state = self.state.lock().await;

        let spacing = match kind {
            RequestKind::Generic => self.config.normal_spacing,
            RequestKind::FileLookup => self.config.lookup_spacing,
        };

        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < spacing {
                let wait = spacing - elapsed;
                trace!("throttle: waiting {wait:?} before next request");
                sleep(wait).await;
            }
        }

        // Gap since the previous request, including the spacing wait above.
        let gap = state.last_request.map(|last| last.elapsed());
        state.last_request = Some(Instant::now());

        let interrupted = gap.is_none_or(|g| g > self.config.idle_threshold);
        match state.window_started {
            Some(window_started) if !interrupted => {
                state.requests_in_window += 1;

                let open_for = window_started.elapsed();
                if open_for >= self.config.window_limit {
                    debug!(
                        "throttle: bulk window open {open_for:?} ({} requests), cooling down {:?}",
                        state.requests_in_window, self.config.cooldown
                    );
                    sleep(self.config.cooldown).await;
                    state.window_started = Some(Instant::now());
                    state.requests_in_window = 1;
                    state.last_request = Some(Instant::now());
                }
            }
            _ => {
                state.window_started = Some(Instant::now());
                state.requests_in_window = 1;
            }
        }
    }

    /// Current bulk window bookkeeping.
    pub async fn stats(&self) -> ThrottleStats {
        let state = self.state.lock().await;
        ThrottleStats {
            requests_in_window: state.requests_in_window,
            window_age: state.window_started.map(|w| w.elapsed()),
        }
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let throttle = RequestThrottle::default();

        let start = Instant::now();
        throttle.acquire(RequestKind::Generic).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimum_spacing_between_requests() {
        let throttle = RequestThrottle::default();

        let start = Instant::now();
        throttle.acquire(RequestKind::Generic).await;
        throttle.acquire(RequestKind::Generic).await;
        assert!(start.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_lookups_use_stricter_spacing() {
        let throttle = RequestThrottle::default();

        throttle.acquire(RequestKind::FileLookup).await;
        let start = Instant::now();
        throttle.acquire(RequestKind::FileLookup).await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_natural_gap() {
        let throttle = RequestThrottle::default();

        throttle.acquire(RequestKind::Generic).await;
        sleep(Duration::from_secs(10)).await;

        let start = Instant::now();
        throttle.acquire(RequestKind::Generic).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_window_triggers_cooldown() {
        let config = ThrottleConfig::default();
        let cooldown = config.cooldown;
        let spacing = config.normal_spacing;
        let throttle = RequestThrottle::new(config);

        // 720 requests back to back keep the window open for exactly the
        // 30 minute limit without ever hitting the idle threshold.
        for _ in 0..720 {
            throttle.acquire(RequestKind::Generic).await;
        }

        let start = Instant::now();
        throttle.acquire(RequestKind::Generic).await;
        let paused_for = start.elapsed();

        assert!(paused_for >= cooldown, "expected cooldown, got {paused_for:?}");
        assert!(paused_for < cooldown + spacing + Duration::from_secs(1));

        // Window restarted after the cooldown.
        let stats = throttle.stats().await;
        assert_eq!(stats.requests_in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_gap_resets_window_without_cooldown() {
        let throttle = RequestThrottle::default();

        for _ in 0..3 {
            throttle.acquire(RequestKind::Generic).await;
        }
        assert_eq!(throttle.stats().await.requests_in_window, 3);

        sleep(Duration::from_secs(3 * 60)).await;

        let start = Instant::now();
        throttle.acquire(RequestKind::Generic).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(throttle.stats().await.requests_in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        use std::sync::Arc;

        let throttle = Arc::new(RequestThrottle::default());
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.acquire(RequestKind::Generic).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Three turns, two enforced gaps.
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }
}
