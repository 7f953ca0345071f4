//! Rolling admission counters for flood control.
//!
//! Two counters gate outbound mail: one cleared by every minute tick, one
//! cleared once a day's worth of minutes has been counted. A single timer
//! drives both windows, so the day boundary follows the tick count rather
//! than the calendar. The window is a single mutex-guarded struct shared
//! between request handling and the tick task.

use parking_lot::Mutex;

/// Minutes counted before the day window rolls over.
const MINUTES_PER_DAY: u32 = 60 * 24;

/// Counter state shared between `mail` calls and the minute tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Requests admitted since the last tick.
    pub count_this_minute: u32,
    /// Requests admitted since the last day rollover.
    pub count_this_day: u32,
    /// Ticks counted since the last day rollover.
    pub minutes_elapsed: u32,
}

/// Admission decision for one request, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    DeniedMinute,
    DeniedDay,
}

/// Flood control over a single identity's send windows.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_minute: u32,
    max_per_day: u32,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_per_minute: u32, max_per_day: u32) -> Self {
        Self {
            max_per_minute,
            max_per_day,
            window: Mutex::new(RateWindow::default()),
        }
    }

    /// Decides whether a request may proceed. Consumes no quota.
    ///
    /// Denial requires a counter to be strictly greater than its maximum,
    /// so a limit of N admits N + 1 requests per window. Callers have seen
    /// that arithmetic for a long time; confirm nobody counts on it before
    /// tightening the comparison.
    #[must_use]
    pub fn admit(&self) -> Admission {
        let window = self.window.lock();

        if window.count_this_minute > self.max_per_minute {
            Admission::DeniedMinute
        } else if window.count_this_day > self.max_per_day {
            Admission::DeniedDay
        } else {
            Admission::Granted
        }
    }

    /// Consumes quota for an admitted request.
    ///
    /// The counters track admitted attempts, not confirmed deliveries;
    /// this runs before the outcome of the send is known.
    pub fn record_sent(&self) {
        let mut window = self.window.lock();
        window.count_this_minute += 1;
        window.count_this_day += 1;
    }

    /// Advances the window by one minute.
    ///
    /// Clears the minute counter every time; clears the day counter once
    /// more than a full day of minutes has been counted.
    pub fn tick(&self) {
        let mut window = self.window.lock();
        window.count_this_minute = 0;
        window.minutes_elapsed += 1;

        if window.minutes_elapsed > MINUTES_PER_DAY {
            window.minutes_elapsed = 0;
            window.count_this_day = 0;
        }
    }

    /// Snapshot of the current window, for logging and tests.
    #[must_use]
    pub fn window(&self) -> RateWindow {
        *self.window.lock()
    }
}
