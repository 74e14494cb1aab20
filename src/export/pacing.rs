use std::time::Duration;

/// Page size requested from every listing endpoint. Spotify caps it at 50.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Fallback when a rate-limited response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(3);

/// Shortest backoff ever slept after a rate-limited response.
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Consecutive rate-limited attempts tolerated on a single page.
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 10;

/// Timing knobs shared by the paginator and the exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    pub page_size: u32,
    /// Pause after a page that announced more data.
    pub page_delay: Duration,
    /// Pause after all items of one playlist have been fetched.
    pub playlist_delay: Duration,
    pub default_retry_after: Duration,
    /// `None` retries rate-limited pages forever.
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::from_millis(50),
            playlist_delay: Duration::from_millis(100),
            default_retry_after: DEFAULT_RETRY_AFTER,
            max_rate_limit_retries: Some(DEFAULT_MAX_RATE_LIMIT_RETRIES),
        }
    }
}

impl Pacing {
    /// Computes the sleep before retrying a rate-limited page.
    ///
    /// The advertised value is truncated to whole seconds and never drops
    /// below [`MIN_BACKOFF`], so `0`, negative and sub-second values all
    /// wait one second.
    pub fn backoff(&self, retry_after: Option<f64>) -> Duration {
        let seconds = retry_after.unwrap_or(self.default_retry_after.as_secs_f64());
        let whole = if seconds.is_finite() && seconds > 0.0 {
            seconds.trunc() as u64
        } else {
            0
        };
        Duration::from_secs(whole).max(MIN_BACKOFF)
    }
}

/// Blocking wait used between requests.
///
/// Injected so tests can record the requested delays instead of sleeping.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
