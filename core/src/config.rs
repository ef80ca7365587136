use std::time::Duration;

/// Tunables for a [`crate::Ticker`].
///
/// Widths are in host pixels; for the terminal host one pixel is one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerConfig {
    /// Narrowest gap ever materialized between the newest and the oldest message.
    pub min_gap_width: i32,
    /// Number of fade steps a message goes through before it expires.
    pub max_fade_levels: u8,
    /// Lifetime for messages that do not carry their own timeout.
    pub default_timeout: Duration,
    /// Interval between scroll steps.
    pub tick_interval: Duration,
    /// Delay used by "expire now" instead of the proportional fade step.
    pub expire_now_delay: Duration,
    /// Pointer travel (in pixels) before a press turns into a drag.
    pub drag_dead_zone: i32,
    /// Initial scroll velocity in pixels per tick. Positive scrolls content to the left.
    pub step: i32,
    /// How many killed thread ids are remembered for suppressing late replies.
    pub max_killed_threads: usize,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            min_gap_width: 8,
            max_fade_levels: 5,
            default_timeout: Duration::from_secs(5 * 60),
            tick_interval: Duration::from_millis(80),
            expire_now_delay: Duration::from_millis(100),
            drag_dead_zone: 2,
            step: 1,
            max_killed_threads: 1024,
        }
    }
}

impl TickerConfig {
    /// Clamps values that would break the scroller's arithmetic.
    ///
    /// Gap and glyph widths must stay positive and a message needs at least one fade level.
    pub fn sanitized(mut self) -> Self {
        self.min_gap_width = self.min_gap_width.max(1);
        self.max_fade_levels = self.max_fade_levels.max(1);
        self.drag_dead_zone = self.drag_dead_zone.max(0);
        self.max_killed_threads = self.max_killed_threads.max(1);
        if self.tick_interval.is_zero() {
            self.tick_interval = Duration::from_millis(1);
        }
        self
    }

    /// Time spent at each fade level for a message with the given total lifetime.
    pub fn fade_step(&self, total_timeout: Duration) -> Duration {
        total_timeout / u32::from(self.max_fade_levels.max(1))
    }
}
