use chrono::{DateTime, Duration, Utc};

/// Time configuration for a token's validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTimeConfig {
    /// Issue time as a Unix timestamp; `None` means "now"
    pub start_time: Option<i64>,
    /// Lifetime in seconds; zero or negative yields an already-expired deadline
    pub duration: i64,
}

impl Default for TokenTimeConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            duration: 300,
        }
    }
}

impl TokenTimeConfig {
    /// Lifetime of `seconds` starting now.
    pub fn with_duration(seconds: i64) -> Self {
        Self {
            start_time: None,
            duration: seconds,
        }
    }

    /// Absolute deadline, or `None` if it falls outside the calendar.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let start = match self.start_time {
            Some(timestamp) => DateTime::from_timestamp(timestamp, 0)?,
            None => Utc::now(),
        };
        start.checked_add_signed(Duration::try_seconds(self.duration)?)
    }
}
