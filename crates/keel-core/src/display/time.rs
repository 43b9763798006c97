//! Timestamp and duration display utilities.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// Formats a `Timestamp` in the system timezone as `YYYY-MM-DD HH:MM:SS TZ`.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

/// Formats a millisecond duration for people: `850 ms`, `2.4 s`, `3m 05s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub u64);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0;
        if ms < 1_000 {
            write!(f, "{ms} ms")
        } else if ms < 60_000 {
            write!(f, "{:.1} s", ms as f64 / 1_000.0)
        } else {
            let secs = ms / 1_000;
            write!(f, "{}m {:02}s", secs / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_display() {
        assert_eq!(Elapsed(0).to_string(), "0 ms");
        assert_eq!(Elapsed(850).to_string(), "850 ms");
        assert_eq!(Elapsed(2_400).to_string(), "2.4 s");
        assert_eq!(Elapsed(185_000).to_string(), "3m 05s");
    }

    #[test]
    fn test_local_datetime_format() {
        let ts: Timestamp = "2024-01-15T10:30:00Z".parse().unwrap();
        let text = LocalDateTime(&ts).to_string();
        // Date and time are always present regardless of the system zone
        assert_eq!(text.matches(':').count(), 2);
        assert!(text.starts_with("2024-01-1"));
    }
}
