//! The `X-Timestamp` value.
//!
//! Timestamps are emitted as UTC with second precision (`2024-01-01T00:00:00Z`).
//! When parsing a received header the verifier also accepts fractional seconds,
//! which some scripting clients produce, and keeps the header text verbatim
//! so the digest is recomputed over exactly what was sent.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use crate::error::AuthError;

/// `chrono` format string of emitted timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A signing timestamp: the instant and its exact wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    instant: DateTime<Utc>,
    text: String,
}

impl Timestamp {
    /// The current wall-clock time, truncated to whole seconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Build a timestamp from an instant, truncated to whole seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use tcn_auth::timestamp::Timestamp;
    ///
    /// let ts = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    /// assert_eq!(ts.as_str(), "2024-01-01T00:00:00Z");
    /// ```
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let instant = instant.trunc_subsecs(0);
        let text = instant.format(TIMESTAMP_FORMAT).to_string();
        Self { instant, text }
    }

    /// Parse a received `X-Timestamp` header value.
    ///
    /// The value must be an RFC 3339 UTC time ending in a literal `Z`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTimestamp`] for any other shape.
    pub fn parse(text: &str) -> Result<Self, AuthError> {
        if !text.ends_with('Z') || text.contains('+') {
            return Err(AuthError::InvalidTimestamp(text.to_owned()));
        }

        let instant = DateTime::parse_from_rfc3339(text)
            .map_err(|_| AuthError::InvalidTimestamp(text.to_owned()))?
            .with_timezone(&Utc);

        Ok(Self {
            instant,
            text: text.to_owned(),
        })
    }

    /// The wire text, as signed and as sent in `X-Timestamp`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The instant this timestamp denotes.
    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Signed difference `now - self`. Positive when the timestamp is in the past.
    #[must_use]
    pub fn skew(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.instant)
    }

    /// Whether `now` lies within `tolerance` of this timestamp, in either direction.
    ///
    /// The window is inclusive: a skew of exactly `tolerance` is fresh.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, tolerance: Duration) -> bool {
        let skew = self.skew(now);
        let magnitude = if skew < TimeDelta::zero() { -skew } else { skew };
        magnitude.to_std().unwrap_or(Duration::MAX) <= tolerance
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_should_format_with_second_precision() {
        let instant = new_year() + TimeDelta::milliseconds(987);
        let ts = Timestamp::from_datetime(instant);
        assert_eq!(ts.as_str(), "2024-01-01T00:00:00Z");
        assert_eq!(ts.instant(), new_year());
    }

    #[test]
    fn test_should_parse_emitted_format() {
        let ts = Timestamp::parse("2021-03-10T14:23:23Z").unwrap();
        assert_eq!(
            ts.instant(),
            Utc.with_ymd_and_hms(2021, 3, 10, 14, 23, 23).unwrap()
        );
        assert_eq!(ts.as_str(), "2021-03-10T14:23:23Z");
    }

    #[test]
    fn test_should_parse_fractional_seconds_and_keep_text() {
        let ts = Timestamp::parse("2021-03-10T14:23:23.123Z").unwrap();
        assert_eq!(ts.as_str(), "2021-03-10T14:23:23.123Z");
        assert_eq!(
            ts.instant().trunc_subsecs(0),
            Utc.with_ymd_and_hms(2021, 3, 10, 14, 23, 23).unwrap()
        );
    }

    #[test]
    fn test_should_reject_non_utc_or_garbage() {
        assert!(Timestamp::parse("2021-03-10T14:23:23+00:00").is_err());
        assert!(Timestamp::parse("2021-03-10 14:23:23").is_err());
        assert!(Timestamp::parse("yesterday").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_should_treat_window_edge_as_fresh() {
        let ts = Timestamp::from_datetime(new_year());
        let tolerance = Duration::from_secs(300);

        assert!(ts.is_fresh(new_year() + TimeDelta::seconds(300), tolerance));
        assert!(ts.is_fresh(new_year() - TimeDelta::seconds(300), tolerance));
        assert!(!ts.is_fresh(new_year() + TimeDelta::seconds(301), tolerance));
        assert!(!ts.is_fresh(new_year() - TimeDelta::seconds(301), tolerance));
    }

    #[test]
    fn test_should_report_signed_skew() {
        let ts = Timestamp::from_datetime(new_year());
        assert_eq!(ts.skew(new_year() + TimeDelta::seconds(5)).num_seconds(), 5);
        assert_eq!(ts.skew(new_year() - TimeDelta::seconds(5)).num_seconds(), -5);
    }
}
