use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;

/// A simple clock abstraction for deterministic time in services and tests.
///
/// Readings are truncated to millisecond precision, the resolution persisted
/// by [`format_timestamp`].
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at.trunc_subsecs(3))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now().trunc_subsecs(3),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t = (*t + delta).trunc_subsecs(3);
        }
    }
}

//
// ─── STORAGE TIMESTAMPS ────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid timestamp {raw:?}: {source}")]
pub struct TimestampError {
    raw: String,
    source: chrono::ParseError,
}

/// Encode an instant as fixed-width ISO-8601 UTC, e.g. `2023-11-14T22:13:20.000Z`.
///
/// Strings produced here sort lexicographically in instant order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a timestamp written by [`format_timestamp`] (any RFC 3339 offset is accepted).
///
/// # Errors
///
/// Returns `TimestampError` if `raw` is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| TimestampError {
            raw: raw.to_string(),
            source,
        })
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
