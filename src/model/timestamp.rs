use std::fmt;

use serde::{Deserialize, Serialize};

pub const MILLIS_PER_SECOND: u64 = 1_000;
pub const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// Natural `u64` ordering equals chronological ordering, and the value is
/// what chat platforms and the store exchange directly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self(hours * MILLIS_PER_HOUR)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn plus_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    pub fn plus_hours(self, hours: u64) -> Self {
        self.plus_millis(hours.saturating_mul(MILLIS_PER_HOUR))
    }

    /// Milliseconds from `self` until `later`, zero if `later` is not after `self`.
    pub fn millis_until(self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{}ms", self.0)
    }
}

/// Render a remaining duration the way replies show it, e.g. `5h 12m`.
pub fn format_remaining(millis: u64) -> String {
    let hours = millis / MILLIS_PER_HOUR;
    let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    match (hours, minutes) {
        (0, 0) => "less than a minute".to_string(),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_convert_to_millis() {
        assert_eq!(Timestamp::from_hours(6).as_millis(), 21_600_000);
        assert_eq!(
            Timestamp::from_millis(500).plus_hours(1).as_millis(),
            3_600_500
        );
    }

    #[test]
    fn chronological_ordering() {
        let a = Timestamp::from_millis(1);
        let b = a.plus_millis(1);
        let c = b.plus_hours(1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn millis_until_saturates() {
        let a = Timestamp::from_millis(1_000);
        assert_eq!(a.millis_until(Timestamp::from_millis(1_500)), 500);
        assert_eq!(a.millis_until(Timestamp::from_millis(10)), 0);
    }

    #[test]
    fn serde_is_plain_number() {
        let ts = Timestamp::from_millis(1_571_000_000_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1571000000000");
        let parsed: Timestamp = serde_json::from_str("1571000000000").unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn remaining_format() {
        assert_eq!(format_remaining(0), "less than a minute");
        assert_eq!(format_remaining(5 * MILLIS_PER_MINUTE), "5m");
        assert_eq!(format_remaining(5 * MILLIS_PER_HOUR + 12 * MILLIS_PER_MINUTE), "5h 12m");
    }
}
