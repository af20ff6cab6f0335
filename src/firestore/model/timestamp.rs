use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self::new(duration.as_secs() as i64, duration.subsec_nanos() as i32),
            Err(err) => {
                let duration = err.duration();
                Self::new(
                    -(duration.as_secs() as i64),
                    -(duration.subsec_nanos() as i32),
                )
            }
        }
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.seconds >= 0 {
            UNIX_EPOCH
                + Duration::from_secs(self.seconds as u64)
                + Duration::from_nanos(self.nanos as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs((-self.seconds) as u64)
                + Duration::from_nanos(self.nanos as u64)
        }
    }

    pub fn to_date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos as u32)
    }

    /// RFC 3339 rendering with nanosecond precision, e.g. `2024-05-01T10:00:00.000000001Z`.
    pub fn to_rfc3339(&self) -> String {
        self.to_date_time()
            .map(|time| time.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .unwrap_or_else(|| format!("{}.{:09}", self.seconds, self.nanos))
    }

    /// The smallest timestamp strictly after this one.
    pub fn successor(&self) -> Self {
        Self::new(self.seconds, self.nanos + 1)
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(1_000_000_000);
        self.seconds += extra_seconds as i64;
        self.nanos = self.nanos.rem_euclid(1_000_000_000);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_nanoseconds() {
        let timestamp = Timestamp::new(1, 1_500_000_000);
        assert_eq!(timestamp.seconds, 2);
        assert_eq!(timestamp.nanos, 500_000_000);

        let negative = Timestamp::new(2, -1);
        assert_eq!(negative.seconds, 1);
        assert_eq!(negative.nanos, 999_999_999);
    }

    #[test]
    fn ordering_and_successor() {
        let earlier = Timestamp::new(1, 999_999_999);
        let later = earlier.successor();
        assert!(earlier < later);
        assert_eq!(later, Timestamp::new(2, 0));
    }

    #[test]
    fn renders_rfc3339() {
        let timestamp = Timestamp::new(0, 1);
        assert_eq!(timestamp.to_rfc3339(), "1970-01-01T00:00:00.000000001Z");
        assert_eq!(
            serde_json::to_value(timestamp).unwrap(),
            serde_json::json!("1970-01-01T00:00:00.000000001Z")
        );
    }
}
