//! When and where a configuration ran.

use std::time::{SystemTime, UNIX_EPOCH};

use exafmm_toolchain::HostPlatform;
use serde::Serialize;

/// Timestamp and build host recorded in the generated headers.
///
/// The host is the machine running configure, which may differ from the one
/// a loaded toolchain file was written on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildProvenance {
    /// `ctime`-style UTC timestamp, e.g. `Thu Oct 15 10:00:00 2026`.
    pub timestamp: String,
    pub hostname: String,
    /// Platform description, e.g. `Linux 6.8.0 x86_64`.
    pub platform: String,
}

impl BuildProvenance {
    /// Capture the current time on `host`.
    pub fn capture(host: &HostPlatform) -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            timestamp: ctime(secs),
            hostname: host.hostname.clone(),
            platform: host.description.clone(),
        }
    }

    /// A fixed provenance, for reproducible output.
    pub fn fixed(
        timestamp: impl Into<String>,
        hostname: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            hostname: hostname.into(),
            platform: platform.into(),
        }
    }
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format seconds since the epoch the way C `ctime` does, in UTC.
pub fn ctime(secs: u64) -> String {
    let days = secs / 86_400;
    let day_secs = secs % 86_400;
    let hour = day_secs / 3600;
    let minute = (day_secs % 3600) / 60;
    let second = day_secs % 60;

    // 1970-01-01 was a Thursday.
    let weekday = WEEKDAYS[((days + 4) % 7) as usize];

    // civil_from_days, <https://howardhinnant.github.io/date_algorithms.html>
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe as i64 + era * 400 + i64::from(m <= 2);

    let month = MONTHS[(m - 1) as usize];
    format!("{weekday} {month} {d:>2} {hour:02}:{minute:02}:{second:02} {y}")
}
