//! Clock adapter.
//!
//! Implements [`ClockPort`]:
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`,
//!   wall clock from `gettimeofday()` / `localtime_r()` once SNTP has set it.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `SystemTime`, rendered in UTC.
//!
//! The local zone is a POSIX TZ rule applied once at boot through
//! [`set_timezone`].

use core::fmt::Write;

use heapless::String;
use log::{info, warn};

use crate::app::ports::ClockPort;

/// Anything before 2020-01-01 means the clock was never set.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// A POSIX TZ rule such as `CST-8`: non-empty, printable ASCII, no spaces.
pub fn is_valid_timezone(tz: &str) -> bool {
    !tz.is_empty() && tz.bytes().all(|b| b.is_ascii_graphic())
}

/// Make `localtime_r()` render in `tz`.  Must run before SNTP starts and
/// before any other task reads the environment.  Returns `false` (and
/// leaves the zone alone) for a malformed rule.
pub fn set_timezone(tz: &str) -> bool {
    if !is_valid_timezone(tz) {
        warn!("Clock: ignoring malformed TZ rule '{}'", tz);
        return false;
    }

    #[cfg(target_os = "espidf")]
    // SAFETY: called from main() before the worker and console tasks exist.
    // The value holds no NUL byte, which `set_var` would reject.
    unsafe {
        std::env::set_var("TZ", tz);
        esp_idf_svc::sys::tzset();
    }

    info!("Clock: time zone {}", tz);
    true
}

/// Broken-down calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    /// UTC calendar time for a Unix timestamp.
    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400);

        // Days-to-civil over 400-year eras starting 0000-03-01.
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;

        Self {
            year,
            month,
            day,
            hour: (rem / 3_600) as u8,
            minute: (rem % 3_600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }

    /// `YYYY/MM/DD hh:mm:ss`
    pub fn render(&self) -> String<32> {
        let mut out = String::new();
        let _ = write!(
            out,
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        out
    }
}

pub struct EspClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for EspClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EspClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since the Unix epoch, `None` before the clock was set.
    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        let secs = tv.tv_sec as i64;
        (secs >= EPOCH_2020).then_some(secs)
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> Option<i64> {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs() as i64;
        (secs >= EPOCH_2020).then_some(secs)
    }

    #[cfg(target_os = "espidf")]
    fn local_time(secs: i64) -> Option<CivilTime> {
        let secs = secs as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some(CivilTime {
            year: tm.tm_year + 1900,
            month: (tm.tm_mon + 1) as u8,
            day: tm.tm_mday as u8,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            second: tm.tm_sec as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn local_time(secs: i64) -> Option<CivilTime> {
        Some(CivilTime::from_unix(secs))
    }
}

impl ClockPort for EspClock {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn is_synced(&self) -> bool {
        self.unix_secs().is_some()
    }

    fn wall_clock(&self) -> Option<String<32>> {
        self.unix_secs()
            .and_then(Self::local_time)
            .map(|t| t.render())
    }
}
