//! Small helpers shared by the codecs: timestamps, input screening and
//! fallible string construction.

use alloc::string::String;
use core::fmt::{self, Write};

use heapless::String as BoundedString;

use crate::error::{Error, Result};

/// Returns the current calendar time as seconds since the Unix epoch.
pub type TimeSource = fn() -> u64;

/// Length of `YYYY-MM-DDTHH:MM:SS.000Z`.
pub const ISO_TIMESTAMP_LEN: usize = 24;

/// An ISO-8601 timestamp with a literal `000` millisecond field.
pub type IsoTimestamp = BoundedString<ISO_TIMESTAMP_LEN>;

/// 2024-01-01T00:00:00Z. Clocks reporting anything older are considered unset.
pub const TIME_2024_START: u64 = 1_704_067_200;

const SECONDS_PER_DAY: u64 = 86_400;

/// Formats `unix_secs` as `YYYY-MM-DDTHH:MM:SS.000Z`.
///
/// Times before 2024 are rejected with [`Error::ConfigError`]: a device clock
/// that has not been synchronised yet would otherwise stamp telemetry with a
/// date the platform discards.
///
/// ```
/// use libiotconnect::util::to_iso_timestamp;
///
/// let ts = to_iso_timestamp(1_717_245_296).unwrap();
/// assert_eq!(ts.as_str(), "2024-06-01T12:34:56.000Z");
/// ```
pub fn to_iso_timestamp(unix_secs: u64) -> Result<IsoTimestamp> {
    if unix_secs < TIME_2024_START {
        error!("to_iso_timestamp: expected a time newer than January 2024, got {}", unix_secs);
        return Err(Error::ConfigError);
    }

    let days = unix_secs / SECONDS_PER_DAY;
    let secs_today = unix_secs % SECONDS_PER_DAY;
    let (year, month, day) = civil_from_days(days);

    let mut out = IsoTimestamp::new();
    write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.000Z",
        year,
        month,
        day,
        secs_today / 3600,
        (secs_today % 3600) / 60,
        secs_today % 60
    )
    .map_err(|_| Error::Overflow)?;
    Ok(out)
}

// Howard Hinnant's civil_from_days, restricted to dates after the epoch.
fn civil_from_days(days_since_epoch: u64) -> (u64, u64, u64) {
    let z = days_since_epoch + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Wall clock time from the host, for `std` builds.
#[cfg(feature = "std")]
pub fn default_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Checks that `bytes` only holds printable ASCII or whitespace.
///
/// Inbound MQTT payloads are screened with this before they reach the JSON
/// parser. `disabled` short-circuits the check for integrations that carry
/// UTF-8 text in command arguments.
pub fn is_printable(what: &str, bytes: &[u8], disabled: bool) -> Result<()> {
    if disabled {
        return Ok(());
    }
    match bytes
        .iter()
        .position(|b| !matches!(b, 0x20..=0x7e | b'\t' | b'\n' | 0x0b | 0x0c | b'\r'))
    {
        None => Ok(()),
        Some(index) => {
            error!("{} contains a non-printable character at offset {}", what, index);
            Err(Error::BadValue)
        }
    }
}

struct LengthCounter(usize);

impl Write for LengthCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Renders `args` into a string whose allocation is reserved up front and
/// fails with [`Error::OutOfMemory`] instead of aborting.
pub(crate) fn try_format(args: fmt::Arguments<'_>) -> Result<String> {
    let mut counter = LengthCounter(0);
    counter.write_fmt(args).map_err(|_| Error::Failed)?;
    let mut out = String::new();
    out.try_reserve_exact(counter.0)?;
    out.write_fmt(args).map_err(|_| Error::Failed)?;
    Ok(out)
}

/// Fallible `to_owned` for string slices.
pub(crate) fn try_clone_str(s: &str) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())?;
    out.push_str(s);
    Ok(out)
}
