//! Ingest window arithmetic
//!
//! A run considers messages received in a half-open UTC interval running from
//! one local daily cutoff to the next in a named time zone. Each cutoff is
//! resolved to a true instant, so consecutive daily windows share their
//! boundary even across a DST change; such a window is 23 or 25 hours long.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{IngestError, Result};

/// Half-open UTC interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting empty or inverted intervals
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(IngestError::config(format!(
                "window start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Start inclusive, end exclusive
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Parse an IANA zone identifier such as `Europe/Copenhagen`
pub fn parse_zone(id: &str) -> Result<Tz> {
    id.parse::<Tz>()
        .map_err(|e| IngestError::config(format!("unknown time zone '{}': {}", id, e)))
}

/// Compute the daily window containing `now`.
///
/// If `now` is at or after today's cutoff in `zone`, the window runs from
/// today's cutoff to tomorrow's; otherwise from yesterday's cutoff to
/// today's. The window is 24 hours long except across a DST change.
pub fn compute_window(now: DateTime<Utc>, zone: Tz, cutoff_hour: u32) -> Result<TimeWindow> {
    let day = anchor_date(now, zone, cutoff_hour)?;
    let next = day.succ_opt().ok_or_else(|| out_of_range(day))?;

    TimeWindow::new(
        local_cutoff(day, zone, cutoff_hour)?,
        local_cutoff(next, zone, cutoff_hour)?,
    )
}

/// Window starting at the same cutoff as [`compute_window`] but lasting
/// exactly `length` in absolute time.
pub fn compute_window_with(
    now: DateTime<Utc>,
    zone: Tz,
    cutoff_hour: u32,
    length: Duration,
) -> Result<TimeWindow> {
    let day = anchor_date(now, zone, cutoff_hour)?;
    let start = local_cutoff(day, zone, cutoff_hour)?;

    TimeWindow::new(start, start + length)
}

/// Local date whose cutoff opens the window containing `now`
fn anchor_date(now: DateTime<Utc>, zone: Tz, cutoff_hour: u32) -> Result<NaiveDate> {
    let today = now.with_timezone(&zone).date_naive();
    if now >= local_cutoff(today, zone, cutoff_hour)? {
        Ok(today)
    } else {
        today.pred_opt().ok_or_else(|| out_of_range(today))
    }
}

fn out_of_range(date: NaiveDate) -> IngestError {
    IngestError::config(format!("date {} is out of range", date))
}

/// Resolve `cutoff_hour:00` on local `date` to an instant.
///
/// Ambiguous local times (clocks fall back) take the earlier instant.
/// Nonexistent local times (clocks spring forward) take the first valid
/// minute after the gap.
fn local_cutoff(date: NaiveDate, zone: Tz, cutoff_hour: u32) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(cutoff_hour, 0, 0).ok_or_else(|| {
        IngestError::config(format!("cutoff hour {} is not in 0..=23", cutoff_hour))
    })?;
    let naive = date.and_time(time);

    // Gaps are at most a few hours; a day of minutes is a generous bound
    for minutes in 0..=(24 * 60) {
        let candidate = naive + Duration::minutes(minutes);
        if let Some(resolved) = zone.from_local_datetime(&candidate).earliest() {
            return Ok(resolved.with_timezone(&Utc));
        }
    }

    Err(IngestError::config(format!(
        "cannot resolve {} in time zone {}",
        naive,
        zone.name()
    )))
}
