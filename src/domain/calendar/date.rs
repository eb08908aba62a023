//! Calendar dates with second resolution.

use super::duration::Duration;
use super::kind::{CalendarKind, SECONDS_PER_DAY};
use crate::utils::error::{CouplerError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// A point in time of one calendar.
///
/// Dates of different calendars never compare: `PartialOrd` returns `None`
/// and the checked comparisons return [`CouplerError::CalendarMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    kind: CalendarKind,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

fn date_regex() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| {
        Regex::new(
            r"^\s*(-?\d+)-(\d{1,2})-(\d{1,2})(?:[ T]+(\d{1,2})(?::(\d{1,2})(?::(\d{1,2}))?)?)?\s*$",
        )
        .expect("date pattern is valid")
    })
}

impl Date {
    pub fn new(
        kind: CalendarKind,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CouplerError::out_of_range("month", format!("{} is not in 1..=12", month)));
        }
        let month_len = kind.days_in_month(i64::from(year), month);
        if day == 0 || day > month_len {
            return Err(CouplerError::out_of_range(
                "day",
                format!("{}-{:02} has {} days in the {} calendar, got {}", year, month, month_len, kind, day),
            ));
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(CouplerError::out_of_range(
                "time of day",
                format!("{:02}:{:02}:{:02}", hour, minute, second),
            ));
        }
        Ok(Self {
            kind,
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Midnight of the given day.
    pub fn ymd(kind: CalendarKind, year: i32, month: u32, day: u32) -> Result<Self> {
        Self::new(kind, year, month, day, 0, 0, 0)
    }

    /// Parses `YYYY-MM-DD[ hh[:mm[:ss]]]`.
    pub fn parse(kind: CalendarKind, input: &str) -> Result<Self> {
        let caps = date_regex()
            .captures(input)
            .ok_or_else(|| CouplerError::malformed(input, "expected YYYY-MM-DD hh:mm:ss"))?;
        let field = |idx: usize| -> Result<u32> {
            caps.get(idx).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| CouplerError::malformed(input, format!("invalid number '{}'", m.as_str())))
            })
        };
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| CouplerError::out_of_range("year", format!("'{}' does not fit", &caps[1])))?;
        Self::new(kind, year, field(2)?, field(3)?, field(4)?, field(5)?, field(6)?)
    }

    pub fn kind(&self) -> CalendarKind {
        self.kind
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3_600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }

    /// Seconds elapsed since 0000-01-01 00:00:00 of this date's calendar.
    pub fn absolute_seconds(&self) -> i64 {
        self.kind.day_number(i64::from(self.year), self.month, self.day) * SECONDS_PER_DAY
            + self.seconds_of_day()
    }

    fn from_absolute_seconds(kind: CalendarKind, seconds: i64) -> Result<Self> {
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let sod = seconds.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = kind.from_day_number(days);
        let year = i32::try_from(year)
            .map_err(|_| CouplerError::out_of_range("year", format!("{} does not fit", year)))?;
        // sod < 86400
        let sod = sod as u32;
        Self::new(kind, year, month, day, sod / 3_600, sod % 3_600 / 60, sod % 60)
    }

    /// Adds a calendar duration.
    ///
    /// Years and months move first, clamping the day to the length of the
    /// target month. The remaining units are rounded to whole seconds and
    /// roll over day, month and year boundaries. Durations holding
    /// timesteps must go through `Calendar::add`.
    pub fn add(&self, duration: &Duration) -> Result<Self> {
        if !duration.timestep.is_zero() {
            return Err(CouplerError::malformed(
                duration.to_string(),
                "a timestep duration needs a calendar to be resolved",
            ));
        }

        let months = duration.year * 12.0 + duration.month;
        if months.fract() != 0.0 || !months.is_finite() || months.abs() > f64::from(i32::MAX) {
            return Err(CouplerError::out_of_range(
                "duration",
                format!("'{}' is not a whole number of months", duration),
            ));
        }

        let mut shifted = *self;
        if months != 0.0 {
            let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 + months as i64;
            let year = index.div_euclid(12);
            let month = index.rem_euclid(12) as u32 + 1;
            shifted.year = i32::try_from(year)
                .map_err(|_| CouplerError::out_of_range("year", format!("{} does not fit", year)))?;
            shifted.month = month;
            shifted.day = self.day.min(self.kind.days_in_month(year, month));
        }

        let seconds = duration.sub_month_seconds().round();
        if !seconds.is_finite() || seconds.abs() > 9.0e15 {
            return Err(CouplerError::out_of_range(
                "duration",
                format!("'{}' is too large", duration),
            ));
        }
        if seconds == 0.0 {
            return Ok(shifted);
        }
        Self::from_absolute_seconds(self.kind, shifted.absolute_seconds() + seconds as i64)
    }

    fn check_kind(&self, other: &Date) -> Result<()> {
        if self.kind == other.kind {
            Ok(())
        } else {
            Err(CouplerError::CalendarMismatch {
                left: self.kind.to_string(),
                right: other.kind.to_string(),
            })
        }
    }

    pub fn try_cmp(&self, other: &Date) -> Result<Ordering> {
        self.check_kind(other)?;
        Ok(self.key().cmp(&other.key()))
    }

    pub fn less_than(&self, other: &Date) -> Result<bool> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    pub fn less_or_equal(&self, other: &Date) -> Result<bool> {
        Ok(self.try_cmp(other)? != Ordering::Greater)
    }

    fn key(&self) -> (i32, u32, u32, u32, u32, u32) {
        (self.year, self.month, self.day, self.hour, self.minute, self.second)
    }

    pub fn to_naive(&self) -> Result<NaiveDateTime> {
        if self.kind != CalendarKind::Gregorian {
            return Err(CouplerError::CalendarMismatch {
                left: self.kind.to_string(),
                right: CalendarKind::Gregorian.to_string(),
            });
        }
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, self.second))
            .ok_or_else(|| CouplerError::out_of_range("date", format!("{} is outside chrono's range", self)))
    }

    pub fn from_naive(value: &NaiveDateTime) -> Self {
        Self {
            kind: CalendarKind::Gregorian,
            year: value.year(),
            month: value.month(),
            day: value.day(),
            hour: value.hour(),
            minute: value.minute(),
            // leap seconds fold into :59
            second: value.second().min(59),
        }
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
