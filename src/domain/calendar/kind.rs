//! Calendar systems and their day-counting rules.
//!
//! Day numbers are counted from 0000-01-01 of the calendar itself, so two
//! calendars never share a day numbering. Negative years are allowed and
//! follow the same rules (astronomical year numbering).

use crate::utils::error::{CouplerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_DAY: i64 = 86_400;

const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalendarKind {
    /// Proleptic Gregorian calendar.
    #[default]
    Gregorian,
    Julian,
    /// Every year has 365 days.
    NoLeap,
    /// Every year has 366 days.
    AllLeap,
    /// Twelve months of 30 days.
    D360,
}

impl CalendarKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gregorian => "gregorian",
            Self::Julian => "julian",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::D360 => "d360",
        }
    }

    pub fn is_leap_year(self, year: i64) -> bool {
        match self {
            Self::Gregorian => (year % 4 == 0 && year % 100 != 0) || year % 400 == 0,
            Self::Julian => year % 4 == 0,
            Self::NoLeap | Self::D360 => false,
            Self::AllLeap => true,
        }
    }

    pub fn days_in_month(self, year: i64, month: u32) -> u32 {
        if self == Self::D360 {
            return 30;
        }
        let idx = (month.clamp(1, 12) - 1) as usize;
        if idx == 1 && self.is_leap_year(year) {
            29
        } else {
            MONTH_DAYS[idx]
        }
    }

    pub fn days_in_year(self, year: i64) -> i64 {
        match self {
            Self::D360 => 360,
            _ if self.is_leap_year(year) => 366,
            _ => 365,
        }
    }

    /// Number of days in the years `[0, year)`, negative for years before 0.
    pub fn days_before_year(self, year: i64) -> i64 {
        // leap years counted in [1, n]; shifting by one year includes year 0
        let leaps_through = |n: i64| match self {
            Self::Gregorian => n.div_euclid(4) - n.div_euclid(100) + n.div_euclid(400),
            Self::Julian => n.div_euclid(4),
            _ => 0,
        };
        match self {
            Self::Gregorian | Self::Julian => 365 * year + leaps_through(year - 1) + 1,
            Self::NoLeap => 365 * year,
            Self::AllLeap => 366 * year,
            Self::D360 => 360 * year,
        }
    }

    pub fn days_before_month(self, year: i64, month: u32) -> i64 {
        (1..month)
            .map(|m| i64::from(self.days_in_month(year, m)))
            .sum()
    }

    /// Absolute day number of a calendar day.
    pub fn day_number(self, year: i64, month: u32, day: u32) -> i64 {
        self.days_before_year(year) + self.days_before_month(year, month) + i64::from(day) - 1
    }

    /// Inverse of [`CalendarKind::day_number`]: `(year, month, day)`.
    pub fn from_day_number(self, days: i64) -> (i64, u32, u32) {
        let (cycle_days, cycle_years) = match self {
            Self::Gregorian => (146_097, 400),
            Self::Julian => (1_461, 4),
            Self::NoLeap => (365, 1),
            Self::AllLeap => (366, 1),
            Self::D360 => (360, 1),
        };
        let mut year = (days * cycle_years).div_euclid(cycle_days);
        while self.days_before_year(year) > days {
            year -= 1;
        }
        while self.days_before_year(year + 1) <= days {
            year += 1;
        }

        let mut remaining = days - self.days_before_year(year);
        let mut month = 1;
        loop {
            let len = i64::from(self.days_in_month(year, month));
            if remaining < len || month == 12 {
                break;
            }
            remaining -= len;
            month += 1;
        }
        // remaining < 31 once the month is found
        (year, month, remaining as u32 + 1)
    }
}

impl fmt::Display for CalendarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalendarKind {
    type Err = CouplerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gregorian" | "standard" | "proleptic_gregorian" => Ok(Self::Gregorian),
            "julian" => Ok(Self::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "allleap" | "366_day" => Ok(Self::AllLeap),
            "d360" | "360_day" => Ok(Self::D360),
            other => Err(CouplerError::malformed(other, "unknown calendar type")),
        }
    }
}

impl TryFrom<String> for CalendarKind {
    type Error = CouplerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalendarKind> for String {
    fn from(kind: CalendarKind) -> Self {
        kind.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_rules() {
        let g = CalendarKind::Gregorian;
        assert!(g.is_leap_year(2000));
        assert!(g.is_leap_year(2020));
        assert!(!g.is_leap_year(1900));
        assert!(!g.is_leap_year(2021));
        assert!(CalendarKind::Julian.is_leap_year(1900));
        assert!(!CalendarKind::NoLeap.is_leap_year(2020));
        assert_eq!(CalendarKind::AllLeap.days_in_month(2021, 2), 29);
        assert_eq!(CalendarKind::D360.days_in_month(2021, 2), 30);
    }

    #[test]
    fn test_days_before_year() {
        let g = CalendarKind::Gregorian;
        assert_eq!(g.days_before_year(0), 0);
        assert_eq!(g.days_before_year(1), 366);
        assert_eq!(g.days_before_year(400), 146_097);
        assert_eq!(g.days_before_year(-1), -365);
        assert_eq!(g.days_before_year(-4), -4 * 365 - 1);
    }

    #[test]
    fn test_day_number_roundtrip_across_kinds() {
        let kinds = [
            CalendarKind::Gregorian,
            CalendarKind::Julian,
            CalendarKind::NoLeap,
            CalendarKind::AllLeap,
            CalendarKind::D360,
        ];
        for kind in kinds {
            for &(y, m, d) in &[(2020, 2, 29), (1900, 3, 1), (-1, 12, 30), (100_000, 1, 1)] {
                if d > kind.days_in_month(y, m) {
                    continue;
                }
                let n = kind.day_number(y, m, d);
                assert_eq!(kind.from_day_number(n), (y, m, d), "{} {}-{}-{}", kind, y, m, d);
                assert!(kind.from_day_number(n + 1).0 >= y);
            }
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Gregorian".parse::<CalendarKind>().unwrap(), CalendarKind::Gregorian);
        assert_eq!("365_day".parse::<CalendarKind>().unwrap(), CalendarKind::NoLeap);
        assert_eq!("360_day".parse::<CalendarKind>().unwrap(), CalendarKind::D360);
        assert!("lunar".parse::<CalendarKind>().is_err());
    }
}
