//! Calendar-relative durations.
//!
//! A duration keeps each calendar unit separately because months and years
//! have no fixed length. The `timestep` component counts multiples of the
//! calendar timestep and only becomes concrete once a calendar resolves it.
//! Whole timestep counts are kept exact, whatever their size.
//!
//! # Text form
//! A sequence of `<number><unit>` tokens, e.g. `"1y 2mo 3d"`, `"3600s"`,
//! `"12h30mi"` or `"5ts"`. Units: `y`, `mo`, `d`, `h`, `mi`, `s`, `ts`.

use crate::utils::error::{CouplerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
    pub timestep: Timesteps,
}

/// A timestep multiple: an exact whole part plus a fraction in `(-1, 1)`
/// carrying the same sign.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timesteps {
    whole: i128,
    fraction: f64,
}

impl Timesteps {
    pub const ZERO: Timesteps = Timesteps { whole: 0, fraction: 0.0 };

    pub fn new(whole: i128) -> Self {
        Self { whole, fraction: 0.0 }
    }

    pub fn from_f64(value: f64) -> Self {
        Self {
            whole: 0,
            fraction: value,
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        let carry = self.fraction.trunc();
        if carry != 0.0 {
            // saturating float-to-int cast
            self.whole = self.whole.saturating_add(carry as i128);
            self.fraction -= carry;
        }
        if self.whole > 0 && self.fraction < 0.0 {
            self.whole -= 1;
            self.fraction += 1.0;
        } else if self.whole < 0 && self.fraction > 0.0 {
            self.whole += 1;
            self.fraction -= 1.0;
        }
        self
    }

    pub fn is_zero(&self) -> bool {
        self.whole == 0 && self.fraction == 0.0
    }

    pub fn as_f64(&self) -> f64 {
        self.whole as f64 + self.fraction
    }

    /// The exact count when it is a whole, non-negative number.
    pub fn count(&self) -> Option<u64> {
        if self.fraction != 0.0 {
            return None;
        }
        u64::try_from(self.whole).ok()
    }
}

impl fmt::Display for Timesteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction == 0.0 {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}", self.as_f64())
        }
    }
}

impl Add for Timesteps {
    type Output = Timesteps;

    fn add(self, rhs: Timesteps) -> Timesteps {
        Timesteps {
            whole: self.whole.saturating_add(rhs.whole),
            fraction: self.fraction + rhs.fraction,
        }
        .normalized()
    }
}

impl Mul<f64> for Timesteps {
    type Output = Timesteps;

    fn mul(self, rhs: f64) -> Timesteps {
        if rhs.fract() == 0.0 && rhs.abs() < 9.0e18 {
            Timesteps {
                whole: self.whole.saturating_mul(rhs as i128),
                fraction: self.fraction * rhs,
            }
            .normalized()
        } else {
            Timesteps::from_f64(self.as_f64() * rhs)
        }
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    // `mo`/`mi` must be tried before the single-letter units
    TOKEN.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(ts|mo|mi|y|d|h|s)")
            .expect("duration token pattern is valid")
    })
}

fn integer_regex() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid"))
}

impl Duration {
    pub const ZERO: Duration = Duration {
        year: 0.0,
        month: 0.0,
        day: 0.0,
        hour: 0.0,
        minute: 0.0,
        second: 0.0,
        timestep: Timesteps::ZERO,
    };

    pub fn years(n: f64) -> Self {
        Self { year: n, ..Self::ZERO }
    }

    pub fn months(n: f64) -> Self {
        Self { month: n, ..Self::ZERO }
    }

    pub fn days(n: f64) -> Self {
        Self { day: n, ..Self::ZERO }
    }

    pub fn hours(n: f64) -> Self {
        Self { hour: n, ..Self::ZERO }
    }

    pub fn minutes(n: f64) -> Self {
        Self { minute: n, ..Self::ZERO }
    }

    pub fn seconds(n: f64) -> Self {
        Self { second: n, ..Self::ZERO }
    }

    pub fn timesteps(n: f64) -> Self {
        Self {
            timestep: Timesteps::from_f64(n),
            ..Self::ZERO
        }
    }

    /// An exact whole number of timesteps.
    pub fn timestep_multiple(n: u64) -> Self {
        Self {
            timestep: Timesteps::new(i128::from(n)),
            ..Self::ZERO
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let mut rest = input;
        let mut duration = Self::ZERO;
        let mut tokens = 0;

        while !rest.trim().is_empty() {
            let caps = token_regex()
                .captures(rest)
                .ok_or_else(|| CouplerError::malformed(input, format!("unexpected text '{}'", rest.trim())))?;
            let invalid = || CouplerError::malformed(input, format!("invalid number '{}'", &caps[1]));
            if &caps[2] == "ts" {
                // integral counts bypass f64 so they stay exact
                let steps = if integer_regex().is_match(&caps[1]) {
                    Timesteps::new(caps[1].parse().map_err(|_| invalid())?)
                } else {
                    Timesteps::from_f64(caps[1].parse().map_err(|_| invalid())?)
                };
                duration.timestep = duration.timestep + steps;
            } else {
                let value: f64 = caps[1].parse().map_err(|_| invalid())?;
                match &caps[2] {
                    "y" => duration.year += value,
                    "mo" => duration.month += value,
                    "d" => duration.day += value,
                    "h" => duration.hour += value,
                    "mi" => duration.minute += value,
                    "s" => duration.second += value,
                    unit => unreachable!("unit '{}' is excluded by the token pattern", unit),
                }
            }
            tokens += 1;
            rest = &rest[caps[0].len()..];
        }

        if tokens == 0 {
            return Err(CouplerError::malformed(input, "empty duration"));
        }
        Ok(duration)
    }

    pub fn is_zero(&self) -> bool {
        !self.has_calendar_part() && self.timestep.is_zero()
    }

    /// Whether any calendar unit (everything but `ts`) is set.
    pub fn has_calendar_part(&self) -> bool {
        self.calendar_components().iter().any(|&(v, _)| v != 0.0)
    }

    /// Integral, non-negative timestep count of a duration made only of timesteps.
    pub fn timestep_count(&self) -> Option<u64> {
        if self.has_calendar_part() {
            return None;
        }
        self.timestep.count()
    }

    /// Replaces the `ts` component by `timestep * ts`.
    pub fn resolve(&self, timestep: &Duration) -> Self {
        if self.timestep.is_zero() {
            return *self;
        }
        let steps = self.timestep.as_f64();
        Self {
            timestep: Timesteps::ZERO,
            ..*self
        } + Self {
            timestep: Timesteps::ZERO,
            ..*timestep
        } * steps
    }

    /// Year and month part as a number of months.
    pub fn whole_months(&self) -> f64 {
        self.year * 12.0 + self.month
    }

    /// Sub-month part in seconds, for a calendar with 86400-second days.
    pub fn sub_month_seconds(&self) -> f64 {
        self.day * 86_400.0 + self.hour * 3_600.0 + self.minute * 60.0 + self.second
    }

    fn calendar_components(&self) -> [(f64, &'static str); 6] {
        [
            (self.year, "y"),
            (self.month, "mo"),
            (self.day, "d"),
            (self.hour, "h"),
            (self.minute, "mi"),
            (self.second, "s"),
        ]
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0ts");
        }
        let mut parts: Vec<String> = self
            .calendar_components()
            .iter()
            .filter(|&&(value, _)| value != 0.0)
            .map(|(value, unit)| format!("{}{}", value, unit))
            .collect();
        if !self.timestep.is_zero() {
            parts.push(format!("{}ts", self.timestep));
        }
        f.write_str(&parts.join(" "))
    }
}

impl FromStr for Duration {
    type Err = CouplerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Duration {
    type Error = CouplerError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Duration> for String {
    fn from(duration: Duration) -> Self {
        duration.to_string()
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration {
            year: self.year + rhs.year,
            month: self.month + rhs.month,
            day: self.day + rhs.day,
            hour: self.hour + rhs.hour,
            minute: self.minute + rhs.minute,
            second: self.second + rhs.second,
            timestep: self.timestep + rhs.timestep,
        }
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        self * -1.0
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        self + (-rhs)
    }
}

impl Mul<f64> for Duration {
    type Output = Duration;

    fn mul(self, rhs: f64) -> Duration {
        Duration {
            year: self.year * rhs,
            month: self.month * rhs,
            day: self.day * rhs,
            hour: self.hour * rhs,
            minute: self.minute * rhs,
            second: self.second * rhs,
            timestep: self.timestep * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(Duration::parse("3600s").unwrap(), Duration::seconds(3600.0));
        assert_eq!(Duration::parse("1d").unwrap(), Duration::days(1.0));
        assert_eq!(Duration::parse("2mo").unwrap(), Duration::months(2.0));
        assert_eq!(Duration::parse("30mi").unwrap(), Duration::minutes(30.0));
        assert_eq!(Duration::parse("100000y").unwrap(), Duration::years(100_000.0));
        assert_eq!(Duration::parse("5ts").unwrap(), Duration::timesteps(5.0));
    }

    #[test]
    fn test_parse_composite() {
        let d = Duration::parse("1y 2mo 3d 4h5mi6s").unwrap();
        assert_eq!(d.year, 1.0);
        assert_eq!(d.month, 2.0);
        assert_eq!(d.day, 3.0);
        assert_eq!(d.hour, 4.0);
        assert_eq!(d.minute, 5.0);
        assert_eq!(d.second, 6.0);

        let d = Duration::parse(" 1.5h -10mi 1h ").unwrap();
        assert_eq!(d.hour, 2.5);
        assert_eq!(d.minute, -10.0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "   ", "ts", "5", "5x", "1d garbage", "1..5d", "d1"] {
            let err = Duration::parse(bad).unwrap_err();
            assert!(
                matches!(err, CouplerError::MalformedInput { .. }),
                "'{}' should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(Duration::parse("1d 12h").unwrap().to_string(), "1d 12h");
        assert_eq!(Duration::parse("12h 1d").unwrap().to_string(), "1d 12h");
        assert_eq!(Duration::parse("1.5h").unwrap().to_string(), "1.5h");
        assert_eq!(Duration::ZERO.to_string(), "0ts");
        assert_eq!(Duration::parse("0s").unwrap().to_string(), "0ts");
    }

    #[test]
    fn test_timestep_roundtrip() {
        for n in [0_u64, 1, 2, 7, 24, 1000, 123_456] {
            let text = format!("{}ts", n);
            let parsed = Duration::parse(&text).unwrap();
            assert_eq!(parsed.to_string(), text);
            assert_eq!(parsed.timestep_count(), Some(n));
        }
    }

    #[test]
    fn test_large_timestep_counts_stay_exact() {
        for n in [(1_u64 << 53) + 1, 9_007_199_254_740_993, u64::MAX - 1, u64::MAX] {
            let text = format!("{}ts", n);
            let parsed = Duration::parse(&text).unwrap();
            assert_eq!(parsed.to_string(), text);
            assert_eq!(parsed.timestep_count(), Some(n));
        }
        assert_eq!(Duration::timestep_multiple(u64::MAX).to_string(), format!("{}ts", u64::MAX));
    }

    #[test]
    fn test_fractional_timesteps() {
        let d = Duration::parse("1.5ts").unwrap();
        assert_eq!(d.to_string(), "1.5ts");
        assert_eq!((d + Duration::parse("0.5ts").unwrap()).to_string(), "2ts");
        assert_eq!((d * 2.0).timestep_count(), Some(3));
        assert_eq!((-d).to_string(), "-1.5ts");
        assert_eq!(Duration::parse("2ts").unwrap() - d, Duration::timesteps(0.5));
    }

    #[test]
    fn test_timestep_count_rejects_mixed() {
        assert_eq!(Duration::parse("1d 2ts").unwrap().timestep_count(), None);
        assert_eq!(Duration::parse("1.5ts").unwrap().timestep_count(), None);
        assert_eq!(Duration::parse("-2ts").unwrap().timestep_count(), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = Duration::parse("1d 6h").unwrap();
        let b = Duration::parse("2h").unwrap();
        assert_eq!(a + Duration::ZERO, a);
        assert_eq!((a + b).to_string(), "1d 8h");
        assert_eq!((a - b).to_string(), "1d 4h");
        assert_eq!((b * 3.0).to_string(), "6h");
        assert_eq!((-b).to_string(), "-2h");
    }

    #[test]
    fn test_resolve_timesteps() {
        let step = Duration::parse("30mi").unwrap();
        let d = Duration::parse("1h 4ts").unwrap().resolve(&step);
        assert_eq!(d, Duration { hour: 1.0, minute: 120.0, ..Duration::ZERO });
        assert_eq!(d.sub_month_seconds(), 3.0 * 3600.0);
    }

    #[test]
    fn test_serde_as_string() {
        let d: Duration = serde_json::from_str("\"2d 3ts\"").unwrap();
        assert_eq!(d, Duration { day: 2.0, timestep: Timesteps::new(3), ..Duration::ZERO });
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"2d 3ts\"");
    }
}
