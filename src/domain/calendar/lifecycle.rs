//! Context calendar and its timestep lifecycle.
//!
//! ```text
//! CalendarBuilder (Configured) --set_timestep--> (TimestepPending) --update_timestep--> Calendar (Active)
//! Calendar (Active) --set_timestep--> (TimestepPending) --update_timestep--> (Active)
//! ```
//!
//! Only [`Calendar`] does date arithmetic, and it always uses the committed
//! timestep. A pending timestep is invisible until `update_timestep`.

use super::date::Date;
use super::duration::Duration;
use super::kind::CalendarKind;
use crate::utils::error::{CouplerError, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalendarState {
    Configured,
    TimestepPending,
    Active,
}

fn check_timestep(start: &Date, timestep: &Duration) -> Result<()> {
    if !timestep.timestep.is_zero() {
        return Err(CouplerError::malformed(
            timestep.to_string(),
            "a calendar timestep cannot be expressed in timesteps",
        ));
    }
    // month lengths vary, so opposite signs can cancel out from some dates
    let months = timestep.whole_months();
    let seconds = timestep.sub_month_seconds();
    if months * seconds < 0.0 {
        return Err(CouplerError::out_of_range(
            "timestep",
            format!("'{}' mixes months and days of opposite signs", timestep),
        ));
    }
    let next = start.add(timestep)?;
    if !start.less_than(&next)? {
        return Err(CouplerError::out_of_range(
            "timestep",
            format!("'{}' does not move {} forward", timestep, start),
        ));
    }
    Ok(())
}

/// A calendar whose timestep has not been committed yet.
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    kind: CalendarKind,
    time_origin: Date,
    start_date: Date,
    pending: Option<Duration>,
}

impl CalendarBuilder {
    pub fn new(kind: CalendarKind, time_origin: Date, start_date: Date) -> Result<Self> {
        for date in [&time_origin, &start_date] {
            if date.kind() != kind {
                return Err(CouplerError::CalendarMismatch {
                    left: kind.to_string(),
                    right: date.kind().to_string(),
                });
            }
        }
        Ok(Self {
            kind,
            time_origin,
            start_date,
            pending: None,
        })
    }

    pub fn parse(kind: CalendarKind, time_origin: &str, start_date: &str) -> Result<Self> {
        Self::new(
            kind,
            Date::parse(kind, time_origin)?,
            Date::parse(kind, start_date)?,
        )
    }

    pub fn kind(&self) -> CalendarKind {
        self.kind
    }

    pub fn time_origin(&self) -> &Date {
        &self.time_origin
    }

    pub fn start_date(&self) -> &Date {
        &self.start_date
    }

    pub fn state(&self) -> CalendarState {
        if self.pending.is_some() {
            CalendarState::TimestepPending
        } else {
            CalendarState::Configured
        }
    }

    pub fn pending_timestep(&self) -> Option<&Duration> {
        self.pending.as_ref()
    }

    pub fn set_timestep(&mut self, timestep: Duration) -> Result<()> {
        check_timestep(&self.start_date, &timestep)?;
        self.pending = Some(timestep);
        Ok(())
    }

    /// Commits the pending timestep and activates the calendar.
    pub fn update_timestep(self) -> Result<Calendar> {
        let timestep = self.pending.ok_or_else(|| {
            CouplerError::lifecycle("update_timestep called before any timestep was set")
        })?;
        Ok(Calendar {
            kind: self.kind,
            time_origin: self.time_origin,
            start_date: self.start_date,
            timestep,
            pending: None,
            step: 0,
        })
    }

    /// `set_timestep` followed by `update_timestep`.
    pub fn with_timestep(mut self, timestep: Duration) -> Result<Calendar> {
        self.set_timestep(timestep)?;
        self.update_timestep()
    }
}

/// An active calendar, usable for date arithmetic.
#[derive(Debug, Clone)]
pub struct Calendar {
    kind: CalendarKind,
    time_origin: Date,
    start_date: Date,
    timestep: Duration,
    pending: Option<Duration>,
    step: u64,
}

impl Calendar {
    pub fn kind(&self) -> CalendarKind {
        self.kind
    }

    pub fn time_origin(&self) -> &Date {
        &self.time_origin
    }

    pub fn start_date(&self) -> &Date {
        &self.start_date
    }

    /// The committed timestep.
    pub fn timestep(&self) -> &Duration {
        &self.timestep
    }

    pub fn pending_timestep(&self) -> Option<&Duration> {
        self.pending.as_ref()
    }

    pub fn state(&self) -> CalendarState {
        if self.pending.is_some() {
            CalendarState::TimestepPending
        } else {
            CalendarState::Active
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Stages a new timestep; arithmetic keeps the old one until
    /// [`Calendar::update_timestep`].
    pub fn set_timestep(&mut self, timestep: Duration) -> Result<()> {
        check_timestep(&self.start_date, &timestep)?;
        self.pending = Some(timestep);
        Ok(())
    }

    pub fn update_timestep(&mut self) {
        if let Some(timestep) = self.pending.take() {
            tracing::debug!("calendar timestep {} -> {}", self.timestep, timestep);
            self.timestep = timestep;
        }
    }

    /// Sets and commits a timestep in one call.
    pub fn reconfigure(&mut self, timestep: Duration) -> Result<()> {
        self.set_timestep(timestep)?;
        self.update_timestep();
        Ok(())
    }

    fn check_date(&self, date: &Date) -> Result<()> {
        if date.kind() == self.kind {
            Ok(())
        } else {
            Err(CouplerError::CalendarMismatch {
                left: self.kind.to_string(),
                right: date.kind().to_string(),
            })
        }
    }

    /// Adds a duration, resolving its `ts` part with the committed timestep.
    pub fn add(&self, date: &Date, duration: &Duration) -> Result<Date> {
        self.check_date(date)?;
        date.add(&duration.resolve(&self.timestep))
    }

    pub fn less_than(&self, a: &Date, b: &Date) -> Result<bool> {
        self.check_date(a)?;
        a.less_than(b)
    }

    pub fn less_or_equal(&self, a: &Date, b: &Date) -> Result<bool> {
        self.check_date(a)?;
        a.less_or_equal(b)
    }

    /// Records the index of the step being computed.
    pub fn update(&mut self, step: u64) {
        if step < self.step {
            tracing::warn!("calendar step moved backwards: {} -> {}", self.step, step);
        }
        self.step = step;
    }

    /// `start_date + step * timestep`.
    pub fn current_date(&self) -> Result<Date> {
        // step counts stay far below 2^53
        self.start_date.add(&(self.timestep * self.step as f64))
    }

    /// `start_date + duration`.
    pub fn end_date(&self, duration: &Duration) -> Result<Date> {
        self.add(&self.start_date, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CalendarBuilder {
        CalendarBuilder::parse(CalendarKind::Gregorian, "2020-01-01", "2020-01-01").unwrap()
    }

    fn date(s: &str) -> Date {
        Date::parse(CalendarKind::Gregorian, s).unwrap()
    }

    #[test]
    fn test_lifecycle_states() {
        let mut b = builder();
        assert_eq!(b.state(), CalendarState::Configured);
        assert!(matches!(
            b.clone().update_timestep(),
            Err(CouplerError::Lifecycle { .. })
        ));

        b.set_timestep(Duration::hours(1.0)).unwrap();
        assert_eq!(b.state(), CalendarState::TimestepPending);

        let mut cal = b.update_timestep().unwrap();
        assert_eq!(cal.state(), CalendarState::Active);
        assert_eq!(*cal.timestep(), Duration::hours(1.0));

        cal.set_timestep(Duration::days(1.0)).unwrap();
        assert_eq!(cal.state(), CalendarState::TimestepPending);
        cal.update_timestep();
        assert_eq!(cal.state(), CalendarState::Active);
    }

    #[test]
    fn test_pending_timestep_is_not_used_until_commit() {
        let mut cal = builder().with_timestep(Duration::hours(1.0)).unwrap();
        let start = *cal.start_date();
        let one_ts = Duration::timesteps(1.0);

        cal.set_timestep(Duration::days(1.0)).unwrap();
        assert_eq!(cal.add(&start, &one_ts).unwrap(), date("2020-01-01 01:00:00"));

        cal.update_timestep();
        assert_eq!(cal.add(&start, &one_ts).unwrap(), date("2020-01-02"));
    }

    #[test]
    fn test_reconfigure_is_atomic() {
        let mut cal = builder().with_timestep(Duration::hours(1.0)).unwrap();
        cal.reconfigure(Duration::minutes(30.0)).unwrap();
        assert_eq!(cal.state(), CalendarState::Active);
        assert_eq!(*cal.timestep(), Duration::minutes(30.0));
    }

    #[test]
    fn test_rejects_non_advancing_timestep() {
        let mut b = builder();
        assert!(matches!(
            b.set_timestep(Duration::ZERO),
            Err(CouplerError::OutOfRange { .. })
        ));
        assert!(b.set_timestep(Duration::hours(-1.0)).is_err());
        assert!(b.set_timestep(Duration::timesteps(1.0)).is_err());
        assert_eq!(b.state(), CalendarState::Configured);
    }

    #[test]
    fn test_rejects_month_and_day_parts_of_opposite_sign() {
        let mut b = builder();
        // moves 2020-01-01 forward but 2020-01-31 backwards
        let mixed = Duration::parse("1mo -30d").unwrap();
        assert!(matches!(b.set_timestep(mixed), Err(CouplerError::OutOfRange { .. })));
        assert!(b.set_timestep(Duration::parse("-1mo 40d").unwrap()).is_err());
        assert!(b.set_timestep(Duration::parse("1mo 12h").unwrap()).is_ok());
    }

    #[test]
    fn test_current_date_follows_step() {
        let mut cal = builder().with_timestep(Duration::parse("6h").unwrap()).unwrap();
        assert_eq!(cal.current_date().unwrap(), date("2020-01-01"));
        cal.update(5);
        assert_eq!(cal.step(), 5);
        assert_eq!(cal.current_date().unwrap(), date("2020-01-02 06:00:00"));
    }

    #[test]
    fn test_end_date_and_comparisons() {
        let cal = builder().with_timestep(Duration::days(1.0)).unwrap();
        let end = cal.end_date(&Duration::parse("5ts").unwrap()).unwrap();
        assert_eq!(end, date("2020-01-06"));
        assert!(cal.less_than(cal.start_date(), &end).unwrap());

        let other = Date::parse(CalendarKind::NoLeap, "2020-01-01").unwrap();
        assert!(cal.less_or_equal(&other, &end).is_err());
        assert!(cal.add(&other, &Duration::days(1.0)).is_err());
    }

    #[test]
    fn test_builder_rejects_mixed_calendars() {
        let origin = Date::parse(CalendarKind::Julian, "2020-01-01").unwrap();
        let start = date("2020-01-01");
        assert!(CalendarBuilder::new(CalendarKind::Gregorian, origin, start).is_err());
    }
}
