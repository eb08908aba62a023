//! Calendar/duration model.
//!
//! - [`Duration`]: calendar-relative deltas with a text form (`"1d 6h"`, `"3ts"`)
//! - [`Date`]: second-resolution dates bound to a [`CalendarKind`]
//! - [`CalendarBuilder`] / [`Calendar`]: a context calendar with its
//!   set/commit timestep protocol

mod date;
mod duration;
mod kind;
mod lifecycle;

pub use date::Date;
pub use duration::{Duration, Timesteps};
pub use kind::{CalendarKind, SECONDS_PER_DAY};
pub use lifecycle::{Calendar, CalendarBuilder, CalendarState};
