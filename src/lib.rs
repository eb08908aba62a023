pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::DefinitionConfig;
pub use core::{context::Context, engine::CouplerEngine, toymodel::ToyModel};
pub use domain::calendar::{Calendar, CalendarBuilder, CalendarKind, Date, Duration};
pub use utils::error::{CouplerError, Result};
