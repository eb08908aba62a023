// Domain layer: calendar model, context objects and ports. No I/O here.

pub mod calendar;
pub mod model;
pub mod ports;
pub mod variables;
