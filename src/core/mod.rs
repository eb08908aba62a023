pub mod client;
pub mod context;
pub mod engine;
pub mod server;
pub mod toymodel;

pub use crate::domain::ports::{Communicator, FieldSink};
pub use crate::utils::error::Result;
