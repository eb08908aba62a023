// Adapters layer: concrete implementations of the domain ports.

pub mod comm;
pub mod sink;

pub use comm::{LocalCommunicator, SingleProcess};
pub use sink::{CsvSink, MemorySink, NullSink};
