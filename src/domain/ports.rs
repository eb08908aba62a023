use crate::domain::model::FieldRecord;
use crate::utils::error::Result;

/// Message-passing group the client and servers run in.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Blocks until every member of the group reaches the barrier.
    fn barrier(&self);
}

/// Destination of field writes.
pub trait FieldSink: Send {
    fn write(&mut self, record: FieldRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: FieldSink + ?Sized> FieldSink for Box<S> {
    fn write(&mut self, record: FieldRecord) -> Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
