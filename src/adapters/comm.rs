use crate::domain::ports::Communicator;
use std::sync::{Arc, Barrier};

/// A group made of the current process only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}
}

/// One member of an in-process group; ranks typically run on their own thread.
#[derive(Debug, Clone)]
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl LocalCommunicator {
    /// Creates the communicators of a group of `size` ranks.
    pub fn group(size: usize) -> Vec<LocalCommunicator> {
        let size = size.max(1);
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| LocalCommunicator {
                rank,
                size,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
