use crate::adapters::LocalCommunicator;
use crate::config::definition::DefinitionConfig;
use crate::core::server::Server;
use crate::core::toymodel::{CouplingReport, ToyModel};
use crate::domain::ports::{Communicator, FieldSink};
use crate::utils::error::{CouplerError, Result};
use crate::utils::monitor::SystemMonitor;
use std::sync::{mpsc, Arc};
use std::thread;
use tokio::sync::oneshot;

/// A rank running on its own OS thread, held at a start gate.
struct RankThread<T> {
    start: mpsc::Sender<()>,
    done: oneshot::Receiver<Result<T>>,
}

impl<T> RankThread<T> {
    fn release(&self) {
        // the thread only exits early if it panicked
        let _ = self.start.send(());
    }

    async fn join(self, role: &str) -> Result<T> {
        self.done
            .await
            .map_err(|_| CouplerError::lifecycle(format!("{} rank panicked", role)))?
    }
}

/// Spawns a rank thread that waits for `release` before running `job`.
///
/// Ranks block on a shared barrier, so each one needs a thread of its own;
/// if the gate is dropped unreleased the thread exits without touching the
/// barrier.
fn spawn_rank<T, F>(rank: usize, job: F) -> Result<RankThread<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (start, started) = mpsc::channel();
    let (finished, done) = oneshot::channel();
    thread::Builder::new()
        .name(format!("rank-{}", rank))
        .spawn(move || {
            let result = match started.recv() {
                Ok(()) => job(),
                Err(_) => Err(CouplerError::lifecycle(format!("rank {} was never started", rank))),
            };
            let _ = finished.send(result);
        })?;
    Ok(RankThread { start, done })
}

/// Runs a whole execution group: the toy model on rank 0, servers elsewhere.
pub struct CouplerEngine {
    definition: Arc<DefinitionConfig>,
    model: ToyModel,
    ranks: usize,
    monitor: SystemMonitor,
}

impl CouplerEngine {
    pub fn new(definition: DefinitionConfig, model: ToyModel) -> Self {
        Self::new_with_monitoring(definition, model, false)
    }

    pub fn new_with_monitoring(definition: DefinitionConfig, model: ToyModel, monitor_enabled: bool) -> Self {
        Self {
            definition: Arc::new(definition),
            model,
            ranks: 1,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn with_ranks(mut self, ranks: usize) -> Self {
        self.ranks = ranks.max(1);
        self
    }

    pub async fn run(&self, sink: Box<dyn FieldSink>) -> Result<CouplingReport> {
        tracing::info!(
            simulation = %self.definition.simulation.name,
            model = self.model.model_id(),
            ranks = self.ranks,
            "starting coupling run"
        );
        self.monitor.log_stats("startup");

        let mut comms = LocalCommunicator::group(self.ranks).into_iter();
        let client_comm = comms
            .next()
            .ok_or_else(|| CouplerError::lifecycle("execution group is empty"))?;

        let model = self.model.clone();
        let definition = Arc::clone(&self.definition);
        let client = spawn_rank(0, move || model.run(client_comm, &definition, sink))?;
        let servers = comms
            .map(|comm| spawn_rank(comm.rank(), move || Server::serve(&comm)))
            .collect::<Result<Vec<_>>>()?;

        // every rank exists, so none of them can wait on a missing peer
        client.release();
        for server in &servers {
            server.release();
        }

        let report = client.join("client").await;
        for server in servers {
            server.join("server").await?;
        }

        self.monitor.log_final_stats();
        report
    }
}
