use crate::domain::ports::Communicator;
use crate::utils::error::{CouplerError, Result};

/// Service loop of the non-client ranks.
///
/// Servers only take part in the client's init and finalize barriers; the
/// data transport between client and servers is not modelled.
pub struct Server;

impl Server {
    pub fn serve<C: Communicator>(comm: &C) -> Result<()> {
        if comm.rank() == 0 {
            return Err(CouplerError::lifecycle("rank 0 runs the client, not a server"));
        }
        tracing::debug!(rank = comm.rank(), "server waiting for client init");
        comm.barrier();
        tracing::debug!(rank = comm.rank(), "server waiting for client finalize");
        comm.barrier();
        tracing::debug!(rank = comm.rank(), "server done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LocalCommunicator, SingleProcess};
    use crate::core::client::Client;

    #[test]
    fn test_rank_zero_cannot_serve() {
        assert!(Server::serve(&SingleProcess).is_err());
    }

    #[test]
    fn test_servers_follow_client_barriers() {
        let mut group = LocalCommunicator::group(3);
        let client_comm = group.remove(0);
        let servers: Vec<_> = group
            .into_iter()
            .map(|comm| std::thread::spawn(move || Server::serve(&comm)))
            .collect();

        let client = Client::init("ocn", client_comm).unwrap();
        client.finalize().unwrap();

        for server in servers {
            assert!(server.join().unwrap().is_ok());
        }
    }

    #[test]
    fn test_dropped_client_releases_servers() {
        let mut group = LocalCommunicator::group(2);
        let client_comm = group.remove(0);
        let server_comm = group.remove(0);
        let server = std::thread::spawn(move || Server::serve(&server_comm));

        let client = Client::init("ocn", client_comm).unwrap();
        drop(client);

        assert!(server.join().unwrap().is_ok());
    }
}
