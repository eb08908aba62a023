use crate::config::definition::ContextDefinition;
use crate::core::context::{Context, ContextSummary};
use crate::domain::ports::{Communicator, FieldSink};
use crate::utils::error::{CouplerError, Result};
use crate::utils::validation::validate_non_empty_string;

/// Client side of the group, driven by rank 0.
///
/// `init` and `finalize` pair with the two barriers every server rank waits
/// on. A client dropped without `finalize` still releases the servers.
pub struct Client<C: Communicator> {
    id: String,
    comm: C,
    context: Option<Context>,
    finalized_contexts: Vec<ContextSummary>,
    finalized: bool,
}

impl<C: Communicator> Client<C> {
    pub fn init(id: &str, comm: C) -> Result<Self> {
        if comm.rank() != 0 {
            return Err(CouplerError::lifecycle(format!(
                "client '{}' must run on rank 0, not rank {}",
                id,
                comm.rank()
            )));
        }
        comm.barrier();
        let client = Self {
            id: id.to_string(),
            comm,
            context: None,
            finalized_contexts: Vec::new(),
            finalized: false,
        };
        // on error the dropped client still joins the finalize barrier
        validate_non_empty_string("client.id", id)?;
        tracing::info!(client = id, group_size = client.comm.size(), "client initialized");
        Ok(client)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    pub fn init_context(&mut self, definition: &ContextDefinition, sink: Box<dyn FieldSink>) -> Result<&mut Context> {
        if let Some(open) = &self.context {
            return Err(CouplerError::lifecycle(format!(
                "context '{}' is still open, finalize it before initializing '{}'",
                open.id(),
                definition.id
            )));
        }
        let context = Context::new(definition, sink)?;
        tracing::info!(context = %definition.id, calendar = %context.calendar_kind(), "context initialized");
        Ok(self.context.insert(context))
    }

    fn no_context(&self) -> CouplerError {
        CouplerError::lifecycle(format!("client '{}' has no initialized context", self.id))
    }

    pub fn context(&self) -> Result<&Context> {
        self.context.as_ref().ok_or_else(|| self.no_context())
    }

    pub fn context_mut(&mut self) -> Result<&mut Context> {
        match self.context.as_mut() {
            Some(context) => Ok(context),
            None => Err(CouplerError::lifecycle(format!(
                "client '{}' has no initialized context",
                self.id
            ))),
        }
    }

    pub fn finalize_context(&mut self) -> Result<ContextSummary> {
        let context = self.context.take().ok_or_else(|| self.no_context())?;
        let summary = context.finalize()?;
        tracing::info!(context = %summary.id, fields_sent = summary.fields_sent, "context finalized");
        self.finalized_contexts.push(summary.clone());
        Ok(summary)
    }

    /// Last call of the client; the open context must be finalized first.
    pub fn finalize(mut self) -> Result<Vec<ContextSummary>> {
        if let Some(open) = &self.context {
            return Err(CouplerError::lifecycle(format!(
                "context '{}' must be finalized before the client",
                open.id()
            )));
        }
        self.finalized = true;
        self.comm.barrier();
        tracing::info!(client = %self.id, "client finalized");
        Ok(std::mem::take(&mut self.finalized_contexts))
    }
}

impl<C: Communicator> Drop for Client<C> {
    fn drop(&mut self) {
        if !self.finalized {
            tracing::warn!(client = %self.id, "client dropped without finalize, releasing servers");
            self.comm.barrier();
        }
    }
}
