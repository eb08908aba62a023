//! The toy coupling model run by the client rank.
//!
//! Sequence: init client and context, load the `toymodel_*` variables, read
//! the coupled field's operation frequency, commit the model timestep, size
//! the domain, close the definition, then step until `start + duration`.

use crate::config::definition::DefinitionConfig;
use crate::core::client::Client;
use crate::core::context::Context;
use crate::domain::calendar::{CalendarKind, Date, Duration};
use crate::domain::model::FieldBlock;
use crate::domain::ports::{Communicator, FieldSink};
use crate::utils::error::{CouplerError, Result};
use serde::Serialize;

pub const VAR_DURATION: &str = "toymodel_duration";
pub const VAR_TIMESTEP_DURATION: &str = "toymodel_timestep_duration";
pub const VAR_NI_GLO: &str = "toymodel_ni_glo";
pub const VAR_NJ_GLO: &str = "toymodel_nj_glo";

pub const DEFAULT_FIELD_ID: &str = "field2D_oce_to_atm";
pub const DEFAULT_DOMAIN_ID: &str = "domain";

#[derive(Debug, Clone, PartialEq)]
pub struct ToyModelParameters {
    pub duration: Duration,
    pub timestep_duration: Duration,
    pub freq_op: Duration,
    pub freq_op_in_ts: u64,
    pub start_date: Date,
    pub ni_glo: usize,
    pub nj_glo: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouplingReport {
    pub model_id: String,
    pub calendar: CalendarKind,
    pub start_date: Date,
    pub end_date: Date,
    pub final_date: Date,
    pub timestep: Duration,
    pub freq_op: Duration,
    pub iterations: u64,
    pub fields_sent: usize,
    /// Steps where the loop date and the calendar's own date disagreed.
    pub calendar_drift_steps: u64,
}

/// Number of timesteps in a duration formatted as `<n>ts`.
pub fn timesteps_from_formatted(duration: &Duration) -> Result<u64> {
    let text = duration.to_string();
    text.strip_suffix("ts")
        .and_then(|count| count.parse::<u64>().ok())
        .ok_or_else(|| CouplerError::malformed(text.clone(), "expected a whole number of timesteps like '2ts'"))
}

fn positive_extent(context: &Context, name: &str) -> Result<usize> {
    let value = context.variables().get_int(name)?;
    usize::try_from(value)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| CouplerError::out_of_range(name, format!("grid extent must be positive, got {}", value)))
}

#[derive(Debug, Clone)]
pub struct ToyModel {
    model_id: String,
    field_id: String,
    domain_id: String,
}

impl ToyModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            field_id: DEFAULT_FIELD_ID.to_string(),
            domain_id: DEFAULT_DOMAIN_ID.to_string(),
        }
    }

    pub fn with_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = field_id.into();
        self
    }

    pub fn with_domain(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = domain_id.into();
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Reads the model variables and commits the model timestep.
    pub fn load_parameters(&self, context: &mut Context) -> Result<ToyModelParameters> {
        let duration = context.variables().get_duration(VAR_DURATION)?;
        let timestep_duration = context.variables().get_duration(VAR_TIMESTEP_DURATION)?;
        let ni_glo = positive_extent(context, VAR_NI_GLO)?;
        let nj_glo = positive_extent(context, VAR_NJ_GLO)?;

        let field = context.create_field_handle(&self.field_id)?;
        let freq_op = context.field_freq_op(&field)?;
        let freq_op_in_ts = timesteps_from_formatted(&freq_op)?;
        if freq_op_in_ts == 0 {
            return Err(CouplerError::out_of_range(
                format!("{}.freq_op", self.field_id),
                "operation frequency must be at least 1ts",
            ));
        }

        let start_date = context.calendar_start_date();
        context.set_calendar_timestep(timestep_duration)?;
        context.update_calendar_timestep()?;

        tracing::info!(
            model = %self.model_id,
            timestep = %timestep_duration,
            ni_glo,
            nj_glo,
            freq_op = %freq_op,
            freq_op_in_ts,
            "loaded toy model data"
        );

        Ok(ToyModelParameters {
            duration,
            timestep_duration,
            freq_op,
            freq_op_in_ts,
            start_date,
            ni_glo,
            nj_glo,
        })
    }

    /// Sizes the domain and closes the context definition.
    pub fn configure(&self, context: &mut Context, params: &ToyModelParameters) -> Result<()> {
        tracing::debug!(domain = %self.domain_id, "creating domain handle");
        let domain = context.create_domain_handle(&self.domain_id)?;
        context.set_domain_global_extents(&domain, params.ni_glo, params.nj_glo)?;
        context.close_definition()
    }

    /// Steps from the start date while `current < start + duration`.
    pub fn run_coupling(&self, context: &mut Context, params: &ToyModelParameters) -> Result<CouplingReport> {
        let calendar = context.calendar()?.clone();
        let end_date = calendar.add(&params.start_date, &params.duration)?;
        let mut current_date = params.start_date;
        let mut step: u64 = 1;
        let mut drift_steps = 0;

        while calendar.less_than(&current_date, &end_date)? {
            tracing::debug!(step, date = %current_date, "running coupling for timestep");
            context.update_calendar(step)?;

            if step % params.freq_op_in_ts == 0 {
                let block = FieldBlock::from_fn([params.ni_glo, params.nj_glo, 1], |i, j, _| {
                    // step counts stay far below 2^53
                    step as f64 + (i + j * params.ni_glo) as f64 * 1.0e-3
                });
                context.send_field(&self.field_id, 0, block)?;
            }

            let next_date = calendar.add(&current_date, &params.timestep_duration)?;
            if !calendar.less_than(&current_date, &next_date)? {
                return Err(CouplerError::out_of_range(
                    VAR_TIMESTEP_DURATION,
                    format!(
                        "'{}' does not advance {} at step {}",
                        params.timestep_duration, current_date, step
                    ),
                ));
            }
            current_date = next_date;
            let calendar_date = context.calendar()?.current_date()?;
            if calendar_date != current_date {
                drift_steps += 1;
                tracing::warn!(
                    step,
                    loop_date = %current_date,
                    calendar_date = %calendar_date,
                    "loop date and calendar date disagree"
                );
            }
            step += 1;
        }

        let report = CouplingReport {
            model_id: self.model_id.clone(),
            calendar: calendar.kind(),
            start_date: params.start_date,
            end_date,
            final_date: current_date,
            timestep: params.timestep_duration,
            freq_op: params.freq_op,
            iterations: step - 1,
            fields_sent: context.fields_sent(),
            calendar_drift_steps: drift_steps,
        };
        tracing::info!(
            model = %self.model_id,
            iterations = report.iterations,
            final_date = %report.final_date,
            "coupling loop finished"
        );
        Ok(report)
    }

    /// Full client sequence on rank 0, from client init to client finalize.
    pub fn run<C: Communicator>(
        &self,
        comm: C,
        definition: &DefinitionConfig,
        sink: Box<dyn FieldSink>,
    ) -> Result<CouplingReport> {
        let mut client = Client::init(&self.model_id, comm)?;
        let context_definition = definition.context(&self.model_id)?;
        let context = client.init_context(context_definition, sink)?;

        let params = self.load_parameters(context)?;
        self.configure(context, &params)?;
        let report = self.run_coupling(context, &params)?;

        client.finalize_context()?;
        client.finalize()?;
        Ok(report)
    }
}
