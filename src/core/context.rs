use crate::config::definition::ContextDefinition;
use crate::domain::calendar::{Calendar, CalendarBuilder, CalendarKind, CalendarState, Date, Duration};
use crate::domain::model::{Axis, Domain, Field, FieldBlock, FieldRecord};
use crate::domain::ports::FieldSink;
use crate::domain::variables::VariableStore;
use crate::utils::error::{CouplerError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainHandle(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisHandle(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldHandle(String);

macro_rules! handle_id {
    ($($handle:ident),*) => {
        $(impl $handle {
            pub fn id(&self) -> &str {
                &self.0
            }
        })*
    };
}

handle_id!(DomainHandle, AxisHandle, FieldHandle);

#[derive(Debug, Clone)]
enum ContextCalendar {
    Configured(CalendarBuilder),
    Active(Calendar),
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub id: String,
    pub calendar_step: u64,
    pub fields_sent: usize,
}

/// A named configuration scope: calendar, variables, grid objects and fields.
///
/// Attributes can change until [`Context::close_definition`]; fields can only
/// be sent afterwards.
pub struct Context {
    id: String,
    calendar: ContextCalendar,
    variables: VariableStore,
    domains: BTreeMap<String, Domain>,
    axes: BTreeMap<String, Axis>,
    fields: BTreeMap<String, Field>,
    closed: bool,
    sink: Box<dyn FieldSink>,
    fields_sent: usize,
}

impl Context {
    pub fn new(definition: &ContextDefinition, sink: Box<dyn FieldSink>) -> Result<Self> {
        let builder = definition.calendar.builder()?;
        let calendar = match definition.calendar.timestep {
            Some(timestep) => ContextCalendar::Active(builder.with_timestep(timestep)?),
            None => ContextCalendar::Configured(builder),
        };

        Ok(Self {
            id: definition.id.clone(),
            calendar,
            variables: definition.variables.clone(),
            domains: definition
                .domains
                .iter()
                .map(|d| (d.id.clone(), d.clone()))
                .collect(),
            axes: definition
                .axes
                .iter()
                .map(|a| (a.id.clone(), a.clone()))
                .collect(),
            fields: definition
                .fields
                .iter()
                .map(|f| (f.id.clone(), f.clone()))
                .collect(),
            closed: false,
            sink,
            fields_sent: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn is_definition_closed(&self) -> bool {
        self.closed
    }

    // ---- calendar ----

    pub fn calendar_state(&self) -> CalendarState {
        match &self.calendar {
            ContextCalendar::Configured(builder) => builder.state(),
            ContextCalendar::Active(calendar) => calendar.state(),
        }
    }

    pub fn calendar_kind(&self) -> CalendarKind {
        match &self.calendar {
            ContextCalendar::Configured(builder) => builder.kind(),
            ContextCalendar::Active(calendar) => calendar.kind(),
        }
    }

    pub fn calendar_start_date(&self) -> Date {
        match &self.calendar {
            ContextCalendar::Configured(builder) => *builder.start_date(),
            ContextCalendar::Active(calendar) => *calendar.start_date(),
        }
    }

    pub fn calendar_time_origin(&self) -> Date {
        match &self.calendar {
            ContextCalendar::Configured(builder) => *builder.time_origin(),
            ContextCalendar::Active(calendar) => *calendar.time_origin(),
        }
    }

    /// The active calendar; fails until a timestep has been committed.
    pub fn calendar(&self) -> Result<&Calendar> {
        match &self.calendar {
            ContextCalendar::Active(calendar) => Ok(calendar),
            ContextCalendar::Configured(_) => Err(CouplerError::lifecycle(format!(
                "context '{}' calendar has no committed timestep",
                self.id
            ))),
        }
    }

    pub fn set_calendar_timestep(&mut self, timestep: Duration) -> Result<()> {
        match &mut self.calendar {
            ContextCalendar::Configured(builder) => builder.set_timestep(timestep),
            ContextCalendar::Active(calendar) => calendar.set_timestep(timestep),
        }
    }

    /// Commits the timestep staged by [`Context::set_calendar_timestep`].
    pub fn update_calendar_timestep(&mut self) -> Result<()> {
        let committed = match &mut self.calendar {
            ContextCalendar::Active(calendar) => {
                calendar.update_timestep();
                return Ok(());
            }
            ContextCalendar::Configured(builder) => builder.clone().update_timestep()?,
        };
        tracing::debug!(context = %self.id, timestep = %committed.timestep(), "calendar activated");
        self.calendar = ContextCalendar::Active(committed);
        Ok(())
    }

    /// Sets and commits a timestep in one step.
    pub fn reconfigure_calendar(&mut self, timestep: Duration) -> Result<()> {
        self.set_calendar_timestep(timestep)?;
        self.update_calendar_timestep()
    }

    pub fn update_calendar(&mut self, step: u64) -> Result<()> {
        match &mut self.calendar {
            ContextCalendar::Active(calendar) => {
                calendar.update(step);
                Ok(())
            }
            ContextCalendar::Configured(_) => Err(CouplerError::lifecycle(format!(
                "context '{}' cannot advance before a timestep is committed",
                self.id
            ))),
        }
    }

    // ---- handles ----

    fn unknown(kind: &str, id: &str) -> CouplerError {
        CouplerError::UnknownObject {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.closed {
            Err(CouplerError::DefinitionClosed {
                context: self.id.clone(),
                action: action.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn create_domain_handle(&self, id: &str) -> Result<DomainHandle> {
        if self.domains.contains_key(id) {
            Ok(DomainHandle(id.to_string()))
        } else {
            Err(Self::unknown("domain", id))
        }
    }

    pub fn create_axis_handle(&self, id: &str) -> Result<AxisHandle> {
        if self.axes.contains_key(id) {
            Ok(AxisHandle(id.to_string()))
        } else {
            Err(Self::unknown("axis", id))
        }
    }

    pub fn create_field_handle(&self, id: &str) -> Result<FieldHandle> {
        if self.fields.contains_key(id) {
            Ok(FieldHandle(id.to_string()))
        } else {
            Err(Self::unknown("field", id))
        }
    }

    pub fn domain(&self, handle: &DomainHandle) -> Result<&Domain> {
        self.domains
            .get(handle.id())
            .ok_or_else(|| Self::unknown("domain", handle.id()))
    }

    pub fn domain_mut(&mut self, handle: &DomainHandle) -> Result<&mut Domain> {
        self.ensure_open("modify a domain")?;
        self.domains
            .get_mut(handle.id())
            .ok_or_else(|| Self::unknown("domain", handle.id()))
    }

    pub fn set_domain_global_extents(&mut self, handle: &DomainHandle, ni_glo: usize, nj_glo: usize) -> Result<()> {
        let domain = self.domain_mut(handle)?;
        domain.ni_glo = Some(ni_glo);
        domain.nj_glo = Some(nj_glo);
        Ok(())
    }

    pub fn domain_global_extents(&self, handle: &DomainHandle) -> Result<(usize, usize)> {
        let domain = self.domain(handle)?;
        domain.ni_glo.zip(domain.nj_glo).ok_or_else(|| {
            CouplerError::ConfigValidationError {
                field: format!("domain.{}", domain.id),
                message: "ni_glo/nj_glo are not set".to_string(),
            }
        })
    }

    pub fn axis(&self, handle: &AxisHandle) -> Result<&Axis> {
        self.axes
            .get(handle.id())
            .ok_or_else(|| Self::unknown("axis", handle.id()))
    }

    pub fn axis_mut(&mut self, handle: &AxisHandle) -> Result<&mut Axis> {
        self.ensure_open("modify an axis")?;
        self.axes
            .get_mut(handle.id())
            .ok_or_else(|| Self::unknown("axis", handle.id()))
    }

    pub fn field(&self, handle: &FieldHandle) -> Result<&Field> {
        self.fields
            .get(handle.id())
            .ok_or_else(|| Self::unknown("field", handle.id()))
    }

    pub fn field_mut(&mut self, handle: &FieldHandle) -> Result<&mut Field> {
        self.ensure_open("modify a field")?;
        self.fields
            .get_mut(handle.id())
            .ok_or_else(|| Self::unknown("field", handle.id()))
    }

    pub fn field_freq_op(&self, handle: &FieldHandle) -> Result<Duration> {
        Ok(self.field(handle)?.freq_op)
    }

    // ---- definition phase ----

    fn check_domain(domain: &Domain) -> Result<()> {
        let invalid = |reason: String| CouplerError::ConfigValidationError {
            field: format!("domain.{}", domain.id),
            message: reason,
        };

        if let (Some(ni_glo), Some(nj_glo), Some((ibegin, jbegin, ni, nj))) =
            (domain.ni_glo, domain.nj_glo, domain.local_window())
        {
            if ibegin + ni > ni_glo || jbegin + nj > nj_glo {
                return Err(invalid(format!(
                    "local window {}x{} at ({}, {}) exceeds the {}x{} grid",
                    ni, nj, ibegin, jbegin, ni_glo, nj_glo
                )));
            }
            // rectilinear (1D) or curvilinear (2D) coordinates
            let lon_ok = domain.lonvalue.is_empty() || [ni, ni * nj].contains(&domain.lonvalue.len());
            let lat_ok = domain.latvalue.is_empty() || [nj, ni * nj].contains(&domain.latvalue.len());
            if !lon_ok || !lat_ok {
                return Err(invalid("lonvalue/latvalue lengths do not match the local window".to_string()));
            }
        }
        Ok(())
    }

    /// Ends the definition phase after checking every domain and axis.
    pub fn close_definition(&mut self) -> Result<()> {
        self.ensure_open("close the definition twice")?;
        for domain in self.domains.values() {
            Self::check_domain(domain)?;
        }
        for axis in self.axes.values() {
            if let Some(n_glo) = axis.n_glo {
                if !axis.value.is_empty() && axis.value.len() != n_glo {
                    return Err(CouplerError::ConfigValidationError {
                        field: format!("axis.{}", axis.id),
                        message: format!("{} values for n_glo = {}", axis.value.len(), n_glo),
                    });
                }
            }
        }
        self.closed = true;
        tracing::info!(
            context = %self.id,
            domains = self.domains.len(),
            axes = self.axes.len(),
            fields = self.fields.len(),
            "context definition closed"
        );
        Ok(())
    }

    // ---- data ----

    /// Writes a 3D block for the current calendar step.
    pub fn send_field(&mut self, field_id: &str, tile_id: usize, block: FieldBlock) -> Result<()> {
        if !self.closed {
            return Err(CouplerError::lifecycle(format!(
                "context '{}' must close its definition before sending '{}'",
                self.id, field_id
            )));
        }
        let field = self
            .fields
            .get(field_id)
            .ok_or_else(|| Self::unknown("field", field_id))?;
        if !block.is_consistent() {
            return Err(CouplerError::out_of_range(
                field_id,
                format!("{} values for shape {:?}", block.values.len(), block.shape),
            ));
        }
        if block.values.is_empty() {
            return Err(CouplerError::out_of_range(
                field_id,
                format!("shape {:?} holds no values", block.shape),
            ));
        }
        if let Some(window) = field
            .domain_ref
            .as_ref()
            .and_then(|id| self.domains.get(id))
            .and_then(Domain::local_window)
        {
            let (_, _, ni, nj) = window;
            if block.shape[0] != ni || block.shape[1] != nj {
                return Err(CouplerError::out_of_range(
                    field_id,
                    format!("shape {:?} does not match the {}x{} domain window", block.shape, ni, nj),
                ));
            }
        }

        let calendar = self.calendar()?;
        let record = FieldRecord {
            context_id: self.id.clone(),
            field_id: field_id.to_string(),
            tile_id,
            step: calendar.step(),
            date: calendar.current_date()?,
            block,
        };
        tracing::debug!(field = field_id, tile = tile_id, step = record.step, "sending field");
        self.sink.write(record)?;
        self.fields_sent += 1;
        Ok(())
    }

    pub fn fields_sent(&self) -> usize {
        self.fields_sent
    }

    /// Flushes the sink and reports what the context did.
    pub fn finalize(mut self) -> Result<ContextSummary> {
        self.sink.flush()?;
        let calendar_step = self.calendar().map(Calendar::step).unwrap_or(0);
        Ok(ContextSummary {
            id: self.id,
            calendar_step,
            fields_sent: self.fields_sent,
        })
    }
}
