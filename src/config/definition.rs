use crate::domain::calendar::{CalendarBuilder, CalendarKind, Duration};
use crate::domain::model::{Axis, Domain, Field};
use crate::domain::variables::VariableStore;
use crate::utils::error::{CouplerError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_reference, validate_unique_ids, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Simulation definition file: one entry per context.
///
/// ```toml
/// [simulation]
/// name = "toy"
///
/// [[context]]
/// id = "ocn"
///
/// [context.calendar]
/// type = "gregorian"
/// start_date = "2020-01-01"
///
/// [context.variables]
/// toymodel_duration = "5d"
///
/// [[context.domain]]
/// id = "domain"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionConfig {
    pub simulation: SimulationInfo,
    #[serde(rename = "context", default)]
    pub contexts: Vec<ContextDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDefinition {
    pub id: String,
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub variables: VariableStore,
    #[serde(rename = "domain", default)]
    pub domains: Vec<Domain>,
    #[serde(rename = "axis", default)]
    pub axes: Vec<Axis>,
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(rename = "type", default)]
    pub kind: CalendarKind,
    /// Defaults to the start date.
    pub time_origin: Option<String>,
    pub start_date: String,
    /// Committed right away when present.
    pub timestep: Option<Duration>,
}

impl CalendarConfig {
    pub fn builder(&self) -> Result<CalendarBuilder> {
        let origin = self.time_origin.as_deref().unwrap_or(&self.start_date);
        CalendarBuilder::parse(self.kind, origin, &self.start_date)
    }
}

impl DefinitionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CouplerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CouplerError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn context(&self, id: &str) -> Result<&ContextDefinition> {
        self.contexts
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CouplerError::UnknownObject {
                kind: "context".to_string(),
                id: id.to_string(),
            })
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("simulation.name", &self.simulation.name)?;
        if self.contexts.is_empty() {
            return Err(CouplerError::ConfigValidationError {
                field: "context".to_string(),
                message: "at least one [[context]] is required".to_string(),
            });
        }
        validate_unique_ids("context.id", self.contexts.iter().map(|c| c.id.as_str()))?;
        for context in &self.contexts {
            context.validate()?;
        }
        Ok(())
    }
}

impl Validate for DefinitionConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl Validate for ContextDefinition {
    fn validate(&self) -> Result<()> {
        let builder = self.calendar.builder().map_err(|e| CouplerError::InvalidConfigValueError {
            field: format!("{}.calendar", self.id),
            value: self.calendar.start_date.clone(),
            reason: e.to_string(),
        })?;
        if let Some(timestep) = self.calendar.timestep {
            builder.with_timestep(timestep)?;
        }

        validate_unique_ids("context.domain.id", self.domains.iter().map(|d| d.id.as_str()))?;
        validate_unique_ids("context.axis.id", self.axes.iter().map(|a| a.id.as_str()))?;
        validate_unique_ids("context.field.id", self.fields.iter().map(|f| f.id.as_str()))?;

        let domains: HashSet<&str> = self.domains.iter().map(|d| d.id.as_str()).collect();
        let axes: HashSet<&str> = self.axes.iter().map(|a| a.id.as_str()).collect();
        for field in &self.fields {
            validate_reference("context.field.domain_ref", field.domain_ref.as_deref(), &domains)?;
            validate_reference("context.field.axis_ref", field.axis_ref.as_deref(), &axes)?;
        }
        Ok(())
    }
}
