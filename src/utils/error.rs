use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouplerError {
    #[error("Malformed input '{input}': {reason}")]
    MalformedInput { input: String, reason: String },

    #[error("Calendar mismatch: cannot combine a {left} date with a {right} date")]
    CalendarMismatch { left: String, right: String },

    #[error("Value out of range for {what}: {reason}")]
    OutOfRange { what: String, reason: String },

    #[error("Variable '{name}' is not defined")]
    VariableNotFound { name: String },

    #[error("Variable '{name}' holds a {found} value, expected {expected}")]
    VariableTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Unknown {kind} '{id}'")]
    UnknownObject { kind: String, id: String },

    #[error("Context '{context}' definition is closed, cannot {action}")]
    DefinitionClosed { context: String, action: String },

    #[error("Lifecycle error: {message}")]
    Lifecycle { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Calendar,
    Configuration,
    Lifecycle,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CouplerError {
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn out_of_range(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedInput { .. } => ErrorCategory::Input,
            Self::CalendarMismatch { .. } | Self::OutOfRange { .. } => ErrorCategory::Calendar,
            Self::VariableNotFound { .. }
            | Self::VariableTypeMismatch { .. }
            | Self::UnknownObject { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::DefinitionClosed { .. } | Self::Lifecycle { .. } => ErrorCategory::Lifecycle,
            Self::IoError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Calendar => ErrorSeverity::Medium,
            ErrorCategory::Lifecycle | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MalformedInput { .. } => {
                "Durations use <number><unit> tokens (y, mo, d, h, mi, s, ts); dates use YYYY-MM-DD hh:mm:ss"
                    .to_string()
            }
            Self::CalendarMismatch { .. } => {
                "Make sure every date is created from the context calendar".to_string()
            }
            Self::OutOfRange { what, .. } => format!("Check the value given for {}", what),
            Self::VariableNotFound { name } => {
                format!("Add '{}' to the [context.variables] table", name)
            }
            Self::VariableTypeMismatch { name, expected, .. } => {
                format!("Give '{}' a {} value in the definition file", name, expected)
            }
            Self::UnknownObject { kind, id } => {
                format!("Declare a {} with id '{}' in the definition file", kind, id)
            }
            Self::DefinitionClosed { .. } => {
                "Set attributes before closing the context definition".to_string()
            }
            Self::Lifecycle { .. } => {
                "Initialize the client and context before use, and finalize them last".to_string()
            }
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' entry in the definition file", field)
            }
            Self::TomlError(_) => "Make sure the definition file is valid TOML".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Check that the output directory is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Could not read a value: {}", self),
            ErrorCategory::Calendar => format!("Calendar arithmetic failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Lifecycle => format!("Call sequence problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CouplerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let err = CouplerError::malformed("3x", "unknown unit");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = CouplerError::lifecycle("client not initialized");
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = CouplerError::VariableNotFound {
            name: "toymodel_duration".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_suggestion().contains("toymodel_duration"));
    }

    #[test]
    fn test_display_messages() {
        let err = CouplerError::CalendarMismatch {
            left: "gregorian".to_string(),
            right: "noleap".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Calendar mismatch: cannot combine a gregorian date with a noleap date"
        );
        assert!(err.user_friendly_message().starts_with("Calendar arithmetic failed"));
    }
}
