//! Named configuration variables of a context.
//!
//! Every lookup returns a `Result`: a missing variable is
//! [`CouplerError::VariableNotFound`], never a zeroed value. Use the
//! `*_or` helpers when a default is acceptable.

use super::calendar::Duration;
use crate::utils::error::{CouplerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// Integer entries widen to doubles.
    Array(Vec<f64>),
}

impl VariableValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Text(_) => "character",
            Self::Array(_) => "double array",
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Array(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    values: BTreeMap<String, VariableValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: VariableValue) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&VariableValue> {
        self.values
            .get(name)
            .ok_or_else(|| CouplerError::VariableNotFound {
                name: name.to_string(),
            })
    }

    fn mismatch(name: &str, expected: &str, found: &VariableValue) -> CouplerError {
        CouplerError::VariableTypeMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            found: found.type_name().to_string(),
        }
    }

    /// Character payload. Scalars are rendered to text as the variable
    /// definition would spell them.
    pub fn get_string(&self, name: &str) -> Result<String> {
        Ok(self.get(name)?.to_string())
    }

    pub fn get_long(&self, name: &str) -> Result<i64> {
        match self.get(name)? {
            VariableValue::Int(v) => Ok(*v),
            VariableValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Self::mismatch(name, "integer", &VariableValue::Text(s.clone()))),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        let value = self.get_long(name)?;
        i32::try_from(value).map_err(|_| {
            CouplerError::out_of_range(name, format!("{} does not fit a 32-bit integer", value))
        })
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            VariableValue::Double(v) => Ok(*v),
            // integers widen losslessly for the magnitudes configs use
            VariableValue::Int(v) => Ok(*v as f64),
            VariableValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Self::mismatch(name, "double", &VariableValue::Text(s.clone()))),
            other => Err(Self::mismatch(name, "double", other)),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        Ok(self.get_double(name)? as f32)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            VariableValue::Bool(v) => Ok(*v),
            VariableValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | ".true." => Ok(true),
                "false" | ".false." => Ok(false),
                _ => Err(Self::mismatch(name, "boolean", &VariableValue::Text(s.clone()))),
            },
            other => Err(Self::mismatch(name, "boolean", other)),
        }
    }

    pub fn get_duration(&self, name: &str) -> Result<Duration> {
        match self.get(name)? {
            VariableValue::Text(s) => Duration::parse(s),
            other => Err(Self::mismatch(name, "duration string", other)),
        }
    }

    pub fn get_double_array(&self, name: &str) -> Result<Vec<f64>> {
        match self.get(name)? {
            VariableValue::Array(values) => Ok(values.clone()),
            other => Err(Self::mismatch(name, "double array", other)),
        }
    }

    pub fn get_int_or(&self, name: &str, default: i32) -> Result<i32> {
        if self.contains(name) {
            self.get_int(name)
        } else {
            Ok(default)
        }
    }

    pub fn get_duration_or(&self, name: &str, default: Duration) -> Result<Duration> {
        if self.contains(name) {
            self.get_duration(name)
        } else {
            Ok(default)
        }
    }
}

impl FromIterator<(String, VariableValue)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (String, VariableValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VariableStore {
        let mut vars = VariableStore::new();
        vars.insert("toymodel_duration", VariableValue::Text("5d".to_string()));
        vars.insert("toymodel_ni_glo", VariableValue::Int(10));
        vars.insert("ratio", VariableValue::Double(0.25));
        vars.insert("print_file", VariableValue::Bool(true));
        vars.insert("legacy_flag", VariableValue::Text(".false.".to_string()));
        vars
    }

    #[test]
    fn test_typed_lookups() {
        let vars = store();
        assert_eq!(vars.get_duration("toymodel_duration").unwrap(), Duration::days(5.0));
        assert_eq!(vars.get_int("toymodel_ni_glo").unwrap(), 10);
        assert_eq!(vars.get_double("toymodel_ni_glo").unwrap(), 10.0);
        assert_eq!(vars.get_float("ratio").unwrap(), 0.25_f32);
        assert!(vars.get_bool("print_file").unwrap());
        assert!(!vars.get_bool("legacy_flag").unwrap());
        assert_eq!(vars.get_string("toymodel_ni_glo").unwrap(), "10");
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let vars = store();
        assert!(matches!(
            vars.get_int("toymodel_nj_glo"),
            Err(CouplerError::VariableNotFound { name }) if name == "toymodel_nj_glo"
        ));
        assert_eq!(vars.get_int_or("toymodel_nj_glo", 4).unwrap(), 4);
    }

    #[test]
    fn test_type_mismatch() {
        let vars = store();
        assert!(matches!(
            vars.get_bool("toymodel_ni_glo"),
            Err(CouplerError::VariableTypeMismatch { .. })
        ));
        assert!(matches!(
            vars.get_duration("toymodel_ni_glo"),
            Err(CouplerError::VariableTypeMismatch { .. })
        ));
        assert!(vars.get_int("toymodel_duration").is_err());
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let vars: VariableStore = toml::from_str(
            r#"
toymodel_duration = "1d"
toymodel_ni_glo = 10
ratio = 1.5
print_file = true
lonvalue = [0, 90.5, 180]
"#,
        )
        .unwrap();
        assert_eq!(vars.len(), 5);
        assert_eq!(vars.get_double_array("lonvalue").unwrap(), vec![0.0, 90.5, 180.0]);
        assert_eq!(vars.get_string("lonvalue").unwrap(), "[0, 90.5, 180]");
        assert!(matches!(
            vars.get_double_array("ratio"),
            Err(CouplerError::VariableTypeMismatch { .. })
        ));
        assert!(vars.get_double("lonvalue").is_err());
        assert_eq!(vars.get("toymodel_ni_glo").unwrap(), &VariableValue::Int(10));
        assert_eq!(vars.get("ratio").unwrap(), &VariableValue::Double(1.5));
        assert_eq!(vars.get("print_file").unwrap(), &VariableValue::Bool(true));
    }
}
