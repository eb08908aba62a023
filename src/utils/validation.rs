use crate::utils::error::{CouplerError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CouplerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(CouplerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(CouplerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CouplerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Ids must be non-empty and unique within one collection.
pub fn validate_unique_ids<'a>(field_name: &str, ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        validate_non_empty_string(field_name, id)?;
        if !seen.insert(id) {
            return Err(CouplerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: id.to_string(),
                reason: "Duplicate id".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_reference(field_name: &str, reference: Option<&str>, known: &HashSet<&str>) -> Result<()> {
    match reference {
        Some(id) if !known.contains(id) => Err(CouplerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: id.to_string(),
            reason: "Reference to an undefined object".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("ranks", 5, 1).is_ok());
        assert!(validate_positive_number("ranks", 0, 1).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output", "./output").is_ok());
        assert!(validate_path("output", "").is_err());
        assert!(validate_path("output", "a\0b").is_err());
    }

    #[test]
    fn test_validate_unique_ids() {
        assert!(validate_unique_ids("context.field", ["a", "b"]).is_ok());
        assert!(validate_unique_ids("context.field", ["a", "a"]).is_err());
        assert!(validate_unique_ids("context.field", [" "]).is_err());
    }

    #[test]
    fn test_validate_reference() {
        let known: HashSet<&str> = ["domain"].into_iter().collect();
        assert!(validate_reference("field.domain_ref", Some("domain"), &known).is_ok());
        assert!(validate_reference("field.domain_ref", None, &known).is_ok());
        assert!(validate_reference("field.domain_ref", Some("grid"), &known).is_err());
    }
}
