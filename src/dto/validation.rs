//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Longest accepted participant or prize name, in characters.
pub const MAX_NAME_LENGTH: usize = 120;

/// Trim every name, drop blanks and keep the first occurrence of duplicates.
pub fn normalize_names(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_string()))
        .map(str::to_string)
        .collect()
}

/// Validates that a name list keeps at least one entry after normalisation and that no
/// entry is overly long.
///
/// # Examples
///
/// ```ignore
/// validate_names(&["Ana".into()])          // Ok
/// validate_names(&["  ".into()])           // Err - nothing left after trimming
/// ```
pub fn validate_names(values: &[String]) -> Result<(), ValidationError> {
    if normalize_names(values).is_empty() {
        let mut err = ValidationError::new("names_empty");
        err.message = Some("At least one non-blank name is required".into());
        return Err(err);
    }

    if let Some(long) = values
        .iter()
        .find(|value| value.trim().chars().count() > MAX_NAME_LENGTH)
    {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!(
                "Names must be at most {MAX_NAME_LENGTH} characters (got {})",
                long.trim().chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn normalize_trims_and_dedupes_in_order() {
        assert_eq!(
            normalize_names(&names(&[" Ana ", "Ben", "", "Ana", "  ", "ben"])),
            names(&["Ana", "Ben", "ben"])
        );
    }

    #[test]
    fn blank_lists_are_rejected() {
        assert!(validate_names(&names(&["Ana"])).is_ok());
        assert!(validate_names(&names(&[" ", ""])).is_err());
        assert!(validate_names(&[]).is_err());
    }

    #[test]
    fn overly_long_names_are_rejected() {
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_names(&[long]).is_err());
    }
}
