/// Field-level validation results
///
/// Validation failures carry one entry per offending field so clients can
/// highlight the right input.

use serde::{Deserialize, Serialize};

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Trims `value` and rejects it if nothing is left
pub fn required_text(field: &str, value: Option<&str>) -> Result<String, FieldError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(FieldError::new(field, format!("{} is required", field))),
    }
}

/// Joins field errors into one human-readable message
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("title", Some("  hi ")).unwrap(), "hi");
        assert!(required_text("title", Some("   ")).is_err());

        let err = required_text("title", None).unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.message, "title is required");
    }

    #[test]
    fn test_summarize() {
        let errors = vec![
            FieldError::new("title", "title is required"),
            FieldError::new("end", "end must not be before start"),
        ];
        assert_eq!(
            summarize(&errors),
            "title is required; end must not be before start"
        );
    }
}
