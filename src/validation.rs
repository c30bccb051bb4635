use crate::error::{ContractElement, ContractError};
use crate::types::json_path::JsonPath;
use jsonschema::Draft;
use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};

const REQUIRED_MESSAGE: &str = "required property missing";

/// One violated constraint of a checked value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Location in the checked value, such as `[0].name` or `tags[1]`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.path, self.message)
    }
}

/// Result of validating one value: valid, or every field error in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    errors: Vec<FieldError>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Converts an invalid outcome into a `ValidationFailure` for `element`,
    /// keeping `value` for the report.
    pub fn into_result(self, element: ContractElement, value: &Value) -> Result<(), ContractError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ContractError::validation_failure(
                element,
                value.clone(),
                self.errors,
            ))
        }
    }
}

/// The structural check delegated to a JSON schema implementation.
///
/// Implementations must not carry state from one call to the next.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, value: &Value, schema: &Value) -> Result<ValidationOutcome, ContractError>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
///
/// A validator is compiled for every call, so no error list survives between checks.
#[derive(Debug, Clone, Copy)]
pub struct JsonSchemaValidator {
    draft: Draft,
    validate_formats: bool,
}

impl JsonSchemaValidator {
    pub fn new(draft: Draft) -> Self {
        Self {
            draft,
            validate_formats: true,
        }
    }

    pub fn validate_formats(mut self, validate_formats: bool) -> Self {
        self.validate_formats = validate_formats;
        self
    }

    fn translate(error: &jsonschema::ValidationError<'_>) -> FieldError {
        let mut path = JsonPath::from_pointer(&error.instance_path.to_string());
        match &error.kind {
            ValidationErrorKind::Required { property } => {
                match property.as_str() {
                    Some(property) => path.add(property),
                    None => path.add(property.to_string()),
                };
                FieldError::new(path.format_field_path(), REQUIRED_MESSAGE)
            }
            _ => FieldError::new(path.format_field_path(), error.to_string()),
        }
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value, schema: &Value) -> Result<ValidationOutcome, ContractError> {
        let validator = jsonschema::options()
            .with_draft(self.draft)
            .should_validate_formats(self.validate_formats)
            .build(schema)
            .map_err(|error| ContractError::malformed("schema", &error))?;
        let errors: Vec<FieldError> = validator
            .iter_errors(value)
            .map(|error| Self::translate(&error))
            .collect();
        if !errors.is_empty() {
            log::debug!("Value failed validation with {} errors", errors.len());
        }
        Ok(ValidationOutcome::from_errors(errors))
    }
}
