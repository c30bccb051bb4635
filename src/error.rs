use crate::validation::FieldError;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// The part of an HTTP message a check was performed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractElement {
    RequestBody,
    ResponseBody,
    RequestHeaders,
    ResponseHeaders,
    RequestQuery,
    RequestPath,
    RequestMediaType,
    ResponseMediaType,
}

impl Display for ContractElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractElement::RequestBody => write!(f, "request body"),
            ContractElement::ResponseBody => write!(f, "response body"),
            ContractElement::RequestHeaders => write!(f, "request headers"),
            ContractElement::ResponseHeaders => write!(f, "response headers"),
            ContractElement::RequestQuery => write!(f, "request query"),
            ContractElement::RequestPath => write!(f, "request path parameters"),
            ContractElement::RequestMediaType => write!(f, "request media type"),
            ContractElement::ResponseMediaType => write!(f, "response media type"),
        }
    }
}

/// Coarse classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractErrorKind {
    DocumentLoad,
    ContractNotFound,
    ResponseNotFound,
    MalformedContract,
    ValidationFailure,
    MediaTypeNotAllowed,
}

/// Every failure raised while loading a document or checking a message against it.
///
/// `MalformedContract` and `DocumentLoad` describe a broken API document, while
/// `ValidationFailure` and `MediaTypeNotAllowed` describe traffic that does not
/// match an otherwise sound document. Use [`ContractError::kind`] or
/// [`ContractError::is_mismatch`] to tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractError {
    /// The document could not be read, parsed, or fully dereferenced.
    DocumentLoad { source: String, reason: String },

    /// No template matches the path, or the method is not declared for it.
    ContractNotFound {
        path: String,
        method: Option<String>,
    },

    /// Neither the status code nor `default` is declared for the operation.
    ResponseNotFound {
        template: String,
        method: String,
        status: String,
    },

    /// The document is internally inconsistent at `location`.
    MalformedContract { location: String, reason: String },

    /// The observed value does not conform to the declared schema.
    ValidationFailure {
        element: ContractElement,
        value: Value,
        errors: Vec<FieldError>,
    },

    /// The observed media type is not one of the declared ones.
    MediaTypeNotAllowed {
        element: ContractElement,
        observed: String,
        allowed: Vec<String>,
    },
}

impl ContractError {
    pub(crate) fn document_load<S, R>(source: &S, reason: &R) -> Self
    where
        S: ToString + ?Sized,
        R: ToString + ?Sized,
    {
        ContractError::DocumentLoad {
            source: source.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn contract_not_found<T>(path: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        ContractError::ContractNotFound {
            path: path.to_string(),
            method: None,
        }
    }

    pub(crate) fn operation_not_found<P, M>(path: &P, method: &M) -> Self
    where
        P: ToString + ?Sized,
        M: ToString + ?Sized,
    {
        ContractError::ContractNotFound {
            path: path.to_string(),
            method: Some(method.to_string()),
        }
    }

    pub(crate) fn response_not_found<T, M, S>(template: &T, method: &M, status: &S) -> Self
    where
        T: ToString + ?Sized,
        M: ToString + ?Sized,
        S: ToString + ?Sized,
    {
        ContractError::ResponseNotFound {
            template: template.to_string(),
            method: method.to_string(),
            status: status.to_string(),
        }
    }

    pub(crate) fn malformed<L, R>(location: &L, reason: &R) -> Self
    where
        L: ToString + ?Sized,
        R: ToString + ?Sized,
    {
        ContractError::MalformedContract {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn validation_failure(
        element: ContractElement,
        value: Value,
        errors: Vec<FieldError>,
    ) -> Self {
        ContractError::ValidationFailure {
            element,
            value,
            errors,
        }
    }

    pub(crate) fn media_type_not_allowed<T>(
        element: ContractElement,
        observed: &T,
        allowed: Vec<String>,
    ) -> Self
    where
        T: ToString + ?Sized,
    {
        ContractError::MediaTypeNotAllowed {
            element,
            observed: observed.to_string(),
            allowed,
        }
    }

    pub fn kind(&self) -> ContractErrorKind {
        match self {
            ContractError::DocumentLoad { .. } => ContractErrorKind::DocumentLoad,
            ContractError::ContractNotFound { .. } => ContractErrorKind::ContractNotFound,
            ContractError::ResponseNotFound { .. } => ContractErrorKind::ResponseNotFound,
            ContractError::MalformedContract { .. } => ContractErrorKind::MalformedContract,
            ContractError::ValidationFailure { .. } => ContractErrorKind::ValidationFailure,
            ContractError::MediaTypeNotAllowed { .. } => ContractErrorKind::MediaTypeNotAllowed,
        }
    }

    /// `true` when the traffic disagrees with a sound contract.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self.kind(),
            ContractErrorKind::ValidationFailure | ContractErrorKind::MediaTypeNotAllowed
        )
    }

    /// Field level violations carried by a `ValidationFailure`, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ContractError::ValidationFailure { errors, .. } => errors,
            _ => &[],
        }
    }

    /// The contract element a mismatch was reported for.
    pub fn element(&self) -> Option<ContractElement> {
        match self {
            ContractError::ValidationFailure { element, .. }
            | ContractError::MediaTypeNotAllowed { element, .. } => Some(*element),
            _ => None,
        }
    }
}

impl Display for ContractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractError::DocumentLoad { source, reason } => {
                write!(f, "Unable to load API document '{}': {}", source, reason)
            }
            ContractError::ContractNotFound { path, method: None } => {
                write!(
                    f,
                    "Request URI '{}' does not match any declared path template",
                    path
                )
            }
            ContractError::ContractNotFound {
                path,
                method: Some(method),
            } => {
                write!(
                    f,
                    "Method {} is not declared for path template '{}'",
                    method.to_uppercase(),
                    path
                )
            }
            ContractError::ResponseNotFound {
                template,
                method,
                status,
            } => {
                write!(
                    f,
                    "No response declared for status {} (nor a default) in {} {}",
                    status,
                    method.to_uppercase(),
                    template
                )
            }
            ContractError::MalformedContract { location, reason } => {
                write!(f, "Malformed contract at '{}': {}", location, reason)
            }
            ContractError::ValidationFailure {
                element,
                value,
                errors,
            } => {
                write!(f, "{} is not a valid {}", value, element)?;
                for error in errors {
                    write!(f, "\n{}", error)?;
                }
                Ok(())
            }
            ContractError::MediaTypeNotAllowed {
                element,
                observed,
                allowed,
            } => {
                write!(
                    f,
                    "'{}' is not an allowed {} ({})",
                    observed,
                    element,
                    allowed.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ContractError {}
