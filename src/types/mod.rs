pub mod json_path;
pub mod operation;
pub mod primitive;
pub mod version;

use crate::error::ContractError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use operation::{Operation, ParameterSpec, ResponseSpec};

/// Where a parameter is carried in the HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    FormData,
}

impl FromStr for ParameterLocation {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "cookie" => Ok(ParameterLocation::Cookie),
            "body" => Ok(ParameterLocation::Body),
            "formData" => Ok(ParameterLocation::FormData),
            other => Err(ContractError::malformed(
                "parameter",
                &format!("unknown parameter location '{}'", other),
            )),
        }
    }
}

impl Display for ParameterLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
            ParameterLocation::Body => write!(f, "body"),
            ParameterLocation::FormData => write!(f, "formData"),
        }
    }
}

/// Which side of an exchange a media type list applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// A query string or header value as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Appends another occurrence of the same key.
    pub fn push(self, value: impl Into<String>) -> QueryValue {
        match self {
            QueryValue::Single(first) => QueryValue::Multiple(vec![first, value.into()]),
            QueryValue::Multiple(mut values) => {
                values.push(value.into());
                QueryValue::Multiple(values)
            }
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Multiple(values)
    }
}
