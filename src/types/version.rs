use crate::{OPENAPI_FIELD, SWAGGER_FIELD};
use jsonschema::Draft;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The API description dialect of a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger20,
    V30x,
    V31x,
}

impl FromStr for SpecVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "2.0" {
            Ok(SpecVersion::Swagger20)
        } else if s.starts_with("3.1") {
            Ok(SpecVersion::V31x)
        } else if s.starts_with("3.0") {
            Ok(SpecVersion::V30x)
        } else {
            Err(VersionError::unsupported_version(s))
        }
    }
}

impl SpecVersion {
    /// Reads the `swagger` or `openapi` marker of a document root.
    pub fn detect(root: &Value) -> Result<Self, VersionError> {
        let marker = root
            .get(SWAGGER_FIELD)
            .or_else(|| root.get(OPENAPI_FIELD))
            .ok_or(VersionError::MissingVersion)?;
        match marker.as_str() {
            Some(version) => SpecVersion::from_str(version),
            None => Err(VersionError::unsupported_version(&marker.to_string())),
        }
    }

    pub(crate) fn get_draft(&self) -> Draft {
        match self {
            SpecVersion::Swagger20 | SpecVersion::V30x => Draft::Draft4,
            SpecVersion::V31x => Draft::Draft202012,
        }
    }

    /// Bodies are described through `content` maps rather than body parameters.
    pub fn uses_content_map(&self) -> bool {
        !matches!(self, SpecVersion::Swagger20)
    }
}

#[derive(Debug)]
pub enum VersionError {
    MissingVersion,
    UnsupportedVersion(String),
}

impl VersionError {
    pub(crate) fn unsupported_version<T>(version: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        VersionError::UnsupportedVersion(version.to_string())
    }
}

impl Display for VersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionError::MissingVersion => {
                write!(f, "Missing '{}' or '{}' field", SWAGGER_FIELD, OPENAPI_FIELD)
            }
            VersionError::UnsupportedVersion(version) => {
                write!(f, "Unsupported version: {}", version)
            }
        }
    }
}

impl std::error::Error for VersionError {}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_swagger_and_openapi() {
        assert_eq!(
            SpecVersion::detect(&json!({"swagger": "2.0"})).unwrap(),
            SpecVersion::Swagger20
        );
        assert_eq!(
            SpecVersion::detect(&json!({"openapi": "3.0.3"})).unwrap(),
            SpecVersion::V30x
        );
        assert_eq!(
            SpecVersion::detect(&json!({"openapi": "3.1.0"})).unwrap(),
            SpecVersion::V31x
        );
    }

    #[test]
    fn test_draft_selection() {
        assert_eq!(SpecVersion::Swagger20.get_draft(), Draft::Draft4);
        assert_eq!(SpecVersion::V30x.get_draft(), Draft::Draft4);
        assert_eq!(SpecVersion::V31x.get_draft(), Draft::Draft202012);
    }

    #[test]
    fn test_unsupported_versions() {
        assert!(SpecVersion::detect(&json!({"swagger": "1.2"})).is_err());
        assert!(SpecVersion::detect(&json!({"openapi": 3})).is_err());
        assert!(matches!(
            SpecVersion::detect(&json!({"info": {}})),
            Err(VersionError::MissingVersion)
        ));
    }
}
