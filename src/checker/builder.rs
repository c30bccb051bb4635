use crate::checker::ContractChecker;
use crate::document::{ApiDocument, DocumentSource, normalize_base_path};
use crate::error::ContractError;
use crate::matcher::PathTemplateMatcher;
use crate::validation::{JsonSchemaValidator, SchemaValidator};
use serde_json::Value;
use std::sync::Arc;

enum DocumentLoader {
    None,
    Source(DocumentSource),
    Document(Arc<ApiDocument>),
}

/// Configures and builds a [`ContractChecker`].
///
/// # Example
///
/// ```rust
/// use oas_contract::ContractCheckerBuilder;
///
/// let checker = ContractCheckerBuilder::new()
///     .load_from_text("openapi: 3.1.0\npaths:\n  /health:\n    get:\n      responses:\n        '200':\n          description: ok\n")
///     .base_path("/internal")
///     .build()
///     .unwrap();
/// assert_eq!(checker.matcher().base_path(), Some("/internal"));
/// ```
pub struct ContractCheckerBuilder {
    document_loader: DocumentLoader,
    base_path: Option<Option<String>>,
    validate_formats: bool,
    nullable_extension: bool,
    schema_validator: Option<Box<dyn SchemaValidator>>,
}

impl Default for ContractCheckerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractCheckerBuilder {
    pub fn new() -> Self {
        Self {
            document_loader: DocumentLoader::None,
            base_path: None,
            validate_formats: true,
            nullable_extension: true,
            schema_validator: None,
        }
    }

    /// Reads the document from a JSON or YAML file when building.
    pub fn load_from_file(mut self, path: impl AsRef<str>) -> Self {
        self.document_loader = DocumentLoader::Source(DocumentSource::file(path));
        self
    }

    pub fn load_from_value(mut self, value: Value) -> Self {
        self.document_loader = DocumentLoader::Source(DocumentSource::Value(value));
        self
    }

    pub fn load_from_text(mut self, text: impl Into<String>) -> Self {
        self.document_loader = DocumentLoader::Source(DocumentSource::Text(text.into()));
        self
    }

    /// Uses an already loaded document, for instance one held by a
    /// [`crate::cache::DocumentRegistry`].
    pub fn document(mut self, document: Arc<ApiDocument>) -> Self {
        self.document_loader = DocumentLoader::Document(document);
        self
    }

    /// Replaces the base path declared by the document. An empty path or `/`
    /// removes it, so request paths are matched as they are.
    pub fn base_path(mut self, base_path: impl AsRef<str>) -> Self {
        self.base_path = Some(normalize_base_path(base_path.as_ref()));
        self
    }

    /// Whether `format` keywords are asserted. Enabled by default.
    pub fn validate_formats(mut self, validate_formats: bool) -> Self {
        self.validate_formats = validate_formats;
        self
    }

    /// Whether `x-nullable` and `nullable` markers admit `null`. Enabled by default.
    pub fn nullable_extension(mut self, nullable_extension: bool) -> Self {
        self.nullable_extension = nullable_extension;
        self
    }

    /// Replaces the default `jsonschema` backed validator.
    pub fn schema_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.schema_validator = Some(Box::new(validator));
        self
    }

    pub fn build(self) -> Result<ContractChecker, ContractError> {
        let document = match self.document_loader {
            DocumentLoader::None => {
                return Err(ContractError::document_load(
                    "builder",
                    "no document source was provided",
                ));
            }
            DocumentLoader::Source(source) => Arc::new(ApiDocument::load_from(source)?),
            DocumentLoader::Document(document) => document,
        };

        let base_path = match &self.base_path {
            Some(base_path) => base_path.as_deref(),
            None => document.base_path(),
        };
        let matcher = PathTemplateMatcher::new(document.path_templates(), base_path);
        let validator = match self.schema_validator {
            Some(validator) => validator,
            None => Box::new(
                JsonSchemaValidator::new(document.version().get_draft())
                    .validate_formats(self.validate_formats),
            ),
        };
        log::debug!(
            "Built contract checker for '{}' with base path {:?}",
            document.source(),
            matcher.base_path()
        );
        Ok(ContractChecker::new(
            document,
            matcher,
            validator,
            self.nullable_extension,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checker::test_support::fixture_path;
    use crate::validation::ValidationOutcome;
    use serde_json::json;

    struct AcceptAll;

    impl SchemaValidator for AcceptAll {
        fn validate(&self, _: &Value, _: &Value) -> Result<ValidationOutcome, ContractError> {
            Ok(ValidationOutcome::valid())
        }
    }

    #[test]
    fn test_build_without_source() {
        let error = ContractCheckerBuilder::new().build().err().unwrap();
        assert!(matches!(error, ContractError::DocumentLoad { .. }));
    }

    #[test]
    fn test_build_from_yaml_file() {
        let checker = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("minimal.yaml"))
            .build()
            .unwrap();
        assert!(
            checker
                .check_response_body(&json!({"status": "up"}), "/health", "GET", 200, None)
                .is_ok()
        );
    }

    #[test]
    fn test_missing_file_is_document_load() {
        let error = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("does-not-exist.json"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(error, ContractError::DocumentLoad { .. }));
    }

    #[test]
    fn test_base_path_override() {
        let checker = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("petstore-swagger.json"))
            .base_path("/v2/")
            .build()
            .unwrap();
        assert_eq!(checker.matcher().base_path(), Some("/v2"));
        assert!(checker.matcher().match_path("/v2/pets").is_ok());
        assert!(checker.matcher().match_path("/api/pets").is_err());
    }

    #[test]
    fn test_root_base_path_clears_declared_one() {
        let checker = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("petstore-swagger.json"))
            .base_path("/")
            .build()
            .unwrap();
        assert_eq!(checker.matcher().base_path(), None);
        let found = checker.matcher().match_path("/pets/7").unwrap();
        assert_eq!(found.params["id"], "7");
        assert!(checker.matcher().match_path("/api/pets").is_err());
    }

    #[test]
    fn test_shared_document() {
        let document =
            Arc::new(ApiDocument::from_file(fixture_path("petstore-swagger.json")).unwrap());
        let first = ContractCheckerBuilder::new()
            .document(document.clone())
            .build()
            .unwrap();
        let second = ContractCheckerBuilder::new()
            .document(document.clone())
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(first.document(), second.document()));
    }

    #[test]
    fn test_custom_schema_validator() {
        let checker = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("petstore-swagger.json"))
            .schema_validator(AcceptAll)
            .build()
            .unwrap();
        assert!(
            checker
                .check_response_body(&json!("anything"), "/api/pets", "GET", 200, None)
                .is_ok()
        );
    }
}
