mod loader;

pub use loader::DocumentSource;

use crate::document::loader::{ReferenceResolver, parse_text, read_file};
use crate::error::ContractError;
use crate::types::Direction;
use crate::types::version::SpecVersion;
use crate::{
    BASE_PATH_FIELD, CONSUMES_FIELD, PATH_SEPARATOR, PATHS_FIELD, PRODUCES_FIELD, SERVERS_FIELD,
    URL_FIELD,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A fully dereferenced API description.
///
/// The tree never changes after loading. Accessors hand out shared references,
/// and callers that need to rewrite a fragment clone it first.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    root: Value,
    version: SpecVersion,
    base_path: Option<String>,
    templates: Vec<String>,
    source: String,
}

impl ApiDocument {
    /// Loads and dereferences a document.
    ///
    /// # Arguments
    ///
    /// * `source` - a file, JSON/YAML text, or an already parsed value
    ///
    /// # Returns
    ///
    /// * `Ok(ApiDocument)` - with every `$ref` replaced by its target
    /// * `Err(ContractError::DocumentLoad)` - when the source cannot be read or
    ///   parsed, a reference cannot be resolved, references form a cycle, or
    ///   the document is neither Swagger 2.0 nor OpenAPI 3.x
    ///
    /// # Example
    ///
    /// ```rust
    /// use oas_contract::{ApiDocument, DocumentSource};
    /// use serde_json::json;
    ///
    /// let document = ApiDocument::load_from(DocumentSource::Value(json!({
    ///     "swagger": "2.0",
    ///     "basePath": "/api",
    ///     "paths": {"/pets": {}, "/pets/{id}": {}}
    /// })))
    /// .unwrap();
    /// assert_eq!(document.path_templates(), &["/pets", "/pets/{id}"]);
    /// assert_eq!(document.base_path(), Some("/api"));
    /// ```
    pub fn load_from(source: DocumentSource) -> Result<Self, ContractError> {
        let description = source.describe();
        let (raw, base_dir) = match source {
            DocumentSource::File(path) => {
                let raw = read_file(&path)?;
                (raw, path.parent().map(Path::to_path_buf))
            }
            DocumentSource::Text(text) => (parse_text(&text, &description)?, current_dir()),
            DocumentSource::Value(value) => (value, current_dir()),
        };

        let version = SpecVersion::detect(&raw)
            .map_err(|error| ContractError::document_load(&description, &error))?;
        let root = ReferenceResolver::new().dereference_document(raw, &description, base_dir)?;
        let base_path = Self::read_base_path(&root, version);
        let templates = match root.get(PATHS_FIELD).and_then(Value::as_object) {
            Some(paths) => paths.keys().cloned().collect(),
            None => Vec::new(),
        };
        log::debug!(
            "Loaded {:?} document '{}' with {} path templates",
            version,
            description,
            templates.len()
        );

        Ok(Self {
            root,
            version,
            base_path,
            templates,
            source: description,
        })
    }

    pub fn from_value(value: Value) -> Result<Self, ContractError> {
        Self::load_from(DocumentSource::Value(value))
    }

    pub fn from_file(path: impl AsRef<str>) -> Result<Self, ContractError> {
        Self::load_from(DocumentSource::file(path))
    }

    fn read_base_path(root: &Value, version: SpecVersion) -> Option<String> {
        let declared = if version.uses_content_map() {
            let url = root
                .get(SERVERS_FIELD)
                .and_then(Value::as_array)
                .and_then(|servers| servers.first())
                .and_then(|server| server.get(URL_FIELD))
                .and_then(Value::as_str)?;
            match url.split_once("://") {
                Some((_, rest)) => rest.find(PATH_SEPARATOR).map(|start| &rest[start..])?,
                None => url,
            }
        } else {
            root.get(BASE_PATH_FIELD).and_then(Value::as_str)?
        };
        normalize_base_path(declared)
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Path templates in declaration order.
    pub fn path_templates(&self) -> &[String] {
        &self.templates
    }

    pub fn path_item(&self, template: &str) -> Option<&Value> {
        self.root.get(PATHS_FIELD).and_then(|paths| paths.get(template))
    }

    /// Document wide `consumes` or `produces` list. Documents that describe
    /// bodies through `content` maps have no such list.
    pub fn default_media_types(&self, direction: Direction) -> Vec<String> {
        if self.version.uses_content_map() {
            return Vec::new();
        }
        let field = match direction {
            Direction::Request => CONSUMES_FIELD,
            Direction::Response => PRODUCES_FIELD,
        };
        string_list(self.root.get(field))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Strips a trailing separator; `/` and the empty string mean no prefix.
pub(crate) fn normalize_base_path(base_path: &str) -> Option<String> {
    let trimmed = base_path.trim_end_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with(PATH_SEPARATOR) {
        Some(trimmed.to_string())
    } else {
        Some(format!("{}{}", PATH_SEPARATOR, trimmed))
    }
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

fn current_dir() -> Option<PathBuf> {
    std::env::current_dir().ok()
}
