use crate::REF_FIELD;
use crate::error::ContractError;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const FILE_SCHEME: &str = "file://";
const IN_MEMORY_SOURCE: &str = "<in-memory>";

/// Where an API document is read from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A JSON or YAML file. A `file://` prefix is accepted.
    File(PathBuf),
    /// JSON or YAML text. External references resolve against the working directory.
    Text(String),
    /// An already parsed document.
    Value(Value),
}

impl DocumentSource {
    pub fn file(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        DocumentSource::File(PathBuf::from(path.strip_prefix(FILE_SCHEME).unwrap_or(path)))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            DocumentSource::File(path) => path.display().to_string(),
            DocumentSource::Text(_) | DocumentSource::Value(_) => IN_MEMORY_SOURCE.to_string(),
        }
    }
}

impl From<Value> for DocumentSource {
    fn from(value: Value) -> Self {
        DocumentSource::Value(value)
    }
}

/// Parses JSON, falling back to YAML.
pub(crate) fn parse_text(text: &str, source: &str) -> Result<Value, ContractError> {
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => Ok(parsed),
        Err(json_error) => {
            log::trace!("'{}' is not JSON ({}), trying YAML", source, json_error);
            let yaml: serde_yaml::Value = serde_yaml::from_str(text)
                .map_err(|yaml_error| ContractError::document_load(source, &yaml_error))?;
            // Integer keys such as response codes become strings here.
            serde_json::to_value(yaml).map_err(|error| ContractError::document_load(source, &error))
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Value, ContractError> {
    let source = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|error| ContractError::document_load(&source, &error))?;
    parse_text(&content, &source)
}

/// A document participating in dereferencing, either the root or a file
/// reached through an external reference.
#[derive(Clone)]
struct DocumentContext {
    key: String,
    base_dir: Option<PathBuf>,
    root: Rc<Value>,
}

/// Replaces every `$ref` of a document with a copy of its target.
///
/// Targets are memoized by their absolute reference so shared fragments are
/// only expanded once. A reference reached again while it is still being
/// expanded is a cycle and fails the load.
pub(crate) struct ReferenceResolver {
    documents: HashMap<PathBuf, Rc<Value>>,
    resolved: HashMap<String, Value>,
    in_progress: Vec<String>,
}

impl ReferenceResolver {
    pub(crate) fn new() -> Self {
        Self {
            documents: HashMap::new(),
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Dereferences `root`, resolving relative file references against `base_dir`.
    pub(crate) fn dereference_document(
        &mut self,
        root: Value,
        source: &str,
        base_dir: Option<PathBuf>,
    ) -> Result<Value, ContractError> {
        let context = DocumentContext {
            key: source.to_string(),
            base_dir,
            root: Rc::new(root),
        };
        let root = Rc::clone(&context.root);
        self.dereference(&root, &context)
    }

    fn dereference(
        &mut self,
        node: &Value,
        context: &DocumentContext,
    ) -> Result<Value, ContractError> {
        match node {
            Value::Object(object) => {
                if let Some(reference) = object.get(REF_FIELD).and_then(Value::as_str) {
                    return self.resolve_reference(reference, context);
                }
                let mut expanded = Map::with_capacity(object.len());
                for (key, value) in object {
                    expanded.insert(key.clone(), self.dereference(value, context)?);
                }
                Ok(Value::Object(expanded))
            }
            Value::Array(items) => {
                let mut expanded = Vec::with_capacity(items.len());
                for item in items {
                    expanded.push(self.dereference(item, context)?);
                }
                Ok(Value::Array(expanded))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_reference(
        &mut self,
        reference: &str,
        context: &DocumentContext,
    ) -> Result<Value, ContractError> {
        let (location, fragment) = match reference.split_once('#') {
            Some((location, fragment)) => (location, fragment),
            None => (reference, ""),
        };
        let target_context = if location.is_empty() {
            context.clone()
        } else {
            self.load_external(location, context)?
        };

        let key = format!("{}#{}", target_context.key, fragment);
        if let Some(resolved) = self.resolved.get(&key) {
            log::trace!("Reference '{}' served from memo", key);
            return Ok(resolved.clone());
        }
        if self.in_progress.contains(&key) {
            return Err(ContractError::document_load(
                &context.key,
                &format!("cyclic reference '{}'", reference),
            ));
        }

        let pointer = percent_decode_str(fragment).decode_utf8_lossy();
        let target = match target_context.root.pointer(&pointer) {
            Some(target) => target.clone(),
            None => {
                return Err(ContractError::document_load(
                    &context.key,
                    &format!("unresolvable reference '{}'", reference),
                ));
            }
        };

        log::trace!("Resolving reference '{}'", key);
        self.in_progress.push(key.clone());
        let expanded = self.dereference(&target, &target_context);
        self.in_progress.pop();
        let expanded = expanded?;
        self.resolved.insert(key, expanded.clone());
        Ok(expanded)
    }

    fn load_external(
        &mut self,
        location: &str,
        context: &DocumentContext,
    ) -> Result<DocumentContext, ContractError> {
        let location = location.strip_prefix(FILE_SCHEME).unwrap_or(location);
        let path = match &context.base_dir {
            Some(base_dir) if Path::new(location).is_relative() => base_dir.join(location),
            _ => PathBuf::from(location),
        };
        let root = match self.documents.get(&path) {
            Some(root) => Rc::clone(root),
            None => {
                let parsed = read_file(&path).map_err(|error| match error {
                    ContractError::DocumentLoad { reason, .. } => ContractError::document_load(
                        &context.key,
                        &format!("unresolvable reference to '{}': {}", location, reason),
                    ),
                    other => other,
                })?;
                let parsed = Rc::new(parsed);
                self.documents.insert(path.clone(), Rc::clone(&parsed));
                parsed
            }
        };
        Ok(DocumentContext {
            key: path.display().to_string(),
            base_dir: path.parent().map(Path::to_path_buf),
            root,
        })
    }
}
