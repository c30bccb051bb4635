use crate::document::{ApiDocument, DocumentSource};
use crate::error::ContractError;
use dashmap::{DashMap, Entry};
use std::fmt::{Display, Formatter};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

static GLOBAL_REGISTRY: OnceLock<DocumentRegistry<String>> = OnceLock::new();

/// A process wide registry keyed by document id.
pub fn global_document_registry() -> &'static DocumentRegistry<String> {
    GLOBAL_REGISTRY.get_or_init(DocumentRegistry::new)
}

#[derive(Debug)]
pub enum CacheError {
    /// No document is registered under the id.
    DocumentNotFound,
    /// A document is already registered under the id.
    DocumentAlreadyExists,
    /// The document could not be loaded.
    FailedToLoadDocument(ContractError),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::DocumentNotFound => write!(f, "Document not found in registry"),
            CacheError::DocumentAlreadyExists => write!(f, "Document already exists in registry"),
            CacheError::FailedToLoadDocument(err) => {
                write!(f, "Failed to load document: {}", err)
            }
        }
    }
}

impl std::error::Error for CacheError {}

/// Loaded documents shared between checkers and threads.
///
/// A document is parsed and dereferenced once and handed out as an `Arc`.
/// Documents are never modified after loading.
pub struct DocumentRegistry<K> {
    documents: DashMap<K, Arc<ApiDocument>>,
}

impl<K> Default for DocumentRegistry<K>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DocumentRegistry<K>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        DocumentRegistry {
            documents: DashMap::new(),
        }
    }

    /// Loads `source` and registers it under `id`, failing if `id` is taken.
    pub fn insert(&self, id: K, source: DocumentSource) -> Result<Arc<ApiDocument>, CacheError> {
        match self.documents.entry(id) {
            Entry::Occupied(_) => Err(CacheError::DocumentAlreadyExists),
            Entry::Vacant(entry) => {
                let document = Self::load(source)?;
                entry.insert(document.clone());
                Ok(document)
            }
        }
    }

    /// Returns the document registered under `id`, loading `source` only
    /// when there is none yet.
    ///
    /// # Example
    ///
    /// ```rust
    /// use oas_contract::cache::DocumentRegistry;
    /// use oas_contract::DocumentSource;
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// let registry = DocumentRegistry::new();
    /// let first = registry
    ///     .get_or_load("pets", DocumentSource::from(json!({"swagger": "2.0", "paths": {}})))
    ///     .unwrap();
    /// let second = registry
    ///     .get_or_load("pets", DocumentSource::from(json!({"openapi": "3.0.0"})))
    ///     .unwrap();
    /// assert!(Arc::ptr_eq(&first, &second));
    /// ```
    pub fn get_or_load(&self, id: K, source: DocumentSource) -> Result<Arc<ApiDocument>, CacheError> {
        match self.documents.entry(id) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let document = Self::load(source)?;
                entry.insert(document.clone());
                Ok(document)
            }
        }
    }

    fn load(source: DocumentSource) -> Result<Arc<ApiDocument>, CacheError> {
        match ApiDocument::load_from(source) {
            Ok(document) => Ok(Arc::new(document)),
            Err(e) => Err(CacheError::FailedToLoadDocument(e)),
        }
    }

    pub fn get(&self, id: &K) -> Result<Arc<ApiDocument>, CacheError> {
        match self.documents.get(id) {
            Some(document) => Ok(Arc::clone(document.value())),
            None => Err(CacheError::DocumentNotFound),
        }
    }

    pub fn remove(&self, id: &K) -> Result<(), CacheError> {
        if self.documents.remove(id).is_none() {
            return Err(CacheError::DocumentNotFound);
        }
        Ok(())
    }

    pub fn contains(&self, id: &K) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&self) {
        self.documents.clear();
        log::debug!("Cleared document registry");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ContractCheckerBuilder;
    use serde_json::json;
    use std::thread;

    fn source() -> DocumentSource {
        DocumentSource::from(json!({
            "swagger": "2.0",
            "paths": {"/pets": {"get": {"responses": {"200": {"description": "ok"}}}}}
        }))
    }

    #[test]
    fn test_registry_get_insert() {
        let registry = DocumentRegistry::new();
        assert!(registry.get(&"test").is_err());
        let document = registry.insert("test", source()).unwrap();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        let cached = registry.get(&"test").unwrap();
        assert!(Arc::ptr_eq(&document, &cached));
        assert!(matches!(
            registry.insert("test", source()),
            Err(CacheError::DocumentAlreadyExists)
        ));
    }

    #[test]
    fn test_failed_load_is_not_registered() {
        let registry = DocumentRegistry::new();
        let result = registry.get_or_load("bad", DocumentSource::from(json!({"paths": {}})));
        assert!(matches!(result, Err(CacheError::FailedToLoadDocument(_))));
        assert!(!registry.contains(&"bad"));
    }

    #[test]
    fn test_registry_remove_and_clear() {
        let registry = DocumentRegistry::new();
        registry.insert("a", source()).unwrap();
        registry.insert("b", source()).unwrap();
        assert!(registry.remove(&"a").is_ok());
        assert!(registry.remove(&"a").is_err());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let registry = global_document_registry();
        let document = registry
            .get_or_load("threaded".to_string(), source())
            .unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let document = document.clone();
                thread::spawn(move || {
                    let checker = ContractCheckerBuilder::new()
                        .document(document)
                        .build()
                        .unwrap();
                    checker
                        .check_response_body(&json!(null), "/pets", "GET", 200, None)
                        .is_ok()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(global_document_registry().contains(&"threaded".to_string()));
        registry.remove(&"threaded".to_string()).unwrap();
    }
}
