use crate::document::{ApiDocument, string_list};
use crate::error::{ContractElement, ContractError};
use crate::types::json_path::JsonPath;
use crate::types::{Direction, Operation, ParameterLocation, ParameterSpec, ResponseSpec};
use crate::{
    CONSUMES_FIELD, CONTENT_FIELD, DEFAULT_RESPONSE, FILE_TYPE, HEADERS_FIELD, PARAMETERS_FIELD,
    PATHS_FIELD, PRODUCES_FIELD, REQUEST_BODY_FIELD, RESPONSES_FIELD, SCHEMA_FIELD, TYPE_FIELD,
};
use serde_json::{Map, Value};

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];
const JSON_MEDIA_TYPE: &str = "application/json";

/// The body contract of a request or response.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaContract {
    /// The body must validate against this schema.
    Schema(Value),
    /// Nothing is declared; any body is accepted.
    NoContract,
}

impl SchemaContract {
    pub fn schema(&self) -> Option<&Value> {
        match self {
            SchemaContract::Schema(schema) => Some(schema),
            SchemaContract::NoContract => None,
        }
    }

    fn from_declared(schema: Option<&Value>) -> Self {
        match schema {
            // File uploads and downloads carry no JSON shape.
            Some(schema) if schema.get(TYPE_FIELD).and_then(Value::as_str) == Some(FILE_TYPE) => {
                SchemaContract::NoContract
            }
            Some(schema) => SchemaContract::Schema(schema.clone()),
            None => SchemaContract::NoContract,
        }
    }
}

/// Reduces `application/json; charset=utf-8` to `application/json`.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Whether the declared media range `type/*` or `*/*` covers an observed
/// media type. Both sides are expected as essences.
pub(crate) fn media_range_covers(declared: &str, observed: &str) -> bool {
    if declared == "*/*" {
        return true;
    }
    match (declared.strip_suffix("/*"), observed.split_once('/')) {
        (Some(range), Some((kind, _))) => range == kind,
        _ => false,
    }
}

/// Looks up operations, responses, parameters, schemas and media types of a
/// document, applying the fallback rules of the description format.
#[derive(Clone, Copy)]
pub struct OperationResolver<'d> {
    document: &'d ApiDocument,
}

impl<'d> OperationResolver<'d> {
    pub fn new(document: &'d ApiDocument) -> Self {
        Self { document }
    }

    /// Finds the operation declared for `method` under `template`.
    ///
    /// # Arguments
    ///
    /// * `template` - a path template of the document
    /// * `method` - the HTTP method, compared case-insensitively
    ///
    /// # Returns
    ///
    /// * `Ok(Operation)` - the declared operation
    /// * `Err(ContractError::ContractNotFound)` - when the template or method is not declared
    pub fn resolve_operation(
        &self,
        template: &str,
        method: &str,
    ) -> Result<Operation<'d>, ContractError> {
        let path_item = self
            .document
            .path_item(template)
            .ok_or_else(|| ContractError::contract_not_found(template))?;
        let declared = path_item.as_object().and_then(|operations| {
            operations.iter().find(|(key, _)| {
                key.eq_ignore_ascii_case(method)
                    && HTTP_METHODS.contains(&key.to_ascii_lowercase().as_str())
            })
        });
        match declared {
            Some((key, data)) => {
                log::debug!("Resolved operation {} {}", key.to_uppercase(), template);
                let mut path = JsonPath::new();
                path.add(PATHS_FIELD).add(template).add(key);
                Ok(Operation {
                    template: template.to_string(),
                    method: key.to_string(),
                    path_item,
                    data,
                    path,
                })
            }
            None => Err(ContractError::operation_not_found(template, method)),
        }
    }

    /// Selects the response declared for `status`, falling back to a status
    /// range such as `4XX` and then to `default`.
    pub fn get_response(
        &self,
        operation: &Operation<'d>,
        status: u16,
    ) -> Result<ResponseSpec<'d>, ContractError> {
        let status_key = status.to_string();
        let range_key = format!("{}XX", status / 100);
        let responses = operation.data.get(RESPONSES_FIELD);
        for key in [status_key.as_str(), range_key.as_str(), DEFAULT_RESPONSE] {
            if let Some(data) = responses.and_then(|responses| responses.get(key)) {
                if key == DEFAULT_RESPONSE {
                    log::debug!(
                        "Status {} is not declared for {} {}, using the default response",
                        status,
                        operation.method.to_uppercase(),
                        operation.template
                    );
                }
                return Ok(ResponseSpec {
                    status: key.to_string(),
                    data,
                    path: operation.path.with(RESPONSES_FIELD).with(key),
                });
            }
        }
        Err(ContractError::response_not_found(
            &operation.template,
            &operation.method,
            &status_key,
        ))
    }

    /// The body schema of the response selected for `status`.
    ///
    /// With a `content` map the entry for `media_type` is used. Without an
    /// observed media type, a single entry or `application/json` is used,
    /// otherwise the first declared one.
    pub fn get_response_schema(
        &self,
        operation: &Operation<'d>,
        status: u16,
        media_type: Option<&str>,
    ) -> Result<SchemaContract, ContractError> {
        let response = self.get_response(operation, status)?;
        if !self.document.version().uses_content_map() {
            return Ok(SchemaContract::from_declared(response.data.get(SCHEMA_FIELD)));
        }
        match response.data.get(CONTENT_FIELD).and_then(Value::as_object) {
            Some(content) => {
                let entry = select_content(content, media_type, ContractElement::ResponseMediaType)?;
                Ok(SchemaContract::from_declared(
                    entry.and_then(|entry| entry.get(SCHEMA_FIELD)),
                ))
            }
            None => Ok(SchemaContract::NoContract),
        }
    }

    /// The request body schema of an operation.
    ///
    /// For body parameters: none gives no contract, one gives its schema and
    /// more than one is a malformed contract.
    pub fn get_request_schema(
        &self,
        operation: &Operation<'d>,
        media_type: Option<&str>,
    ) -> Result<SchemaContract, ContractError> {
        if self.document.version().uses_content_map() {
            let content = operation
                .data
                .get(REQUEST_BODY_FIELD)
                .and_then(|body| body.get(CONTENT_FIELD))
                .and_then(Value::as_object);
            return match content {
                Some(content) => {
                    let entry =
                        select_content(content, media_type, ContractElement::RequestMediaType)?;
                    Ok(SchemaContract::from_declared(
                        entry.and_then(|entry| entry.get(SCHEMA_FIELD)),
                    ))
                }
                None => Ok(SchemaContract::NoContract),
            };
        }

        let parameters = self.merged_parameters(operation)?;
        let mut bodies = parameters
            .iter()
            .filter(|parameter| parameter.location == ParameterLocation::Body);
        match (bodies.next(), bodies.next()) {
            (None, _) => Ok(SchemaContract::NoContract),
            (Some(body), None) => {
                let schema = body.schema()?;
                Ok(SchemaContract::from_declared(Some(&schema)))
            }
            (Some(_), Some(_)) => Err(ContractError::malformed(
                &operation.path.with(PARAMETERS_FIELD).format_path(),
                "only one body parameter is permitted per operation",
            )),
        }
    }

    /// Media types allowed for one side of an operation.
    ///
    /// Swagger 2.0 uses the operation's `consumes`/`produces` when declared and
    /// the document wide list otherwise. OpenAPI 3 uses the keys of the
    /// relevant `content` map and has no inherited fallback. Without a
    /// `status`, response media types are collected over every response.
    pub fn get_media_types(
        &self,
        operation: &Operation<'d>,
        direction: Direction,
        status: Option<u16>,
    ) -> Result<Vec<String>, ContractError> {
        if !self.document.version().uses_content_map() {
            let field = match direction {
                Direction::Request => CONSUMES_FIELD,
                Direction::Response => PRODUCES_FIELD,
            };
            return Ok(match operation.data.get(field) {
                Some(declared) => string_list(Some(declared)),
                None => self.document.default_media_types(direction),
            });
        }

        let content_keys = |holder: Option<&Value>| -> Vec<String> {
            holder
                .and_then(|holder| holder.get(CONTENT_FIELD))
                .and_then(Value::as_object)
                .map(|content| content.keys().cloned().collect())
                .unwrap_or_default()
        };
        match (direction, status) {
            (Direction::Request, _) => Ok(content_keys(operation.data.get(REQUEST_BODY_FIELD))),
            (Direction::Response, Some(status)) => {
                let response = self.get_response(operation, status)?;
                Ok(content_keys(Some(response.data)))
            }
            (Direction::Response, None) => {
                let mut media_types: Vec<String> = Vec::new();
                if let Some(responses) = operation.data.get(RESPONSES_FIELD).and_then(Value::as_object)
                {
                    for response in responses.values() {
                        for media_type in content_keys(Some(response)) {
                            if !media_types.contains(&media_type) {
                                media_types.push(media_type);
                            }
                        }
                    }
                }
                Ok(media_types)
            }
        }
    }

    /// Path item parameters merged with the operation's own.
    ///
    /// Entries are unique by name and location. An operation parameter replaces
    /// the shared parameter with the same key in place, so the order of first
    /// declaration is kept.
    pub fn get_parameters(
        &self,
        template: &str,
        method: &str,
    ) -> Result<Vec<ParameterSpec>, ContractError> {
        let operation = self.resolve_operation(template, method)?;
        self.merged_parameters(&operation)
    }

    pub(crate) fn merged_parameters(
        &self,
        operation: &Operation<'d>,
    ) -> Result<Vec<ParameterSpec>, ContractError> {
        let mut merged: Vec<ParameterSpec> = Vec::new();
        let mut shared_path = operation.path.clone();
        shared_path.0.pop();
        let sources = [
            (operation.path_item, shared_path),
            (operation.data, operation.path.clone()),
        ];
        for (holder, holder_path) in sources {
            let Some(declared) = holder.get(PARAMETERS_FIELD).and_then(Value::as_array) else {
                continue;
            };
            let parameters_path = holder_path.with(PARAMETERS_FIELD);
            for (index, declaration) in declared.iter().enumerate() {
                let parameter = ParameterSpec::from_declaration(
                    declaration,
                    &parameters_path.with(index.to_string()),
                )?;
                match merged
                    .iter_mut()
                    .find(|existing| existing.key() == parameter.key())
                {
                    Some(existing) => *existing = parameter,
                    None => merged.push(parameter),
                }
            }
        }
        Ok(merged)
    }

    /// Headers declared on the response selected for `status`.
    pub fn get_response_headers(
        &self,
        operation: &Operation<'d>,
        status: u16,
    ) -> Result<Vec<ParameterSpec>, ContractError> {
        let response = self.get_response(operation, status)?;
        Ok(response
            .data
            .get(HEADERS_FIELD)
            .and_then(Value::as_object)
            .map(|headers| {
                headers
                    .iter()
                    .map(|(name, declaration)| ParameterSpec::response_header(name, declaration))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Picks the `content` entry describing a body.
fn select_content<'v>(
    content: &'v Map<String, Value>,
    media_type: Option<&str>,
    element: ContractElement,
) -> Result<Option<&'v Value>, ContractError> {
    if content.is_empty() {
        return Ok(None);
    }
    let Some(observed) = media_type else {
        if content.len() == 1 {
            return Ok(content.values().next());
        }
        return Ok(content
            .get(JSON_MEDIA_TYPE)
            .or_else(|| content.values().next()));
    };

    let observed = essence(observed);
    let exact = content
        .iter()
        .find(|(declared, _)| essence(declared) == observed);
    let fallback = || {
        content
            .iter()
            .find(|(declared, _)| media_range_covers(&essence(declared), &observed))
    };
    match exact.or_else(fallback) {
        Some((_, entry)) => Ok(Some(entry)),
        None => Err(ContractError::media_type_not_allowed(
            element,
            &observed,
            content.keys().cloned().collect(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn fixture(name: &str) -> ApiDocument {
        ApiDocument::from_file(format!(
            "{}/tests/fixtures/{}",
            env!("CARGO_MANIFEST_DIR"),
            name
        ))
        .unwrap()
    }

    fn swagger() -> ApiDocument {
        fixture("petstore-swagger.json")
    }

    fn openapi() -> ApiDocument {
        fixture("petstore-openapi3.json")
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "GeT").unwrap();
        assert_eq!(operation.method, "get");
        assert_eq!(operation.template, "/pets");
    }

    #[test]
    fn test_undeclared_method_is_contract_not_found() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let error = resolver.resolve_operation("/pets", "PUT").unwrap_err();
        assert!(matches!(
            error,
            ContractError::ContractNotFound { method: Some(_), .. }
        ));
    }

    #[test]
    fn test_parameters_key_is_not_an_operation() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        assert!(resolver.resolve_operation("/pets/{id}", "parameters").is_err());
    }

    #[test]
    fn test_response_falls_back_to_default() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "get").unwrap();
        assert_eq!(resolver.get_response(&operation, 200).unwrap().status, "200");
        assert_eq!(resolver.get_response(&operation, 999).unwrap().status, "default");
    }

    #[test]
    fn test_status_range_precedes_default() {
        let document = openapi();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/{petId}", "get").unwrap();
        assert_eq!(resolver.get_response(&operation, 404).unwrap().status, "4XX");
        assert_eq!(resolver.get_response(&operation, 503).unwrap().status, "default");
    }

    #[test]
    fn test_missing_response_without_default() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/{id}/photos", "get").unwrap();
        let error = resolver.get_response(&operation, 999).unwrap_err();
        assert!(matches!(error, ContractError::ResponseNotFound { .. }));
    }

    #[test]
    fn test_response_schema_and_no_contract() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let get = resolver.resolve_operation("/pets", "get").unwrap();
        let schema = resolver.get_response_schema(&get, 200, None).unwrap();
        assert_eq!(schema.schema().unwrap()["type"], json!("array"));

        let delete = resolver.resolve_operation("/pets/{id}", "delete").unwrap();
        assert_eq!(
            resolver.get_response_schema(&delete, 204, None).unwrap(),
            SchemaContract::NoContract
        );
    }

    #[test]
    fn test_file_response_is_no_contract() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/{id}/photos", "get").unwrap();
        assert_eq!(
            resolver.get_response_schema(&operation, 200, None).unwrap(),
            SchemaContract::NoContract
        );
    }

    #[test]
    fn test_request_schema_from_single_body_parameter() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "post").unwrap();
        let schema = resolver.get_request_schema(&operation, None).unwrap();
        assert_eq!(schema.schema().unwrap()["required"], json!(["name"]));
    }

    #[test]
    fn test_request_without_body_parameter_is_no_contract() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "get").unwrap();
        assert_eq!(
            resolver.get_request_schema(&operation, None).unwrap(),
            SchemaContract::NoContract
        );
    }

    #[test]
    fn test_multiple_body_parameters_are_malformed() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/bulk", "post").unwrap();
        let error = resolver.get_request_schema(&operation, None).unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
        assert!(
            error
                .to_string()
                .contains("only one body parameter is permitted per operation")
        );
    }

    #[test]
    fn test_body_parameter_without_schema_is_malformed() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/bulk", "put").unwrap();
        let error = resolver.get_request_schema(&operation, None).unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
    }

    #[test]
    fn test_media_types_prefer_operation_list() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let get = resolver.resolve_operation("/pets/{id}", "get").unwrap();
        assert_eq!(
            resolver.get_media_types(&get, Direction::Response, Some(200)).unwrap(),
            vec!["application/json", "text/html"]
        );
        let patch = resolver.resolve_operation("/pets/{id}", "patch").unwrap();
        assert_eq!(
            resolver.get_media_types(&patch, Direction::Request, None).unwrap(),
            vec!["application/merge-patch+json"]
        );
    }

    #[test]
    fn test_media_types_fall_back_to_document_defaults() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "get").unwrap();
        assert_eq!(
            resolver.get_media_types(&operation, Direction::Response, Some(200)).unwrap(),
            vec!["application/json"]
        );
    }

    #[test]
    fn test_content_map_media_types_do_not_inherit() {
        let document = openapi();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/{petId}", "delete").unwrap();
        assert!(
            resolver
                .get_media_types(&operation, Direction::Response, Some(204))
                .unwrap()
                .is_empty()
        );
        let list = resolver.resolve_operation("/pets", "get").unwrap();
        assert_eq!(
            resolver.get_media_types(&list, Direction::Response, Some(200)).unwrap(),
            vec!["application/json"]
        );
        assert_eq!(
            resolver.get_media_types(&list, Direction::Response, None).unwrap(),
            vec!["application/json", "application/problem+json"]
        );
    }

    #[test]
    fn test_operation_parameter_overrides_shared_one() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let parameters = resolver.get_parameters("/pets/{id}", "delete").unwrap();
        let ids: Vec<&ParameterSpec> = parameters
            .iter()
            .filter(|parameter| parameter.key() == ("id", ParameterLocation::Path))
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].declaration["type"], json!("string"));
        assert_eq!(parameters[0].name, "id");

        let shared = resolver.get_parameters("/pets/{id}", "get").unwrap();
        assert_eq!(shared[0].declaration["type"], json!("integer"));
    }

    #[test]
    fn test_same_name_different_location_are_distinct() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let parameters = resolver.get_parameters("/pets", "get").unwrap();
        let locations: Vec<ParameterLocation> = parameters
            .iter()
            .filter(|parameter| parameter.name == "limit")
            .map(|parameter| parameter.location)
            .collect();
        assert_eq!(
            locations,
            vec![ParameterLocation::Header, ParameterLocation::Query]
        );
        assert!(parameters.iter().any(|parameter| parameter.name == "X-Required-Header"));
    }

    #[test]
    fn test_parameter_without_location_is_malformed() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let error = resolver.get_parameters("/pets/broken", "get").unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
    }

    #[test]
    fn test_response_headers() {
        let document = swagger();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets/{id}", "get").unwrap();
        let headers = resolver.get_response_headers(&operation, 200).unwrap();
        let names: Vec<&str> = headers.iter().map(|header| header.name.as_str()).collect();
        assert_eq!(names, vec!["ETag", "X-Rate-Limit"]);
        assert!(headers.iter().all(|header| header.required));
    }

    #[test]
    fn test_openapi_request_schema_by_media_type() {
        let document = openapi();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "post").unwrap();
        let json = resolver
            .get_request_schema(&operation, Some("application/json; charset=utf-8"))
            .unwrap();
        assert_eq!(json.schema().unwrap()["required"], json!(["name"]));

        let error = resolver
            .get_request_schema(&operation, Some("text/plain"))
            .unwrap_err();
        assert!(matches!(error, ContractError::MediaTypeNotAllowed { .. }));
    }

    #[test]
    fn test_openapi_response_schema_prefers_json_without_media_type() {
        let document = openapi();
        let resolver = OperationResolver::new(&document);
        let operation = resolver.resolve_operation("/pets", "get").unwrap();
        let schema = resolver.get_response_schema(&operation, 500, None).unwrap();
        assert_eq!(schema.schema().unwrap()["required"], json!(["code", "message"]));
    }

    #[test]
    fn test_media_range_covers() {
        assert!(media_range_covers("image/*", "image/png"));
        assert!(media_range_covers("*/*", "text/plain"));
        assert!(!media_range_covers("image/*", "text/plain"));
        assert!(!media_range_covers("image/png", "image/png"));
        assert!(!media_range_covers("image/*", "image"));
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("Application/JSON ; charset=utf-8"), "application/json");
        assert_eq!(essence("text/html"), "text/html");
    }
}
