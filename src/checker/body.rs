use crate::checker::ContractChecker;
use crate::error::{ContractElement, ContractError};
use crate::resolver::SchemaContract;
use crate::validation::ValidationOutcome;
use serde_json::Value;

impl ContractChecker {
    fn evaluate_schema(&self, value: &Value, contract: SchemaContract) -> Result<ValidationOutcome, ContractError> {
        match contract {
            SchemaContract::NoContract => Ok(ValidationOutcome::valid()),
            SchemaContract::Schema(schema) => {
                let schema = self.prepare_schema(schema);
                self.validator.validate(value, &schema)
            }
        }
    }

    /// Validates a response body against the schema declared for `status`.
    ///
    /// # Arguments
    ///
    /// * `value` - the decoded body
    /// * `path` - the request path, base path included
    /// * `method` - the request method
    /// * `status` - the response status, falling back to `default` when undeclared
    /// * `media_type` - the response content type, used to pick a `content` entry
    ///
    /// # Returns
    ///
    /// The validation outcome. A response without a declared schema is always valid.
    pub fn evaluate_response_body(
        &self,
        value: &Value,
        path: &str,
        method: &str,
        status: u16,
        media_type: Option<&str>,
    ) -> Result<ValidationOutcome, ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let contract = self
            .resolver()
            .get_response_schema(&operation, status, media_type)?;
        self.evaluate_schema(value, contract)
    }

    /// Like [`ContractChecker::evaluate_response_body`], failing with a
    /// `ValidationFailure` that lists every field error.
    ///
    /// ```rust
    /// use oas_contract::ContractCheckerBuilder;
    /// use serde_json::json;
    ///
    /// let checker = ContractCheckerBuilder::new()
    ///     .load_from_value(json!({
    ///         "swagger": "2.0",
    ///         "paths": {"/pets": {"get": {"responses": {"200": {
    ///             "description": "pets",
    ///             "schema": {
    ///                 "type": "array",
    ///                 "items": {"type": "object", "required": ["id", "name"]}
    ///             }
    ///         }}}}}
    ///     }))
    ///     .build()
    ///     .unwrap();
    ///
    /// let error = checker
    ///     .check_response_body(&json!([{"id": 123456789}]), "/pets", "get", 200, None)
    ///     .unwrap_err();
    /// assert_eq!(error.field_errors().len(), 1);
    /// assert_eq!(error.field_errors()[0].path, "[0].name");
    /// assert_eq!(error.field_errors()[0].message, "required property missing");
    /// ```
    pub fn check_response_body(
        &self,
        value: &Value,
        path: &str,
        method: &str,
        status: u16,
        media_type: Option<&str>,
    ) -> Result<(), ContractError> {
        self.evaluate_response_body(value, path, method, status, media_type)?
            .into_result(ContractElement::ResponseBody, value)
    }

    /// Validates a request body against the schema of the operation's body
    /// parameter or `requestBody` entry.
    pub fn evaluate_request_body(
        &self,
        value: &Value,
        path: &str,
        method: &str,
        media_type: Option<&str>,
    ) -> Result<ValidationOutcome, ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let contract = self.resolver().get_request_schema(&operation, media_type)?;
        self.evaluate_schema(value, contract)
    }

    pub fn check_request_body(
        &self,
        value: &Value,
        path: &str,
        method: &str,
        media_type: Option<&str>,
    ) -> Result<(), ContractError> {
        self.evaluate_request_body(value, path, method, media_type)?
            .into_result(ContractElement::RequestBody, value)
    }
}

#[cfg(test)]
mod test {
    use crate::ContractCheckerBuilder;
    use crate::checker::test_support::{fixture_path, openapi_checker, swagger_checker};
    use crate::error::{ContractElement, ContractError};
    use serde_json::json;

    #[test]
    fn test_response_body_field_errors() {
        let checker = swagger_checker();
        let error = checker
            .check_response_body(&json!([{"id": 123456789}]), "/api/pets", "GET", 200, None)
            .unwrap_err();
        assert_eq!(error.element(), Some(ContractElement::ResponseBody));
        assert_eq!(error.field_errors().len(), 1);
        assert_eq!(error.field_errors()[0].path, "[0].name");
        assert_eq!(error.field_errors()[0].message, "required property missing");
        assert!(error.to_string().starts_with("[{\"id\":123456789}] is not a valid response body"));
    }

    #[test]
    fn test_default_response_is_used_for_undeclared_status() {
        let checker = swagger_checker();
        let body = json!({"code": 500, "message": "boom"});
        assert!(
            checker
                .check_response_body(&body, "/api/pets", "GET", 503, None)
                .is_ok()
        );
        assert!(
            checker
                .check_response_body(&json!({}), "/api/pets", "GET", 503, None)
                .is_err()
        );
    }

    #[test]
    fn test_undeclared_status_without_default() {
        let checker = swagger_checker();
        let error = checker
            .check_response_body(&json!(null), "/api/pets/1/photos", "GET", 404, None)
            .unwrap_err();
        assert!(matches!(error, ContractError::ResponseNotFound { .. }));
    }

    #[test]
    fn test_no_contract_accepts_anything() {
        let checker = swagger_checker();
        assert!(
            checker
                .check_response_body(&json!({"any": "thing"}), "/api/pets/1", "DELETE", 204, None)
                .is_ok()
        );
        assert!(
            checker
                .check_request_body(&json!(null), "/api/pets", "GET", None)
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_path_or_method() {
        let checker = swagger_checker();
        let unknown_path = checker
            .check_response_body(&json!([]), "/api/unknown", "GET", 200, None)
            .unwrap_err();
        assert!(matches!(
            unknown_path,
            ContractError::ContractNotFound { method: None, .. }
        ));
        let unknown_method = checker
            .check_response_body(&json!([]), "/api/pets", "PUT", 200, None)
            .unwrap_err();
        assert!(matches!(
            unknown_method,
            ContractError::ContractNotFound { method: Some(_), .. }
        ));
    }

    #[test]
    fn test_nullable_properties_accept_null() {
        let checker = swagger_checker();
        let body = json!([{"id": 1, "name": "rex", "tag": null}]);
        assert!(
            checker
                .check_response_body(&body, "/api/pets", "GET", 200, None)
                .is_ok()
        );
    }

    #[test]
    fn test_nullable_extension_can_be_disabled() {
        let checker = ContractCheckerBuilder::new()
            .load_from_file(fixture_path("petstore-swagger.json"))
            .nullable_extension(false)
            .build()
            .unwrap();
        let body = json!([{"id": 1, "name": "rex", "tag": null}]);
        let error = checker
            .check_response_body(&body, "/api/pets", "GET", 200, None)
            .unwrap_err();
        assert_eq!(error.field_errors()[0].path, "[0].tag");
    }

    #[test]
    fn test_shared_fragment_is_not_rewritten_in_place() {
        let checker = swagger_checker();
        let body = json!([{"id": 1, "name": "rex", "tag": null}]);
        checker
            .check_response_body(&body, "/api/pets", "GET", 200, None)
            .unwrap();
        let declared = &checker.document().root()["definitions"]["newPet"]["properties"]["tag"];
        assert_eq!(declared["x-nullable"], json!(true));
    }

    #[test]
    fn test_malformed_body_parameters() {
        let checker = swagger_checker();
        let error = checker
            .check_request_body(&json!({}), "/api/pets/bulk", "POST", None)
            .unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
        assert!(!error.is_mismatch());
    }

    #[test]
    fn test_openapi_body_by_media_type() {
        let checker = openapi_checker();
        let error = checker
            .check_response_body(
                &json!({"id": "one"}),
                "/v1/pets/1",
                "GET",
                200,
                Some("application/json"),
            )
            .unwrap_err();
        let paths: Vec<&str> = error
            .field_errors()
            .iter()
            .map(|field| field.path.as_str())
            .collect();
        assert!(paths.contains(&"id"));
        assert!(paths.contains(&"name"));
    }
}
