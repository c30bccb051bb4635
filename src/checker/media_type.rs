use crate::checker::ContractChecker;
use crate::error::{ContractElement, ContractError};
use crate::resolver::{essence, media_range_covers};
use crate::types::Direction;

/// Checks an observed `Content-Type` against the media types allowed for a
/// message.
///
/// Parameters such as `charset` are ignored on both sides and the comparison
/// is exact, so `application/*` does not admit `application/json`. An empty
/// allowed list admits nothing.
///
/// # Example
///
/// ```rust
/// use oas_contract::checker::check_media_type;
/// use oas_contract::ContractElement;
///
/// let allowed = vec!["application/json".to_string()];
/// assert!(check_media_type("application/json; charset=utf-8", &allowed, ContractElement::ResponseMediaType).is_ok());
///
/// let error = check_media_type("application/pdf; charset=utf-8", &allowed, ContractElement::ResponseMediaType)
///     .unwrap_err();
/// assert_eq!(
///     error.to_string(),
///     "'application/pdf' is not an allowed response media type (application/json)"
/// );
/// ```
pub fn check_media_type(
    observed: &str,
    allowed: &[String],
    element: ContractElement,
) -> Result<(), ContractError> {
    let observed = essence(observed);
    if allowed.iter().any(|declared| essence(declared) == observed) {
        return Ok(());
    }
    Err(ContractError::media_type_not_allowed(
        element,
        &observed,
        allowed.to_vec(),
    ))
}

/// Like [`check_media_type`], also admitting an observed type covered by a
/// declared range such as `image/*` or `*/*`. Used for OpenAPI 3 `content`
/// maps, whose keys may be media ranges.
///
/// ```rust
/// use oas_contract::checker::check_media_range;
/// use oas_contract::ContractElement;
///
/// let allowed = vec!["image/*".to_string()];
/// assert!(check_media_range("image/png", &allowed, ContractElement::RequestMediaType).is_ok());
/// assert!(check_media_range("text/plain", &allowed, ContractElement::RequestMediaType).is_err());
/// ```
pub fn check_media_range(
    observed: &str,
    allowed: &[String],
    element: ContractElement,
) -> Result<(), ContractError> {
    let observed_essence = essence(observed);
    let covered = allowed.iter().any(|declared| {
        let declared = essence(declared);
        declared == observed_essence || media_range_covers(&declared, &observed_essence)
    });
    if covered {
        return Ok(());
    }
    check_media_type(observed, allowed, element)
}

impl ContractChecker {
    fn check_allowed_media_type(
        &self,
        media_type: &str,
        allowed: &[String],
        element: ContractElement,
    ) -> Result<(), ContractError> {
        if self.document.version().uses_content_map() {
            check_media_range(media_type, allowed, element)
        } else {
            check_media_type(media_type, allowed, element)
        }
    }

    pub fn check_request_media_type(
        &self,
        media_type: &str,
        path: &str,
        method: &str,
    ) -> Result<(), ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let allowed = self
            .resolver()
            .get_media_types(&operation, Direction::Request, None)?;
        self.check_allowed_media_type(media_type, &allowed, ContractElement::RequestMediaType)
    }

    /// Checks a response `Content-Type` against the media types the operation
    /// may produce for `status`.
    pub fn check_response_media_type(
        &self,
        media_type: &str,
        path: &str,
        method: &str,
        status: u16,
    ) -> Result<(), ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let allowed = self
            .resolver()
            .get_media_types(&operation, Direction::Response, Some(status))?;
        self.check_allowed_media_type(media_type, &allowed, ContractElement::ResponseMediaType)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ContractCheckerBuilder;
    use crate::checker::test_support::{openapi_checker, swagger_checker};
    use crate::converter::MessageFacts;
    use serde_json::json;

    fn allowed(media_types: &[&str]) -> Vec<String> {
        media_types.iter().map(|media_type| media_type.to_string()).collect()
    }

    #[test]
    fn test_parameters_are_ignored() {
        assert!(
            check_media_type(
                "Application/JSON;charset=UTF-8",
                &allowed(&["application/json; charset=utf-8"]),
                ContractElement::RequestMediaType
            )
            .is_ok()
        );
    }

    #[test]
    fn test_rejection_reports_allowed_list() {
        let error = check_media_type(
            "application/pdf; charset=utf-8",
            &allowed(&["application/json", "text/html"]),
            ContractElement::ResponseMediaType,
        )
        .unwrap_err();
        match error {
            ContractError::MediaTypeNotAllowed {
                element,
                observed,
                allowed,
            } => {
                assert_eq!(element, ContractElement::ResponseMediaType);
                assert_eq!(observed, "application/pdf");
                assert_eq!(allowed, vec!["application/json", "text/html"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wildcards_are_not_expanded() {
        assert!(
            check_media_type(
                "application/json",
                &allowed(&["application/*"]),
                ContractElement::RequestMediaType
            )
            .is_err()
        );
    }

    #[test]
    fn test_empty_allowed_list_rejects() {
        assert!(check_media_type("application/json", &[], ContractElement::RequestMediaType).is_err());
    }

    #[test]
    fn test_operation_media_types() {
        let checker = swagger_checker();
        assert!(
            checker
                .check_response_media_type("text/html", "/api/pets/1", "GET", 200)
                .is_ok()
        );
        assert!(
            checker
                .check_request_media_type("application/json", "/api/pets/1", "PATCH")
                .is_err()
        );
        assert!(
            checker
                .check_request_media_type("application/merge-patch+json", "/api/pets/1", "PATCH")
                .is_ok()
        );
    }

    #[test]
    fn test_content_map_media_types() {
        let checker = openapi_checker();
        assert!(
            checker
                .check_response_media_type("application/problem+json", "/v1/pets", "GET", 500)
                .is_ok()
        );
        assert!(
            checker
                .check_response_media_type("application/problem+json", "/v1/pets", "GET", 200)
                .is_err()
        );
    }

    #[test]
    fn test_range_admits_covered_types() {
        let ranges = allowed(&["image/*", "text/plain"]);
        assert!(check_media_range("image/png", &ranges, ContractElement::RequestMediaType).is_ok());
        assert!(check_media_range("Text/Plain; charset=utf-8", &ranges, ContractElement::RequestMediaType).is_ok());
        let error = check_media_range("application/json", &ranges, ContractElement::RequestMediaType)
            .unwrap_err();
        assert!(matches!(error, ContractError::MediaTypeNotAllowed { .. }));
        assert!(check_media_range("text/html", &allowed(&["*/*"]), ContractElement::ResponseMediaType).is_ok());
    }

    #[test]
    fn test_swagger_lists_stay_exact() {
        let checker = ContractCheckerBuilder::new()
            .load_from_value(json!({
                "swagger": "2.0",
                "paths": {"/upload": {"post": {
                    "consumes": ["image/*"],
                    "responses": {"204": {"description": "stored"}}
                }}}
            }))
            .build()
            .unwrap();
        assert!(
            checker
                .check_request_media_type("image/png", "/upload", "POST")
                .is_err()
        );
    }

    #[test]
    fn test_content_map_ranges() {
        let checker = ContractCheckerBuilder::new()
            .load_from_value(json!({
                "openapi": "3.0.3",
                "paths": {"/upload": {"post": {
                    "requestBody": {"content": {"image/*": {"schema": {"type": "string"}}}},
                    "responses": {"200": {
                        "description": "stored",
                        "content": {"*/*": {"schema": {"type": "string"}}}
                    }}
                }}}
            }))
            .build()
            .unwrap();

        let accepted = MessageFacts::request("POST", "/upload")
            .with_header("Content-Type", "image/png")
            .with_body("PNGDATA");
        assert!(checker.check_request(&accepted).is_ok());

        let rejected = MessageFacts::request("POST", "/upload")
            .with_header("Content-Type", "text/plain")
            .with_body("PNGDATA");
        let error = checker.check_request(&rejected).unwrap_err();
        assert_eq!(error.element(), Some(ContractElement::RequestMediaType));

        assert!(
            checker
                .check_response_media_type("text/csv", "/upload", "POST", 200)
                .is_ok()
        );
    }
}
