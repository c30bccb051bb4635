//! Contract checking for HTTP traffic against Swagger 2.0 and OpenAPI 3.x documents.
//!
//! The crate resolves the operation an observed request or response belongs to,
//! extracts the applicable schemas, headers and media types, and validates the
//! observed message against them.
//!
//! ```rust
//! use oas_contract::ContractCheckerBuilder;
//! use serde_json::json;
//!
//! let checker = ContractCheckerBuilder::new()
//!     .load_from_value(json!({
//!         "swagger": "2.0",
//!         "produces": ["application/json"],
//!         "paths": {
//!             "/pets/{id}": {
//!                 "get": {
//!                     "responses": {
//!                         "200": {
//!                             "description": "pet",
//!                             "schema": {"type": "object", "required": ["id"]}
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     }))
//!     .build()
//!     .unwrap();
//!
//! assert!(checker
//!     .check_response_body(&json!({"id": 1}), "/pets/1", "GET", 200, None)
//!     .is_ok());
//! assert!(checker
//!     .check_response_body(&json!({}), "/pets/1", "GET", 200, None)
//!     .is_err());
//! ```

pub mod cache;
pub mod checker;
pub mod converter;
pub mod document;
pub mod error;
pub mod matcher;
pub mod resolver;
pub mod synthesizer;
pub mod types;
pub mod validation;

pub use checker::builder::ContractCheckerBuilder;
pub use checker::ContractChecker;
pub use converter::{HttpFact, MessageFacts};
pub use document::{ApiDocument, DocumentSource};
pub use error::{ContractElement, ContractError, ContractErrorKind};
pub use validation::{FieldError, ValidationOutcome};

const SWAGGER_FIELD: &str = "swagger";
const OPENAPI_FIELD: &str = "openapi";
const PATHS_FIELD: &str = "paths";
const BASE_PATH_FIELD: &str = "basePath";
const SERVERS_FIELD: &str = "servers";
const URL_FIELD: &str = "url";
const CONSUMES_FIELD: &str = "consumes";
const PRODUCES_FIELD: &str = "produces";
const PARAMETERS_FIELD: &str = "parameters";
const RESPONSES_FIELD: &str = "responses";
const REQUEST_BODY_FIELD: &str = "requestBody";
const CONTENT_FIELD: &str = "content";
const HEADERS_FIELD: &str = "headers";
const SCHEMA_FIELD: &str = "schema";
const NAME_FIELD: &str = "name";
const IN_FIELD: &str = "in";
const REQUIRED_FIELD: &str = "required";
const REF_FIELD: &str = "$ref";
const TYPE_FIELD: &str = "type";
const ITEMS_FIELD: &str = "items";
const ENUM_FIELD: &str = "enum";
const PROPERTIES_FIELD: &str = "properties";
const COLLECTION_FORMAT_FIELD: &str = "collectionFormat";
const STYLE_FIELD: &str = "style";
const EXPLODE_FIELD: &str = "explode";
const DEFAULT_RESPONSE: &str = "default";
const FILE_TYPE: &str = "file";
const CONTENT_TYPE_HEADER: &str = "content-type";
const PATH_SEPARATOR: &str = "/";
const TILDE: &str = "~";
const ENCODED_BACKSLASH: &str = "~1";
const ENCODED_TILDE: &str = "~0";
