use crate::error::ContractError;
use crate::types::ParameterLocation;
use crate::types::json_path::JsonPath;
use crate::types::primitive::CollectionFormat;
use crate::{
    COLLECTION_FORMAT_FIELD, EXPLODE_FIELD, IN_FIELD, NAME_FIELD, REQUIRED_FIELD, SCHEMA_FIELD,
    STYLE_FIELD,
};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Keys of a Swagger 2.0 parameter object that describe the parameter rather
/// than the value it carries.
const PARAMETER_BOOKKEEPING_FIELDS: [&str; 11] = [
    "name",
    "in",
    "required",
    "description",
    "collectionFormat",
    "allowEmptyValue",
    "style",
    "explode",
    "allowReserved",
    "deprecated",
    "example",
];

/// A declared operation, borrowed from the document it was resolved in.
#[derive(Debug, Clone)]
pub struct Operation<'d> {
    pub template: String,
    pub method: String,
    pub path_item: &'d Value,
    pub data: &'d Value,
    pub path: JsonPath,
}

/// A single parameter declaration, validated when it is read from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub declaration: Value,
}

impl ParameterSpec {
    /// Reads a parameter object.
    ///
    /// # Arguments
    ///
    /// * `declaration` - the raw parameter object
    /// * `path` - where it lives in the document, used in error messages
    ///
    /// # Returns
    ///
    /// * `Ok(ParameterSpec)` - when both `name` and `in` are present
    /// * `Err(ContractError::MalformedContract)` - otherwise
    pub fn from_declaration(declaration: &Value, path: &JsonPath) -> Result<Self, ContractError> {
        let location = match declaration.get(IN_FIELD).and_then(Value::as_str) {
            Some(location) => ParameterLocation::from_str(location).map_err(|_| {
                ContractError::malformed(
                    &path.format_path(),
                    &format!("unknown parameter location '{}'", location),
                )
            })?,
            None => {
                return Err(ContractError::malformed(
                    &path.format_path(),
                    "parameter is missing its 'in' location",
                ));
            }
        };
        let name = match declaration.get(NAME_FIELD).and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                return Err(ContractError::malformed(
                    &path.format_path(),
                    "parameter is missing its 'name'",
                ));
            }
        };
        let required = declaration
            .get(REQUIRED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(ParameterSpec {
            name,
            location,
            required,
            declaration: declaration.clone(),
        })
    }

    /// Builds a header spec from a response `headers` entry, which carries no
    /// `name` or `in` of its own.
    pub(crate) fn response_header(name: &str, declaration: &Value) -> Self {
        let required = declaration
            .get(REQUIRED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(true);
        ParameterSpec {
            name: name.to_string(),
            location: ParameterLocation::Header,
            required,
            declaration: declaration.clone(),
        }
    }

    pub fn key(&self) -> (&str, ParameterLocation) {
        (&self.name, self.location)
    }

    /// Returns a fresh copy of the schema this parameter constrains its value with.
    ///
    /// OpenAPI 3 parameters and body parameters carry it under `schema`. Other
    /// Swagger 2.0 parameters are their own schema once the bookkeeping keys
    /// are removed.
    pub fn schema(&self) -> Result<Value, ContractError> {
        if let Some(schema) = self.declaration.get(SCHEMA_FIELD) {
            return Ok(schema.clone());
        }
        if self.location == ParameterLocation::Body {
            return Err(ContractError::malformed(
                &format!("parameters/{}", self.name),
                "body parameter has no schema",
            ));
        }
        let schema: Map<String, Value> = match self.declaration.as_object() {
            Some(declaration) => declaration
                .iter()
                .filter(|(key, _)| !PARAMETER_BOOKKEEPING_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            None => Map::new(),
        };
        Ok(Value::Object(schema))
    }

    /// The packing of array values for this parameter.
    pub fn collection_format(&self) -> CollectionFormat {
        if let Some(format) = self
            .declaration
            .get(COLLECTION_FORMAT_FIELD)
            .and_then(Value::as_str)
            .and_then(CollectionFormat::from_collection_format)
        {
            return format;
        }
        // Swagger 2.0 parameters without a collectionFormat default to csv.
        if self.declaration.get(SCHEMA_FIELD).is_none() {
            return CollectionFormat::Csv;
        }

        let default_style = match self.location {
            ParameterLocation::Query | ParameterLocation::Cookie => "form",
            _ => "simple",
        };
        let style = self
            .declaration
            .get(STYLE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(default_style);
        let explode = self
            .declaration
            .get(EXPLODE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(style == "form");

        CollectionFormat::from_style(style, explode).unwrap_or(CollectionFormat::Csv)
    }
}

/// A declared response, borrowed from the document it was resolved in.
#[derive(Debug, Clone)]
pub struct ResponseSpec<'d> {
    /// The response key that was selected: the status code or `default`.
    pub status: String,
    pub data: &'d Value,
    pub path: JsonPath,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn parse(declaration: Value) -> Result<ParameterSpec, ContractError> {
        ParameterSpec::from_declaration(&declaration, &JsonPath::from_pointer("/parameters/0"))
    }

    #[test]
    fn test_parameter_without_location_is_malformed() {
        let error = parse(json!({"name": "limit", "type": "integer"})).unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
        assert!(error.to_string().contains("'in'"));
    }

    #[test]
    fn test_parameter_without_name_is_malformed() {
        let error = parse(json!({"in": "query", "type": "integer"})).unwrap_err();
        assert!(matches!(error, ContractError::MalformedContract { .. }));
    }

    #[test]
    fn test_swagger_parameter_schema_drops_bookkeeping() {
        let spec = parse(json!({
            "name": "tags",
            "in": "query",
            "required": true,
            "description": "tags to filter by",
            "type": "array",
            "items": {"type": "string"},
            "collectionFormat": "pipes"
        }))
        .unwrap();
        assert!(spec.required);
        assert_eq!(
            spec.schema().unwrap(),
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(spec.collection_format(), CollectionFormat::Pipes);
    }

    #[test]
    fn test_openapi_parameter_schema_and_style() {
        let spec = parse(json!({
            "name": "ids",
            "in": "query",
            "schema": {"type": "array", "items": {"type": "integer"}}
        }))
        .unwrap();
        assert!(!spec.required);
        assert_eq!(
            spec.schema().unwrap(),
            json!({"type": "array", "items": {"type": "integer"}})
        );
        assert_eq!(spec.collection_format(), CollectionFormat::Multi);
    }

    #[test]
    fn test_body_parameter_without_schema_is_malformed() {
        let spec = parse(json!({"name": "pet", "in": "body"})).unwrap();
        assert!(matches!(
            spec.schema(),
            Err(ContractError::MalformedContract { .. })
        ));
    }

    #[test]
    fn test_schema_is_a_copy() {
        let declaration = json!({"name": "id", "in": "path", "type": "integer"});
        let spec = parse(declaration.clone()).unwrap();
        let mut schema = spec.schema().unwrap();
        schema["type"] = json!("string");
        assert_eq!(spec.declaration, declaration);
    }

    #[test]
    fn test_response_header_required_unless_opted_out() {
        let header = ParameterSpec::response_header("ETag", &json!({"type": "string"}));
        assert!(header.required);
        let optional =
            ParameterSpec::response_header("X-Trace", &json!({"required": false, "schema": {}}));
        assert!(!optional.required);
    }
}
