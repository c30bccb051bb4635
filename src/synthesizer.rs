use crate::error::ContractError;
use crate::types::json_path::JsonPath;
use crate::types::primitive::{CollectionFormat, OpenApiPrimitives};
use crate::types::{ParameterLocation, ParameterSpec, QueryValue};
use crate::{ENUM_FIELD, ITEMS_FIELD, PROPERTIES_FIELD, REQUIRED_FIELD, TYPE_FIELD};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

const NULLABLE_MARKERS: [&str; 2] = ["x-nullable", "nullable"];
const COMPOSITION_FIELDS: [&str; 3] = ["allOf", "anyOf", "oneOf"];
const ADDITIONAL_PROPERTIES_FIELD: &str = "additionalProperties";
const NULL_TYPE: &str = "null";
const HEADER_VALUE_SEPARATOR: &str = ", ";

/// One object schema standing for every parameter of a single location.
///
/// Built on demand from [`ParameterSpec`]s and never stored. Header names are
/// lower-cased both here and in the observed value handed to
/// [`NormalizedConstraintSchema::normalize_instance`]; other locations keep
/// their case.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConstraintSchema {
    pub location: ParameterLocation,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
    formats: HashMap<String, CollectionFormat>,
}

impl NormalizedConstraintSchema {
    fn fold(&self, name: &str) -> String {
        fold_name(name, self.location)
    }

    /// The JSON schema of the whole location. `required` is left out when
    /// empty since draft 4 rejects an empty list.
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert(TYPE_FIELD.to_string(), json!("object"));
        schema.insert(
            PROPERTIES_FIELD.to_string(),
            Value::Object(self.properties.clone()),
        );
        if !self.required.is_empty() {
            schema.insert(REQUIRED_FIELD.to_string(), json!(self.required));
        }
        Value::Object(schema)
    }

    /// Turns observed raw values into the instance checked against
    /// [`NormalizedConstraintSchema::to_schema`].
    ///
    /// Names are folded the same way property names were. Values of declared
    /// parameters are converted to their declared types, undeclared ones are
    /// passed through as strings.
    pub fn normalize_instance(&self, observed: &BTreeMap<String, QueryValue>) -> Value {
        let mut folded: Vec<(String, Vec<&str>)> = Vec::new();
        for (name, value) in observed {
            let key = self.fold(name);
            match folded.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, values)) => values.extend(value.values()),
                None => folded.push((key, value.values())),
            }
        }

        let mut instance = Map::new();
        for (key, values) in folded {
            // Repeated header lines are one comma separated value.
            let joined = (self.location == ParameterLocation::Header && values.len() > 1)
                .then(|| values.join(HEADER_VALUE_SEPARATOR));
            let values: Vec<&str> = match &joined {
                Some(joined) => vec![joined.as_str()],
                None => values,
            };
            let converted = match self.properties.get(&key) {
                Some(schema) => {
                    let format = self
                        .formats
                        .get(&key)
                        .copied()
                        .unwrap_or(CollectionFormat::Csv);
                    OpenApiPrimitives::coerce_parameter(
                        schema,
                        &values,
                        format,
                        self.location == ParameterLocation::Header,
                    )
                }
                None => match values.as_slice() {
                    [single] => Value::String(single.to_string()),
                    many => json!(many),
                },
            };
            instance.insert(key, converted);
        }
        Value::Object(instance)
    }
}

fn fold_name(name: &str, location: ParameterLocation) -> String {
    match location {
        ParameterLocation::Header => name.to_lowercase(),
        _ => name.to_string(),
    }
}

/// Builds the constraint schema for every parameter of `location`.
///
/// # Arguments
///
/// * `parameters` - merged parameters of an operation; other locations are skipped
/// * `location` - the location to build the schema for
///
/// # Returns
///
/// * `Ok(NormalizedConstraintSchema)` - with a copy of each parameter schema
/// * `Err(ContractError::MalformedContract)` - when a body parameter lacks a schema
///
/// The parameters are left untouched.
///
/// # Example
///
/// ```rust
/// use oas_contract::synthesizer::synthesize_from_declarations;
/// use oas_contract::types::ParameterLocation;
/// use serde_json::json;
///
/// let declarations = vec![json!({
///     "name": "X-Request-Id",
///     "in": "header",
///     "required": true,
///     "type": "string"
/// })];
/// let constraint = synthesize_from_declarations(&declarations, ParameterLocation::Header).unwrap();
/// assert_eq!(
///     constraint.to_schema(),
///     json!({
///         "type": "object",
///         "properties": {"x-request-id": {"type": "string"}},
///         "required": ["x-request-id"]
///     })
/// );
/// ```
pub fn synthesize(
    parameters: &[ParameterSpec],
    location: ParameterLocation,
) -> Result<NormalizedConstraintSchema, ContractError> {
    let mut constraint = NormalizedConstraintSchema {
        location,
        properties: Map::new(),
        required: Vec::new(),
        formats: HashMap::new(),
    };
    for parameter in parameters
        .iter()
        .filter(|parameter| parameter.location == location)
    {
        let key = fold_name(&parameter.name, location);
        constraint.properties.insert(key.clone(), parameter.schema()?);
        constraint
            .formats
            .insert(key.clone(), parameter.collection_format());
        if parameter.required && !constraint.required.contains(&key) {
            constraint.required.push(key);
        }
    }
    Ok(constraint)
}

/// [`synthesize`] over raw parameter objects, rejecting any that lack a
/// `name` or `in` field.
pub fn synthesize_from_declarations(
    declarations: &[Value],
    location: ParameterLocation,
) -> Result<NormalizedConstraintSchema, ContractError> {
    let parameters = declarations
        .iter()
        .enumerate()
        .map(|(index, declaration)| {
            ParameterSpec::from_declaration(declaration, &JsonPath::new().with(index.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    synthesize(&parameters, location)
}

/// Rewrites `x-nullable: true` and `nullable: true` into standard schema terms.
///
/// Works on a copy. A marked node gets `null` added to its `type` (turning a
/// single type into a two member union) and to its `enum` when it has one,
/// then loses the marker. The walk covers `properties`, `items`,
/// `additionalProperties`, `allOf`, `anyOf` and `oneOf`. Running it on its
/// own output changes nothing.
///
/// ```rust
/// use oas_contract::synthesizer::apply_nullable_extension;
/// use serde_json::json;
///
/// let schema = json!({"type": "string", "enum": ["a"], "x-nullable": true});
/// assert_eq!(
///     apply_nullable_extension(&schema),
///     json!({"type": ["string", "null"], "enum": ["a", null]})
/// );
/// ```
pub fn apply_nullable_extension(schema: &Value) -> Value {
    let mut rewritten = schema.clone();
    rewrite_nullable(&mut rewritten);
    rewritten
}

fn rewrite_nullable(node: &mut Value) {
    let Value::Object(object) = node else {
        return;
    };

    let mut nullable = false;
    for marker in NULLABLE_MARKERS {
        if let Some(flag) = object.shift_remove(marker) {
            nullable |= flag.as_bool().unwrap_or(false);
        }
    }
    if nullable {
        if let Some(declared) = object.get_mut(TYPE_FIELD) {
            match declared {
                Value::String(single) if single.as_str() != NULL_TYPE => {
                    let single = std::mem::take(single);
                    *declared = json!([single, NULL_TYPE]);
                }
                Value::Array(members) if !members.contains(&json!(NULL_TYPE)) => {
                    members.push(json!(NULL_TYPE));
                }
                _ => {}
            }
        }
        if let Some(Value::Array(allowed)) = object.get_mut(ENUM_FIELD) {
            if !allowed.contains(&Value::Null) {
                allowed.push(Value::Null);
            }
        }
    }

    if let Some(Value::Object(properties)) = object.get_mut(PROPERTIES_FIELD) {
        properties.values_mut().for_each(rewrite_nullable);
    }
    match object.get_mut(ITEMS_FIELD) {
        Some(Value::Array(items)) => items.iter_mut().for_each(rewrite_nullable),
        Some(items) => rewrite_nullable(items),
        None => {}
    }
    if let Some(additional) = object.get_mut(ADDITIONAL_PROPERTIES_FIELD) {
        rewrite_nullable(additional);
    }
    for field in COMPOSITION_FIELDS {
        if let Some(Value::Array(members)) = object.get_mut(field) {
            members.iter_mut().for_each(rewrite_nullable);
        }
    }
}
