use crate::{ITEMS_FIELD, TYPE_FIELD};
use serde_json::{Number, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum OpenApiPrimitives {
    Null,
    Boolean,
    Integer,
    Array,
    Number,
    String,
    Object,
}

impl Display for OpenApiPrimitives {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenApiPrimitives::Null => write!(f, "null"),
            OpenApiPrimitives::Boolean => write!(f, "boolean"),
            OpenApiPrimitives::Integer => write!(f, "integer"),
            OpenApiPrimitives::Array => write!(f, "array"),
            OpenApiPrimitives::Number => write!(f, "number"),
            OpenApiPrimitives::String => write!(f, "string"),
            OpenApiPrimitives::Object => write!(f, "object"),
        }
    }
}

impl FromStr for OpenApiPrimitives {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(OpenApiPrimitives::Null),
            "boolean" => Ok(OpenApiPrimitives::Boolean),
            "integer" => Ok(OpenApiPrimitives::Integer),
            "number" => Ok(OpenApiPrimitives::Number),
            "string" => Ok(OpenApiPrimitives::String),
            "array" => Ok(OpenApiPrimitives::Array),
            "object" => Ok(OpenApiPrimitives::Object),
            other => Err(other.to_string()),
        }
    }
}

/// How several values of one array parameter are packed into a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFormat {
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// One occurrence of the key per element (`a=1&a=2`).
    Multi,
}

impl CollectionFormat {
    /// Parses a Swagger 2.0 `collectionFormat` value.
    pub fn from_collection_format(value: &str) -> Option<Self> {
        match value {
            "csv" => Some(CollectionFormat::Csv),
            "ssv" => Some(CollectionFormat::Ssv),
            "tsv" => Some(CollectionFormat::Tsv),
            "pipes" => Some(CollectionFormat::Pipes),
            "multi" => Some(CollectionFormat::Multi),
            _ => None,
        }
    }

    /// Maps an OpenAPI 3 `style`/`explode` pair.
    pub fn from_style(style: &str, explode: bool) -> Option<Self> {
        match (style, explode) {
            ("form", true) => Some(CollectionFormat::Multi),
            ("form", false) | ("simple", _) | ("matrix", _) | ("label", _) => {
                Some(CollectionFormat::Csv)
            }
            ("spaceDelimited", _) => Some(CollectionFormat::Ssv),
            ("pipeDelimited", _) => Some(CollectionFormat::Pipes),
            _ => None,
        }
    }

    pub fn delimiter(&self) -> Option<char> {
        match self {
            CollectionFormat::Csv => Some(','),
            CollectionFormat::Ssv => Some(' '),
            CollectionFormat::Tsv => Some('\t'),
            CollectionFormat::Pipes => Some('|'),
            CollectionFormat::Multi => None,
        }
    }
}

impl OpenApiPrimitives {
    /// Reads the declared type of a schema. A type union such as
    /// `["integer", "null"]` yields its first non-null member.
    pub fn from_schema(schema: &Value) -> Option<OpenApiPrimitives> {
        match schema.get(TYPE_FIELD)? {
            Value::String(declared) => OpenApiPrimitives::from_str(declared).ok(),
            Value::Array(declared) => declared
                .iter()
                .filter_map(Value::as_str)
                .filter(|declared| *declared != "null")
                .find_map(|declared| OpenApiPrimitives::from_str(declared).ok()),
            _ => None,
        }
    }

    /// Converts a raw string to this type. Input that does not parse is kept as
    /// a string so the schema validator reports the mismatch.
    pub fn convert_value_to_type(&self, input: &str) -> Value {
        match self {
            OpenApiPrimitives::Boolean => {
                if input.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if input.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    Value::String(input.to_string())
                }
            }
            OpenApiPrimitives::Integer => match input.parse::<i64>() {
                Ok(parsed) => Value::from(parsed),
                Err(_) => Value::String(input.to_string()),
            },
            OpenApiPrimitives::Number => match input.parse::<f64>().ok().and_then(Number::from_f64)
            {
                Some(parsed) => Value::Number(parsed),
                None => Value::String(input.to_string()),
            },
            _ => Value::String(input.to_string()),
        }
    }

    /// Builds the typed value of a parameter from its observed occurrences.
    ///
    /// # Arguments
    ///
    /// * `schema` - the parameter's schema
    /// * `values` - every occurrence of the parameter, in wire order
    /// * `format` - how array elements are packed into one occurrence
    /// * `trim` - whether array elements are surrounded by optional whitespace
    ///
    /// # Returns
    ///
    /// An array for array schemas. Any other schema receives the last
    /// occurrence, converted to the declared scalar type.
    pub fn coerce_parameter(
        schema: &Value,
        values: &[&str],
        format: CollectionFormat,
        trim: bool,
    ) -> Value {
        match OpenApiPrimitives::from_schema(schema) {
            Some(OpenApiPrimitives::Array) => {
                let item_type = schema
                    .get(ITEMS_FIELD)
                    .and_then(OpenApiPrimitives::from_schema);
                let elements: Vec<&str> = match (values, format.delimiter()) {
                    ([single], Some(delimiter)) => single.split(delimiter).collect(),
                    _ => values.to_vec(),
                };
                Value::Array(
                    elements
                        .into_iter()
                        .map(|element| if trim { element.trim() } else { element })
                        .map(|element| match item_type {
                            Some(item_type) => item_type.convert_value_to_type(element),
                            None => Value::String(element.to_string()),
                        })
                        .collect(),
                )
            }
            declared => {
                let Some(last) = values.last() else {
                    return Value::Null;
                };
                match declared {
                    Some(declared) => declared.convert_value_to_type(last),
                    None => Value::String(last.to_string()),
                }
            }
        }
    }
}
