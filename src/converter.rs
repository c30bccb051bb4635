use crate::CONTENT_TYPE_HEADER;
use crate::types::QueryValue;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const QUERY_SEPARATOR: char = '&';
const QUERY_ASSIGNMENT: char = '=';
const ARRAY_KEY_SUFFIX: &str = "[]";
const HEADER_VALUE_SEPARATOR: &str = ", ";

/// What the checker needs to know about an observed HTTP message.
///
/// Requests provide a method and path, responses a status code. Members that
/// do not apply to a message return an empty value.
pub trait HttpFact {
    fn method_str(&self) -> &str;
    fn path_str(&self) -> &str;
    fn status_code(&self) -> Option<u16>;
    /// Header values keyed by name. Repeated headers are joined with `", "`.
    fn header_map(&self) -> HashMap<String, String>;
    fn query_map(&self) -> BTreeMap<String, QueryValue>;
    fn body_bytes(&self) -> Bytes;

    /// The `Content-Type` of the message, if any.
    fn media_type(&self) -> Option<String> {
        self.header_map()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER))
            .map(|(_, value)| value)
    }
}

/// A body type whose raw bytes can be read without consuming it.
pub trait MessageBody {
    fn to_bytes(&self) -> Bytes;
}

impl MessageBody for Bytes {
    fn to_bytes(&self) -> Bytes {
        self.clone()
    }
}

impl MessageBody for Vec<u8> {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl MessageBody for String {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl MessageBody for &str {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl MessageBody for Value {
    fn to_bytes(&self) -> Bytes {
        match self {
            Value::Null => Bytes::new(),
            value => Bytes::from(value.to_string()),
        }
    }
}

impl MessageBody for () {
    fn to_bytes(&self) -> Bytes {
        Bytes::new()
    }
}

fn collect_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            log::warn!("Skipping header '{}' with a non visible ASCII value", name);
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(HEADER_VALUE_SEPARATOR);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

impl<B> HttpFact for http::Request<B>
where
    B: MessageBody,
{
    fn method_str(&self) -> &str {
        self.method().as_str()
    }

    fn path_str(&self) -> &str {
        self.uri().path()
    }

    fn status_code(&self) -> Option<u16> {
        None
    }

    fn header_map(&self) -> HashMap<String, String> {
        collect_headers(self.headers())
    }

    fn query_map(&self) -> BTreeMap<String, QueryValue> {
        self.uri().query().map(parse_query).unwrap_or_default()
    }

    fn body_bytes(&self) -> Bytes {
        self.body().to_bytes()
    }
}

impl<B> HttpFact for http::Response<B>
where
    B: MessageBody,
{
    fn method_str(&self) -> &str {
        ""
    }

    fn path_str(&self) -> &str {
        ""
    }

    fn status_code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }

    fn header_map(&self) -> HashMap<String, String> {
        collect_headers(self.headers())
    }

    fn query_map(&self) -> BTreeMap<String, QueryValue> {
        BTreeMap::new()
    }

    fn body_bytes(&self) -> Bytes {
        self.body().to_bytes()
    }
}

/// A plain description of a request or response, for callers that do not
/// hold `http` types.
///
/// # Example
///
/// ```rust
/// use oas_contract::{HttpFact, MessageFacts};
///
/// let request = MessageFacts::request("GET", "/pets?limit=10&tag=a&tag=b")
///     .with_header("Accept", "application/json");
/// assert_eq!(request.path_str(), "/pets");
/// assert_eq!(request.query_map()["tag"].values(), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageFacts {
    method: String,
    path: String,
    status: Option<u16>,
    headers: HashMap<String, String>,
    query: BTreeMap<String, QueryValue>,
    body: Bytes,
    media_type: Option<String>,
}

impl MessageFacts {
    /// A request. A query string on `path` is parsed into query parameters.
    pub fn request(method: impl Into<String>, path: impl AsRef<str>) -> Self {
        let (path, query) = match path.as_ref().split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (path.as_ref().to_string(), BTreeMap::new()),
        };
        Self {
            method: method.into(),
            path,
            query,
            ..Self::default()
        }
    }

    pub fn response(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Adds a header. Adding the same name again appends to the value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        self.headers
            .entry(name.into())
            .and_modify(|existing| {
                existing.push_str(HEADER_VALUE_SEPARATOR);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = match self.query.remove(&name) {
            Some(existing) => existing.push(value),
            None => QueryValue::Single(value.into()),
        };
        self.query.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the media type explicitly instead of reading `Content-Type`.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

impl HttpFact for MessageFacts {
    fn method_str(&self) -> &str {
        &self.method
    }

    fn path_str(&self) -> &str {
        &self.path
    }

    fn status_code(&self) -> Option<u16> {
        self.status
    }

    fn header_map(&self) -> HashMap<String, String> {
        self.headers.clone()
    }

    fn query_map(&self) -> BTreeMap<String, QueryValue> {
        self.query.clone()
    }

    fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    fn media_type(&self) -> Option<String> {
        self.media_type.clone().or_else(|| {
            self.headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER))
                .map(|(_, value)| value.clone())
        })
    }
}

/// Decodes a raw body: nothing is `null`, JSON is parsed and anything else
/// is kept as a string.
pub(crate) fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            log::trace!("Body is not JSON, checking it as a string");
            Value::String(String::from_utf8_lossy(body).into_owned())
        }
    }
}

fn decode_query_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Splits a query string into decoded parameters. Repeated names and names
/// ending in `[]` collect their values.
pub(crate) fn parse_query(query: &str) -> BTreeMap<String, QueryValue> {
    let mut parsed: BTreeMap<String, QueryValue> = BTreeMap::new();
    for pair in query.split(QUERY_SEPARATOR).filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once(QUERY_ASSIGNMENT).unwrap_or((pair, ""));
        let name = decode_query_component(name);
        let name = name.strip_suffix(ARRAY_KEY_SUFFIX).unwrap_or(&name).to_string();
        if name.is_empty() {
            log::warn!("Skipping query parameter without a name in '{}'", query);
            continue;
        }
        let value = decode_query_component(value);
        let value = match parsed.remove(&name) {
            Some(existing) => existing.push(value),
            None => QueryValue::Single(value),
        };
        parsed.insert(name, value);
    }
    parsed
}

#[cfg(feature = "hyper")]
pub mod hyper {
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    pub enum HyperError {
        FailedToReadStream(String),
    }

    impl Display for HyperError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            match self {
                HyperError::FailedToReadStream(reason) => {
                    write!(f, "Failed to read stream: {}", reason)
                }
            }
        }
    }

    impl std::error::Error for HyperError {}

    async fn collect_body<B>(body: B) -> Result<Bytes, HyperError>
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        match body.collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(error) => Err(HyperError::FailedToReadStream(error.to_string())),
        }
    }

    /// Buffers a streaming request body so the request can be checked.
    pub async fn collect_request<B>(
        request: http::Request<B>,
    ) -> Result<http::Request<Bytes>, HyperError>
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();
        let bytes = collect_body(body).await?;
        Ok(http::Request::from_parts(parts, bytes))
    }

    pub async fn collect_response<B>(
        response: http::Response<B>,
    ) -> Result<http::Response<Bytes>, HyperError>
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        let (parts, body) = response.into_parts();
        let bytes = collect_body(body).await?;
        Ok(http::Response::from_parts(parts, bytes))
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use crate::HttpFact;
        use http_body_util::Full;

        #[tokio::test]
        async fn test_collect_request() {
            let request = http::Request::builder()
                .method("POST")
                .uri("/api/pets?limit=1")
                .body(Full::new(Bytes::from_static(b"{\"name\":\"rex\"}")))
                .unwrap();
            let collected = collect_request(request).await.unwrap();
            assert_eq!(collected.path_str(), "/api/pets");
            assert_eq!(collected.body_bytes(), Bytes::from_static(b"{\"name\":\"rex\"}"));
        }
    }
}

#[cfg(feature = "lambda_http")]
impl MessageBody for lambda_http::Body {
    fn to_bytes(&self) -> Bytes {
        let raw: &[u8] = self.as_ref();
        Bytes::copy_from_slice(raw)
    }
}
