pub mod builder;
mod body;
mod media_type;
mod parameters;

pub use media_type::{check_media_range, check_media_type};

use crate::converter::{HttpFact, decode_body};
use crate::document::ApiDocument;
use crate::error::ContractError;
use crate::matcher::{PathMatch, PathTemplateMatcher};
use crate::resolver::OperationResolver;
use crate::synthesizer::apply_nullable_extension;
use crate::types::Operation;
use crate::validation::SchemaValidator;
use serde_json::Value;
use std::sync::Arc;

const CLIENT_ERRORS: std::ops::RangeInclusive<u16> = 400..=499;

/// Checks observed requests and responses against one API document.
///
/// Every check first resolves the request path to a declared template and
/// fails with `ContractNotFound` when there is none. The document is shared
/// read-only, so one checker can serve many threads.
pub struct ContractChecker {
    document: Arc<ApiDocument>,
    matcher: PathTemplateMatcher,
    validator: Box<dyn SchemaValidator>,
    nullable_extension: bool,
}

impl ContractChecker {
    pub(crate) fn new(
        document: Arc<ApiDocument>,
        matcher: PathTemplateMatcher,
        validator: Box<dyn SchemaValidator>,
        nullable_extension: bool,
    ) -> Self {
        Self {
            document,
            matcher,
            validator,
            nullable_extension,
        }
    }

    pub fn document(&self) -> &Arc<ApiDocument> {
        &self.document
    }

    pub fn matcher(&self) -> &PathTemplateMatcher {
        &self.matcher
    }

    pub fn resolver(&self) -> OperationResolver<'_> {
        OperationResolver::new(&self.document)
    }

    /// Matches `path` and resolves the operation declared for `method` on it.
    fn locate(
        &self,
        path: &str,
        method: &str,
    ) -> Result<(Arc<PathMatch>, Operation<'_>), ContractError> {
        let found = self.matcher.match_path(path)?;
        let operation = self.resolver().resolve_operation(&found.template, method)?;
        Ok((found, operation))
    }

    fn prepare_schema(&self, schema: Value) -> Value {
        if self.nullable_extension {
            apply_nullable_extension(&schema)
        } else {
            schema
        }
    }

    /// Checks every part of a request: headers, media type (only when there is
    /// a body), query, path parameters and body.
    pub fn check_request<R>(&self, request: &R) -> Result<(), ContractError>
    where
        R: HttpFact + ?Sized,
    {
        let path = request.path_str();
        let method = request.method_str();
        self.check_request_headers(&request.header_map(), path, method)?;

        let body = request.body_bytes();
        let media_type = request.media_type();
        if !body.is_empty() {
            self.check_request_media_type(media_type.as_deref().unwrap_or_default(), path, method)?;
        }
        self.check_request_query(&request.query_map(), path, method)?;
        self.check_request_path_params(path, method)?;
        self.check_request_body(&decode_body(&body), path, method, media_type.as_deref())
    }

    /// Checks every part of a response to `method` on `path`: media type (only
    /// when there is a body), headers and body.
    pub fn check_response<R>(&self, response: &R, path: &str, method: &str) -> Result<(), ContractError>
    where
        R: HttpFact + ?Sized,
    {
        let status = response
            .status_code()
            .ok_or_else(|| ContractError::response_not_found(path, method, "<none>"))?;
        let body = response.body_bytes();
        let media_type = response.media_type();
        if !body.is_empty() {
            self.check_response_media_type(
                media_type.as_deref().unwrap_or_default(),
                path,
                method,
                status,
            )?;
        }
        self.check_response_headers(&response.header_map(), path, method, status)?;
        self.check_response_body(
            &decode_body(&body),
            path,
            method,
            status,
            media_type.as_deref(),
        )
    }

    /// Checks a request and the response it received.
    ///
    /// A request that does not match its contract is tolerated when the
    /// response carries a 4xx status, since the server rejected it. The
    /// response is checked in every case.
    pub fn check_request_and_response<Q, S>(&self, request: &Q, response: &S) -> Result<(), ContractError>
    where
        Q: HttpFact + ?Sized,
        S: HttpFact + ?Sized,
    {
        if let Err(error) = self.check_request(request) {
            let client_error = response
                .status_code()
                .is_some_and(|status| CLIENT_ERRORS.contains(&status));
            if !(client_error && error.is_mismatch()) {
                return Err(error);
            }
            log::debug!(
                "Ignoring request mismatch, the server answered with a client error: {}",
                error
            );
        }
        self.check_response(response, request.path_str(), request.method_str())
    }
}
