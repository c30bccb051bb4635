use crate::checker::ContractChecker;
use crate::error::{ContractElement, ContractError};
use crate::synthesizer::synthesize;
use crate::types::{ParameterLocation, ParameterSpec, QueryValue};
use std::collections::{BTreeMap, HashMap};

fn as_observed(headers: &HashMap<String, String>) -> BTreeMap<String, QueryValue> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), QueryValue::from(value.as_str())))
        .collect()
}

impl ContractChecker {
    fn check_location(
        &self,
        parameters: &[ParameterSpec],
        location: ParameterLocation,
        observed: &BTreeMap<String, QueryValue>,
        element: ContractElement,
    ) -> Result<(), ContractError> {
        let constraint = synthesize(parameters, location)?;
        if constraint.properties.is_empty() {
            log::trace!("No {} parameters declared, skipping {}", location, element);
            return Ok(());
        }
        let schema = self.prepare_schema(constraint.to_schema());
        let instance = constraint.normalize_instance(observed);
        self.validator
            .validate(&instance, &schema)?
            .into_result(element, &instance)
    }

    /// Checks request headers against the header parameters of the operation.
    ///
    /// Header names are matched case-insensitively. Undeclared headers are
    /// allowed.
    ///
    /// # Arguments
    ///
    /// * `headers` - observed headers, one value per name
    /// * `path` - the request path, base path included
    /// * `method` - the request method
    pub fn check_request_headers(
        &self,
        headers: &HashMap<String, String>,
        path: &str,
        method: &str,
    ) -> Result<(), ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let parameters = self.resolver().merged_parameters(&operation)?;
        self.check_location(
            &parameters,
            ParameterLocation::Header,
            &as_observed(headers),
            ContractElement::RequestHeaders,
        )
    }

    /// Checks response headers against the headers declared on the response
    /// selected for `status`. A declared header is required unless it says
    /// `required: false`.
    pub fn check_response_headers(
        &self,
        headers: &HashMap<String, String>,
        path: &str,
        method: &str,
        status: u16,
    ) -> Result<(), ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let declared = self.resolver().get_response_headers(&operation, status)?;
        self.check_location(
            &declared,
            ParameterLocation::Header,
            &as_observed(headers),
            ContractElement::ResponseHeaders,
        )
    }

    /// Checks query parameters. Names are case-sensitive and repeated
    /// parameters arrive as [`QueryValue::Multiple`].
    pub fn check_request_query(
        &self,
        query: &BTreeMap<String, QueryValue>,
        path: &str,
        method: &str,
    ) -> Result<(), ContractError> {
        let (_, operation) = self.locate(path, method)?;
        let parameters = self.resolver().merged_parameters(&operation)?;
        self.check_location(
            &parameters,
            ParameterLocation::Query,
            query,
            ContractElement::RequestQuery,
        )
    }

    /// Checks the values captured from `path` by its template against the
    /// path parameters of the operation.
    pub fn check_request_path_params(&self, path: &str, method: &str) -> Result<(), ContractError> {
        let (found, operation) = self.locate(path, method)?;
        let parameters = self.resolver().merged_parameters(&operation)?;
        let observed: BTreeMap<String, QueryValue> = found
            .params
            .iter()
            .map(|(name, value)| (name.clone(), QueryValue::from(value.as_str())))
            .collect();
        self.check_location(
            &parameters,
            ParameterLocation::Path,
            &observed,
            ContractElement::RequestPath,
        )
    }
}
