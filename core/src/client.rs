//! Stateless HTTP request builder and response parser for the catalog API.
//!
//! # Design
//! `CatalogClient` holds only the API root URL and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Executing the round-trip is left to a `Transport`, so the
//! whole request/response contract can be tested without a network.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::result::ApiResult;
use crate::tree::build_parameter_trees;
use crate::types::{
    ApiDetail, ApiOrders, CreateApi, GroupName, GroupOrders, OrderEntry, ParamCategory,
    ParameterSpec, ParametersFromJson, RawApiDetail, ReplaceParameters, UpdateApi,
};

/// Synchronous, stateless client for the catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api_root: String,
}

impl CatalogClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            api_root: config.api_root(),
        }
    }

    /// Client rooted at `{base_url}/api`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(&ClientConfig::with_base_url(base_url))
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    // -- groups --------------------------------------------------------------

    pub fn build_groups_with_apis(&self) -> HttpRequest {
        self.bare(HttpMethod::Get, "/groups/with-apis")
    }

    pub fn build_list_groups(&self) -> HttpRequest {
        self.bare(HttpMethod::Get, "/groups")
    }

    pub fn build_create_group(&self, name: &str) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/groups", &GroupName { name: name.to_string() })
    }

    pub fn build_rename_group(&self, id: u32, name: &str) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Patch,
            &format!("/groups/{id}"),
            &GroupName { name: name.to_string() },
        )
    }

    pub fn build_delete_group(&self, id: u32) -> HttpRequest {
        self.bare(HttpMethod::Delete, &format!("/groups/{id}"))
    }

    pub fn build_reorder_groups(&self, orders: &[OrderEntry]) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Post,
            "/groups/orders",
            &GroupOrders {
                group_orders: orders.to_vec(),
            },
        )
    }

    // -- apis ----------------------------------------------------------------

    pub fn build_get_api(&self, id: u32) -> HttpRequest {
        self.bare(HttpMethod::Get, &format!("/apis/{id}"))
    }

    pub fn build_create_api(&self, input: &CreateApi) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/apis", input)
    }

    pub fn build_update_api(&self, id: u32, input: &UpdateApi) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Patch, &format!("/apis/{id}"), input)
    }

    pub fn build_delete_api(&self, id: u32) -> HttpRequest {
        self.bare(HttpMethod::Delete, &format!("/apis/{id}"))
    }

    pub fn build_reorder_apis(&self, orders: &[OrderEntry]) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Post,
            "/apis/orders",
            &ApiOrders {
                api_orders: orders.to_vec(),
            },
        )
    }

    // -- parameters ----------------------------------------------------------

    pub fn build_replace_parameters(
        &self,
        api_id: u32,
        category: ParamCategory,
        parameters: &[ParameterSpec],
    ) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Put,
            &format!("/apis/{api_id}/parameters"),
            &ReplaceParameters {
                param_type: category,
                parameters: parameters.to_vec(),
            },
        )
    }

    pub fn build_import_parameters_from_json(
        &self,
        api_id: u32,
        input: &ParametersFromJson,
    ) -> Result<HttpRequest, ApiError> {
        self.json(
            HttpMethod::Post,
            &format!("/apis/{api_id}/parameters/from-json"),
            input,
        )
    }

    // -- parsing -------------------------------------------------------------

    /// Parse an envelope and return its `data` as `T`.
    pub fn parse_data<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        let data = parse_envelope(&response)?.ok_or(ApiError::MissingData)?;
        serde_json::from_value(data).map_err(|_| ApiError::Parse)
    }

    /// Parse an envelope whose payload the caller does not need.
    pub fn parse_ack(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_envelope(&response).map(|_| ())
    }

    /// Parse `GET /apis/{id}` and reshape its flat parameter list into trees.
    pub fn parse_get_api(&self, response: HttpResponse) -> Result<ApiDetail, ApiError> {
        let raw: RawApiDetail = self.parse_data(response)?;
        let trees = build_parameter_trees(&raw.parameters);
        let detached = trees.detached().cloned().collect();
        Ok(ApiDetail {
            api: raw.api,
            group: raw.group,
            request_parameters: trees.request.roots,
            response_parameters: trees.response.roots,
            detached,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    fn bare(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json<B: Serialize>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

/// Check the status, decode the envelope and unwrap a successful `data`.
///
/// Non-2xx statuses win over whatever the body says. A JSON `null` payload
/// counts as absent.
fn parse_envelope(response: &HttpResponse) -> Result<Option<serde_json::Value>, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            status_text: response.status_text.clone(),
        });
    }
    let envelope: ApiResult<serde_json::Value> =
        serde_json::from_str(&response.body).map_err(|_| ApiError::Parse)?;
    if !envelope.success {
        return Err(ApiError::Backend(envelope.error.unwrap_or_default()));
    }
    Ok(envelope.data.filter(|data| !data.is_null()))
}
