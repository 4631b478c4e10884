//! Catalog operations executed through a `Transport`.
//!
//! # Design
//! `Catalog` pairs the stateless `CatalogClient` with a `Transport` and runs
//! each operation as build → execute → parse. Every public operation resolves
//! to an `ApiResult`; transport failures, bad statuses and unparseable bodies
//! all become `{success: false, error}`. Calls within one operation run
//! strictly in sequence.

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::client::CatalogClient;
use crate::error::{ApiError, CreateApiError, ParameterStage};
use crate::http::{HttpRequest, HttpResponse};
use crate::result::ApiResult;
use crate::transport::Transport;
use crate::types::{
    Api, ApiDetail, CreateApi, CreatedApiSummary, Group, GroupSummary, GroupWithApis,
    JsonImportSummary, NewApiWithParameters, OrderEntry, ParamCategory, ParameterCount,
    ParameterSpec, ParametersFromJson, UpdateApi,
};

#[derive(Debug, Clone)]
pub struct Catalog<T> {
    client: CatalogClient,
    transport: T,
}

impl<T: Transport> Catalog<T> {
    pub fn new(client: CatalogClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -- groups --------------------------------------------------------------

    pub fn groups_with_apis(&self) -> ApiResult<Vec<GroupWithApis>> {
        let result = self.fetch(Ok(self.client.build_groups_with_apis()));
        finish("groups_with_apis", result)
    }

    pub fn groups(&self) -> ApiResult<Vec<GroupSummary>> {
        let result = self.fetch(Ok(self.client.build_list_groups()));
        finish("groups", result)
    }

    pub fn create_group(&self, name: &str) -> ApiResult<Group> {
        let result = self.fetch(self.client.build_create_group(name));
        finish("create_group", result)
    }

    pub fn rename_group(&self, id: u32, name: &str) -> ApiResult<Group> {
        let result = self.fetch(self.client.build_rename_group(id, name));
        finish("rename_group", result)
    }

    pub fn delete_group(&self, id: u32) -> ApiResult<()> {
        let result = self.ack(Ok(self.client.build_delete_group(id)));
        finish("delete_group", result)
    }

    pub fn reorder_groups(&self, orders: &[OrderEntry]) -> ApiResult<()> {
        let result = self.ack(self.client.build_reorder_groups(orders));
        finish("reorder_groups", result)
    }

    // -- apis ----------------------------------------------------------------

    /// Fetch one API with its parameters reshaped into request and response
    /// trees.
    pub fn get_api(&self, id: u32) -> ApiResult<ApiDetail> {
        let result = self
            .round_trip(Ok(self.client.build_get_api(id)))
            .and_then(|response| self.client.parse_get_api(response));
        if let Ok(detail) = &result {
            if !detail.detached.is_empty() {
                warn!(
                    api_id = id,
                    detached = detail.detached.len(),
                    "parameters without a reachable parent were left out of the trees"
                );
            }
        }
        finish("get_api", result)
    }

    pub fn create_api(&self, input: &CreateApi) -> ApiResult<Api> {
        let result = self.fetch(self.client.build_create_api(input));
        finish("create_api", result)
    }

    pub fn update_api(&self, id: u32, input: &UpdateApi) -> ApiResult<Api> {
        let result = self.fetch(self.client.build_update_api(id, input));
        finish("update_api", result)
    }

    pub fn delete_api(&self, id: u32) -> ApiResult<()> {
        let result = self.ack(Ok(self.client.build_delete_api(id)));
        finish("delete_api", result)
    }

    pub fn reorder_apis(&self, orders: &[OrderEntry]) -> ApiResult<()> {
        let result = self.ack(self.client.build_reorder_apis(orders));
        finish("reorder_apis", result)
    }

    // -- parameters ----------------------------------------------------------

    /// Replace every parameter of `category` on an API with `parameters`.
    pub fn replace_parameters(
        &self,
        api_id: u32,
        category: ParamCategory,
        parameters: &[ParameterSpec],
    ) -> ApiResult<ParameterCount> {
        let result = self.fetch(self.client.build_replace_parameters(api_id, category, parameters));
        finish("replace_parameters", result)
    }

    /// Replace every parameter of `category` with the structure derived from
    /// an arbitrary JSON object.
    pub fn import_parameters_from_json(
        &self,
        api_id: u32,
        input: &ParametersFromJson,
    ) -> ApiResult<JsonImportSummary> {
        let result = self.fetch(self.client.build_import_parameters_from_json(api_id, input));
        finish("import_parameters_from_json", result)
    }

    // -- composite -----------------------------------------------------------

    /// Create an API, then persist its request and response parameters.
    ///
    /// If persisting parameters fails the new API is deleted again. A failed
    /// delete is reported as its own error because the API is left behind.
    pub fn create_api_with_parameters(&self, input: &NewApiWithParameters) -> ApiResult<CreatedApiSummary> {
        self.try_create_api_with_parameters(input).into()
    }

    pub fn try_create_api_with_parameters(
        &self,
        input: &NewApiWithParameters,
    ) -> Result<CreatedApiSummary, CreateApiError> {
        let create = CreateApi {
            name: input.name.clone(),
            group_id: input.group_id,
            method: input.method.clone(),
            endpoint: input.endpoint.clone(),
            kind: input.kind.clone(),
            note: None,
        };
        let api: Api = self
            .fetch(self.client.build_create_api(&create))
            .map_err(|err| {
                warn!(%err, "create_api_with_parameters: creating API failed");
                CreateApiError::CreateApi(create_failure_message(err))
            })?;

        let stages = [
            (ParameterStage::Request, ParamCategory::Request, &input.request_parameters),
            (ParameterStage::Response, ParamCategory::Response, &input.response_parameters),
        ];
        for (stage, category, parameters) in stages {
            if parameters.is_empty() {
                continue;
            }
            let request = self.client.build_replace_parameters(api.id, category, parameters);
            if let Err(err) = self.ack(request) {
                warn!(api_id = api.id, %stage, %err, "persisting parameters failed, removing API");
                return Err(self.compensate(api.id, stage));
            }
        }

        info!(api_id = api.id, "created API with parameters");
        Ok(CreatedApiSummary {
            id: api.id,
            name: input.name.clone(),
            endpoint: input.endpoint.clone(),
            method: input.method.clone().filter(|m| !m.is_empty()),
            kind: input.kind.clone(),
            request_parameter_count: input.request_parameters.len(),
            response_parameter_count: input.response_parameters.len(),
        })
    }

    /// Delete a partially created API; exactly one DELETE is issued.
    fn compensate(&self, api_id: u32, stage: ParameterStage) -> CreateApiError {
        match self.ack(Ok(self.client.build_delete_api(api_id))) {
            Ok(()) => CreateApiError::Parameters(stage),
            Err(err) => {
                warn!(api_id, %err, "cleanup of partially created API failed");
                CreateApiError::CleanupFailed {
                    api_id,
                    stage,
                    cleanup_error: err.to_string(),
                }
            }
        }
    }

    // -- plumbing ------------------------------------------------------------

    fn round_trip(&self, request: Result<HttpRequest, ApiError>) -> Result<HttpResponse, ApiError> {
        let request = request?;
        Ok(self.transport.execute(&request)?)
    }

    fn fetch<R: DeserializeOwned>(&self, request: Result<HttpRequest, ApiError>) -> Result<R, ApiError> {
        let response = self.round_trip(request)?;
        self.client.parse_data(response)
    }

    fn ack(&self, request: Result<HttpRequest, ApiError>) -> Result<(), ApiError> {
        let response = self.round_trip(request)?;
        self.client.parse_ack(response)
    }
}

fn finish<R>(operation: &'static str, result: Result<R, ApiError>) -> ApiResult<R> {
    if let Err(err) = &result {
        warn!(operation, %err, "catalog operation failed");
    }
    result.into()
}

/// The backend may reject a create without saying why; callers still get a
/// readable message.
fn create_failure_message(err: ApiError) -> String {
    match err {
        ApiError::Backend(message) if !message.is_empty() => message,
        ApiError::Backend(_) | ApiError::MissingData => "Failed to create API".to_string(),
        other => other.to_string(),
    }
}
