//! Domain DTOs for the catalog API.
//!
//! # Design
//! These types mirror the backend's camelCase JSON but are defined
//! independently of the mock-server crate; integration tests catch schema
//! drift between the two. Timestamps stay as the RFC 3339 strings the backend
//! sends since the client never does arithmetic on them.

use serde::{Deserialize, Serialize};

/// A named collection of API definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u32,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A group together with its APIs, as returned by `/groups/with-apis`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithApis {
    #[serde(flatten)]
    pub group: Group,
    #[serde(default)]
    pub apis: Vec<Api>,
}

/// Entry of the bare group listing. Extra fields from the backend are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: u32,
    pub name: String,
}

/// A documented endpoint belonging to exactly one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Api {
    pub id: u32,
    pub group_id: u32,
    pub name: String,
    #[serde(default)]
    pub method: String,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub order: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Which half of an API's shape a parameter describes.
///
/// Tags other than `request` and `response` deserialize to `Unknown` so a
/// malformed record never fails the whole fetch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParamCategory {
    Request,
    Response,
    #[serde(other)]
    Unknown,
}

impl ParamCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamCategory::Request => "request",
            ParamCategory::Response => "response",
            ParamCategory::Unknown => "unknown",
        }
    }
}

/// Value type of a parameter.
///
/// The backend stores whatever type string it is given; anything outside
/// the five known types reads as `Unknown` instead of failing the fetch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    #[serde(other)]
    Unknown,
}

/// A flat parameter record as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: u32,
    pub api_id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub param_type: ParamCategory,
    #[serde(default)]
    pub parent_id: Option<u32>,
    #[serde(default)]
    pub order: i32,
}

/// A parameter with its nested children, built on read for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterNode {
    #[serde(flatten)]
    pub parameter: Parameter,
    pub children: Vec<ParameterNode>,
}

impl Drop for ParameterNode {
    // Flatten the subtree onto a local stack; each popped node has no
    // children left when it drops, so depth never reaches the call stack.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Why a parameter was left out of its category's tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum DetachReason {
    /// The parent id does not name any parameter of the same category.
    #[serde(rename_all = "camelCase")]
    MissingParent { parent_id: u32 },
    /// The parent exists but never connects to a root (a detached ancestor
    /// or a parent cycle).
    #[serde(rename_all = "camelCase")]
    Unreachable { parent_id: u32 },
    /// An earlier record in the same category already used this id.
    DuplicateId,
}

/// A parameter dropped during tree assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetachedParameter {
    pub parameter: Parameter,
    #[serde(flatten)]
    pub reason: DetachReason,
}

/// Raw payload of `GET /apis/{id}` before tree assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawApiDetail {
    #[serde(flatten)]
    pub api: Api,
    #[serde(default)]
    pub group: Option<Group>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// An API with its parameters reshaped into request and response trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiDetail {
    #[serde(flatten)]
    pub api: Api,
    #[serde(default)]
    pub group: Option<Group>,
    pub request_parameters: Vec<ParameterNode>,
    pub response_parameters: Vec<ParameterNode>,
    /// Parameters that could not be attached to either tree.
    #[serde(default)]
    pub detached: Vec<DetachedParameter>,
}

/// Request payload for creating or renaming a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupName {
    pub name: String,
}

/// Request payload for creating an API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateApi {
    pub name: String,
    pub group_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Request payload for updating an API. Only the fields present in the JSON
/// are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One entry of a bulk reorder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderEntry {
    pub id: u32,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrders {
    pub api_orders: Vec<OrderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrders {
    pub group_orders: Vec<OrderEntry>,
}

/// One item of a structured parameter list sent to `PUT /apis/{id}/parameters`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ParameterSpec>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
            description: None,
            children: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ParameterSpec>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceParameters {
    pub param_type: ParamCategory,
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParametersFromJson {
    pub param_type: ParamCategory,
    pub json: serde_json::Map<String, serde_json::Value>,
}

/// Response of a structured parameter replacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterCount {
    pub count: usize,
}

/// Response of a JSON-derived parameter replacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsonImportSummary {
    #[serde(default)]
    pub parameter_count: usize,
}

/// Input of the composite create-with-parameters operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewApiWithParameters {
    pub group_id: u32,
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub request_parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub response_parameters: Vec<ParameterSpec>,
}

/// Result of the composite create-with-parameters operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiSummary {
    pub id: u32,
    pub name: String,
    pub endpoint: String,
    pub method: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub request_parameter_count: usize,
    pub response_parameter_count: usize,
}
