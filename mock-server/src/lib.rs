//! In-memory stand-in for the catalog backend.
//!
//! Implements the HTTP surface the client consumes, with the same envelope,
//! status codes and validation rules, so client integration tests can run
//! against a real socket.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u32,
    pub name: String,
    #[serde(skip)]
    pub order: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Api {
    pub id: u32,
    pub group_id: u32,
    pub name: String,
    pub endpoint: String,
    pub method: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: i32,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: u32,
    pub api_id: u32,
    pub parent_id: Option<u32>,
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub description: Option<String>,
    pub required: bool,
    pub param_type: String,
    pub order: i32,
}

#[derive(Deserialize)]
pub struct GroupName {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApi {
    #[serde(default)]
    pub group_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateApi {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderEntry {
    pub id: u32,
    pub order: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrders {
    #[serde(default)]
    pub api_orders: Vec<OrderEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrders {
    #[serde(default)]
    pub group_orders: Vec<OrderEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceParameters {
    #[serde(default)]
    pub param_type: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametersFromJson {
    #[serde(default)]
    pub param_type: String,
    #[serde(default)]
    pub json: Value,
}

#[derive(Default)]
pub struct Store {
    groups: BTreeMap<u32, Group>,
    apis: BTreeMap<u32, Api>,
    parameters: BTreeMap<u32, Parameter>,
    next_id: u32,
}

impl Store {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn sorted_groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().collect();
        groups.sort_by_key(|g| (g.order, g.id));
        groups
    }

    fn apis_of(&self, group_id: u32) -> Vec<&Api> {
        let mut apis: Vec<&Api> = self.apis.values().filter(|a| a.group_id == group_id).collect();
        apis.sort_by_key(|a| (a.order, a.id));
        apis
    }

    fn remove_parameters(&mut self, api_id: u32, param_type: Option<&str>) {
        self.parameters
            .retain(|_, p| p.api_id != api_id || param_type.is_some_and(|t| p.param_type != t));
    }

    fn insert_parameter(&mut self, mut param: Parameter) -> u32 {
        let id = self.next_id();
        param.id = id;
        self.parameters.insert(id, param);
        id
    }
}

pub type Db = Arc<RwLock<Store>>;

/// `{success: false, error}` with the given status.
pub struct Failure(StatusCode, &'static str);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({"success": false, "error": self.1}))).into_response()
    }
}

type Reply = Result<Json<Value>, Failure>;

fn success(data: impl Serialize) -> Reply {
    let data = serde_json::to_value(data)
        .map_err(|_| Failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode response"))?;
    Ok(Json(if data.is_null() {
        json!({"success": true})
    } else {
        json!({"success": true, "data": data})
    }))
}

/// Path ids that do not parse as integers get the envelope, not axum's
/// plain-text rejection.
fn id_of(path: Result<Path<u32>, PathRejection>, message: &'static str) -> Result<u32, Failure> {
    path.map(|Path(id)| id).map_err(|_| bad_request(message))
}

fn body_of<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Failure> {
    body.map(|Json(input)| input)
        .map_err(|_| bad_request("Invalid request body"))
}

fn bad_request(message: &'static str) -> Failure {
    Failure(StatusCode::BAD_REQUEST, message)
}

fn not_found(message: &'static str) -> Failure {
    Failure(StatusCode::NOT_FOUND, message)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn valid_param_type(param_type: &str) -> bool {
    param_type == "request" || param_type == "response"
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/with-apis", get(list_groups_with_apis))
        .route("/api/groups/orders", post(update_group_orders))
        .route("/api/groups/{id}", patch(rename_group).delete(delete_group))
        .route("/api/apis", post(create_api))
        .route("/api/apis/orders", post(update_api_orders))
        .route("/api/apis/{id}", get(get_api).patch(update_api).delete(delete_api))
        .route("/api/apis/{id}/parameters", put(replace_parameters))
        .route("/api/apis/{id}/parameters/from-json", post(parameters_from_json))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock catalog backend listening");
    }
    axum::serve(listener, app()).await
}

// -- groups ------------------------------------------------------------------

async fn list_groups(State(db): State<Db>) -> Reply {
    let store = db.read().await;
    let groups: Vec<Value> = store
        .sorted_groups()
        .into_iter()
        .map(|g| json!({"id": g.id, "name": g.name, "createdAt": g.created_at, "updatedAt": g.updated_at}))
        .collect();
    success(groups)
}

async fn list_groups_with_apis(State(db): State<Db>) -> Reply {
    let store = db.read().await;
    let groups: Vec<Value> = store
        .sorted_groups()
        .into_iter()
        .map(|g| {
            json!({
                "id": g.id,
                "name": g.name,
                "apis": store.apis_of(g.id),
                "createdAt": g.created_at,
                "updatedAt": g.updated_at,
            })
        })
        .collect();
    success(groups)
}

async fn create_group(State(db): State<Db>, body: Result<Json<GroupName>, JsonRejection>) -> Reply {
    let input = body_of(body)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(bad_request("Group name is required"));
    }
    let mut store = db.write().await;
    if store.groups.values().any(|g| g.name == name) {
        return Err(bad_request("Group name already exists"));
    }
    let order = store.groups.values().map(|g| g.order).max().unwrap_or(0) + 1;
    let id = store.next_id();
    let timestamp = now();
    let group = Group {
        id,
        name: name.to_string(),
        order,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    store.groups.insert(id, group.clone());
    success(group)
}

async fn rename_group(
    State(db): State<Db>,
    path: Result<Path<u32>, PathRejection>,
    body: Result<Json<GroupName>, JsonRejection>,
) -> Reply {
    let id = id_of(path, "Invalid group ID")?;
    let input = body_of(body)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(bad_request("Group name is required"));
    }
    let mut store = db.write().await;
    if store.groups.values().any(|g| g.name == name && g.id != id) {
        return Err(bad_request("Group name already exists"));
    }
    let group = store.groups.get_mut(&id).ok_or_else(|| not_found("Group not found"))?;
    group.name = name.to_string();
    group.updated_at = now();
    success(group.clone())
}

async fn delete_group(State(db): State<Db>, path: Result<Path<u32>, PathRejection>) -> Reply {
    let id = id_of(path, "Invalid group ID")?;
    let mut store = db.write().await;
    if store.groups.remove(&id).is_none() {
        return Err(not_found("Group not found"));
    }
    let api_ids: Vec<u32> = store.apis.values().filter(|a| a.group_id == id).map(|a| a.id).collect();
    for api_id in api_ids {
        store.apis.remove(&api_id);
        store.remove_parameters(api_id, None);
    }
    success(())
}

async fn update_group_orders(
    State(db): State<Db>,
    body: Result<Json<GroupOrders>, JsonRejection>,
) -> Reply {
    let input = body_of(body)?;
    let mut store = db.write().await;
    for entry in input.group_orders {
        if let Some(group) = store.groups.get_mut(&entry.id) {
            group.order = entry.order;
        }
    }
    success(())
}

// -- apis --------------------------------------------------------------------

async fn get_api(State(db): State<Db>, path: Result<Path<u32>, PathRejection>) -> Reply {
    let id = id_of(path, "Invalid API ID")?;
    let store = db.read().await;
    let api = store.apis.get(&id).ok_or_else(|| not_found("API not found"))?;
    let mut parameters: Vec<&Parameter> = store.parameters.values().filter(|p| p.api_id == id).collect();
    parameters.sort_by_key(|p| (p.order, p.id));

    let mut data = serde_json::to_value(api)
        .map_err(|_| Failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch API"))?;
    if let Value::Object(fields) = &mut data {
        fields.insert("group".to_string(), json!(store.groups.get(&api.group_id)));
        fields.insert("parameters".to_string(), json!(parameters));
    }
    success(data)
}

async fn create_api(State(db): State<Db>, body: Result<Json<CreateApi>, JsonRejection>) -> Reply {
    let input = body_of(body)?;
    if input.group_id == 0 || input.name.is_empty() || input.endpoint.is_empty() || input.kind.is_empty() {
        return Err(bad_request("Missing required fields"));
    }
    if input.kind == "HTTP" && input.method.is_empty() {
        return Err(bad_request("Method is required for HTTP APIs"));
    }
    let mut store = db.write().await;
    if !store.groups.contains_key(&input.group_id) {
        return Err(bad_request("Group does not exist"));
    }
    let order = store.apis_of(input.group_id).iter().map(|a| a.order).max().unwrap_or(0) + 1;
    let id = store.next_id();
    let timestamp = now();
    let api = Api {
        id,
        group_id: input.group_id,
        name: input.name,
        endpoint: input.endpoint,
        method: input.method,
        kind: input.kind,
        order,
        note: input.note,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    store.apis.insert(id, api.clone());
    success(api)
}

async fn update_api(
    State(db): State<Db>,
    path: Result<Path<u32>, PathRejection>,
    body: Result<Json<UpdateApi>, JsonRejection>,
) -> Reply {
    let id = id_of(path, "Invalid API ID")?;
    let input = body_of(body)?;
    let mut store = db.write().await;
    let api = store.apis.get_mut(&id).ok_or_else(|| not_found("API not found"))?;
    if let Some(name) = input.name {
        api.name = name;
    }
    if let Some(endpoint) = input.endpoint {
        api.endpoint = endpoint;
    }
    if let Some(method) = input.method {
        api.method = method;
    }
    if let Some(kind) = input.kind {
        api.kind = kind;
    }
    if input.note.is_some() {
        api.note = input.note;
    }
    api.updated_at = now();
    success(api.clone())
}

async fn delete_api(State(db): State<Db>, path: Result<Path<u32>, PathRejection>) -> Reply {
    let id = id_of(path, "Invalid API ID")?;
    let mut store = db.write().await;
    if store.apis.remove(&id).is_none() {
        return Err(not_found("API not found"));
    }
    store.remove_parameters(id, None);
    success(())
}

async fn update_api_orders(
    State(db): State<Db>,
    body: Result<Json<ApiOrders>, JsonRejection>,
) -> Reply {
    let input = body_of(body)?;
    let mut store = db.write().await;
    for entry in input.api_orders {
        if let Some(api) = store.apis.get_mut(&entry.id) {
            api.order = entry.order;
        }
    }
    success(())
}

// -- parameters --------------------------------------------------------------

async fn replace_parameters(
    State(db): State<Db>,
    path: Result<Path<u32>, PathRejection>,
    body: Result<Json<ReplaceParameters>, JsonRejection>,
) -> Reply {
    let id = id_of(path, "Invalid API ID")?;
    let input = body_of(body)?;
    if !valid_param_type(&input.param_type) {
        return Err(bad_request("Invalid paramType"));
    }
    let mut store = db.write().await;
    if !store.apis.contains_key(&id) {
        return Err(not_found("API not found"));
    }
    store.remove_parameters(id, Some(&input.param_type));

    // Depth-first insertion with one running order counter; items that are
    // not objects are skipped.
    let mut order = 0;
    let mut count = 0;
    let mut pending: Vec<(Option<u32>, Value)> = input.parameters.into_iter().rev().map(|p| (None, p)).collect();
    while let Some((parent_id, item)) = pending.pop() {
        let Value::Object(fields) = item else { continue };
        let text = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or("").to_string();
        let description = text("description");
        let param_id = store.insert_parameter(Parameter {
            id: 0,
            api_id: id,
            parent_id,
            name: text("name"),
            value_type: text("type"),
            description: (!description.is_empty()).then_some(description),
            required: fields.get("required").and_then(Value::as_bool).unwrap_or(false),
            param_type: input.param_type.clone(),
            order,
        });
        order += 1;
        count += 1;
        if let Some(Value::Array(children)) = fields.get("children") {
            pending.extend(children.iter().rev().map(|c| (Some(param_id), c.clone())));
        }
    }

    success(json!({"count": count}))
}

async fn parameters_from_json(
    State(db): State<Db>,
    path: Result<Path<u32>, PathRejection>,
    body: Result<Json<ParametersFromJson>, JsonRejection>,
) -> Reply {
    let id = id_of(path, "Invalid API ID")?;
    let input = body_of(body)?;
    if !valid_param_type(&input.param_type) {
        return Err(bad_request("Invalid paramType. Must be 'request' or 'response'"));
    }
    let Value::Object(document) = input.json else {
        return Err(bad_request("Invalid json object"));
    };
    let mut store = db.write().await;
    if !store.apis.contains_key(&id) {
        return Err(not_found("API not found"));
    }

    // Required flags and descriptions survive a re-import by name.
    let existing: BTreeMap<String, (bool, Option<String>)> = store
        .parameters
        .values()
        .filter(|p| p.api_id == id && p.param_type == input.param_type)
        .map(|p| (p.name.clone(), (p.required, p.description.clone())))
        .collect();
    store.remove_parameters(id, Some(&input.param_type));

    let top_level = document.len();
    let mut order = 0;
    let mut pending: Vec<(Option<u32>, String, Value)> =
        document.into_iter().rev().map(|(key, value)| (None, key, value)).collect();
    while let Some((parent_id, key, value)) = pending.pop() {
        let (value_type, children) = describe_value(value);
        let (required, description) = existing.get(&key).cloned().unwrap_or((false, None));
        let param_id = store.insert_parameter(Parameter {
            id: 0,
            api_id: id,
            parent_id,
            name: key,
            value_type: value_type.to_string(),
            description,
            required,
            param_type: input.param_type.clone(),
            order,
        });
        order += 1;
        if let Some(children) = children {
            pending.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|(key, value)| (Some(param_id), key, value)),
            );
        }
    }

    success(json!({"parameterCount": top_level}))
}

/// Parameter type for a JSON value plus the object whose keys become its
/// children. Arrays take their children from the first element.
fn describe_value(value: Value) -> (&'static str, Option<Map<String, Value>>) {
    match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(first)) => ("array", Some(first)),
            _ => ("array", None),
        },
        Value::Object(fields) => ("object", Some(fields)),
        Value::Number(_) => ("number", None),
        Value::Bool(_) => ("boolean", None),
        Value::String(_) | Value::Null => ("string", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_serializes_without_order() {
        let group = Group {
            id: 1,
            name: "Users".to_string(),
            order: 4,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["name"], "Users");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert!(json.get("order").is_none());
    }

    #[test]
    fn describe_value_maps_json_types() {
        assert_eq!(describe_value(json!("x")).0, "string");
        assert_eq!(describe_value(json!(1.5)).0, "number");
        assert_eq!(describe_value(json!(true)).0, "boolean");
        assert_eq!(describe_value(Value::Null).0, "string");
        assert_eq!(describe_value(json!([])), ("array", None));
        assert_eq!(describe_value(json!([1, 2])), ("array", None));

        let (kind, children) = describe_value(json!([{"id": 1}]));
        assert_eq!(kind, "array");
        assert!(children.unwrap().contains_key("id"));
    }

    #[test]
    fn create_api_fields_default_when_missing() {
        let input: CreateApi = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(input.group_id, 0);
        assert!(input.endpoint.is_empty());
        assert!(input.note.is_none());
    }

    #[test]
    fn update_api_all_fields_optional() {
        let input: UpdateApi = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.kind.is_none());
    }

    #[test]
    fn store_removes_only_matching_category() {
        let mut store = Store::default();
        for (api_id, param_type) in [(1, "request"), (1, "response"), (2, "request")] {
            store.insert_parameter(Parameter {
                id: 0,
                api_id,
                parent_id: None,
                name: "p".to_string(),
                value_type: "string".to_string(),
                description: None,
                required: false,
                param_type: param_type.to_string(),
                order: 0,
            });
        }
        store.remove_parameters(1, Some("request"));
        let left: Vec<(u32, &str)> = store
            .parameters
            .values()
            .map(|p| (p.api_id, p.param_type.as_str()))
            .collect();
        assert_eq!(left, vec![(1, "response"), (2, "request")]);
    }
}
