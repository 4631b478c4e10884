//! Verify client behavior against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outputs. Comparing parsed
//! JSON (not raw strings) avoids false negatives from field ordering.

use catalog_core::{
    build_parameter_trees, ApiResult, CatalogClient, CreateApi, HttpMethod, HttpRequest,
    HttpResponse, OrderEntry, ParamCategory, Parameter, ParameterCount, ParameterNode,
    ParameterSpec, ParametersFromJson, UpdateApi, ValueType,
};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000";

fn client() -> CatalogClient {
    CatalogClient::with_base_url(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

/// Fill the fields the tree vectors leave out.
fn parameter(record: &Value) -> Parameter {
    let mut full = json!({
        "apiId": 1,
        "name": format!("p{}", record["id"]),
        "type": "string",
        "required": false,
        "description": null,
        "order": 0
    });
    for (key, value) in record.as_object().unwrap() {
        full[key] = value.clone();
    }
    serde_json::from_value(full).unwrap()
}

/// Reduce a forest to `{id, children}` for comparison with the vectors.
fn shape(nodes: &[ParameterNode]) -> Value {
    Value::Array(
        nodes
            .iter()
            .map(|n| json!({"id": n.parameter.id, "children": shape(&n.children)}))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tree assembly
// ---------------------------------------------------------------------------

#[test]
fn tree_test_vectors() {
    let raw = include_str!("../../test-vectors/tree.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: Vec<Parameter> = case["input"].as_array().unwrap().iter().map(parameter).collect();

        let trees = build_parameter_trees(&input);
        assert_eq!(shape(&trees.request.roots), case["expected_request"], "{name}: request tree");
        assert_eq!(shape(&trees.response.roots), case["expected_response"], "{name}: response tree");

        let detached: Vec<Value> = trees
            .detached()
            .map(|d| {
                let mut entry = serde_json::to_value(&d.reason).unwrap();
                entry["id"] = json!(d.parameter.id);
                entry
            })
            .collect();
        assert_eq!(Value::Array(detached), case["expected_detached"], "{name}: detached");

        let excluded = input
            .iter()
            .filter(|p| p.param_type == ParamCategory::Unknown)
            .count();
        assert_eq!(trees.excluded.len(), excluded, "{name}: excluded");

        // Same input, same trees.
        assert_eq!(build_parameter_trees(&input), trees, "{name}: idempotence");
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

fn build(operation: &str) -> HttpRequest {
    let c = client();
    match operation {
        "groups_with_apis" => c.build_groups_with_apis(),
        "list_groups" => c.build_list_groups(),
        "create_group" => c.build_create_group("Users").unwrap(),
        "rename_group" => c.build_rename_group(3, "Users").unwrap(),
        "delete_group" => c.build_delete_group(3),
        "get_api" => c.build_get_api(5),
        "create_api" => c
            .build_create_api(&CreateApi {
                name: "Get user".to_string(),
                group_id: 3,
                method: Some("GET".to_string()),
                endpoint: "/users/:id".to_string(),
                kind: "HTTP".to_string(),
                note: None,
            })
            .unwrap(),
        "update_api" => c
            .build_update_api(
                5,
                &UpdateApi {
                    endpoint: Some("/users/{id}".to_string()),
                    ..UpdateApi::default()
                },
            )
            .unwrap(),
        "delete_api" => c.build_delete_api(5),
        "reorder_apis" => c.build_reorder_apis(&[OrderEntry { id: 5, order: 0 }]).unwrap(),
        "reorder_groups" => c.build_reorder_groups(&[OrderEntry { id: 3, order: 0 }]).unwrap(),
        "replace_parameters" => c
            .build_replace_parameters(
                5,
                ParamCategory::Request,
                &[ParameterSpec::new("id", ValueType::Number).required()],
            )
            .unwrap(),
        "import_parameters_from_json" => c
            .build_import_parameters_from_json(
                5,
                &ParametersFromJson {
                    param_type: ParamCategory::Response,
                    json: json!({"ok": true}).as_object().unwrap().clone(),
                },
            )
            .unwrap(),
        other => panic!("unknown operation: {other}"),
    }
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["operation"].as_str().unwrap();
        let expected = &case["expected_request"];
        let req = build(name);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");

        match req.body.as_deref() {
            Some(body) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
                assert_eq!(
                    req.headers,
                    vec![("content-type".to_string(), "application/json".to_string())],
                    "{name}: headers"
                );
            }
            None => {
                assert!(expected["body"].is_null(), "{name}: body should be present");
                assert!(req.headers.is_empty(), "{name}: headers");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response normalization
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );

        let result: ApiResult<ParameterCount> = c.parse_data(response).into();
        let actual = serde_json::to_value(&result).unwrap();
        assert_eq!(actual, case["expected_result"], "{name}: result");
    }
}
