use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, ListShape, MockOptions};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn sensor(id: &str) -> String {
    json!({
        "thingId": id,
        "policyId": format!("{id}:policy"),
        "attributes": {"name": "Boiler temp", "type": "Sensor", "status": "active", "tags": []},
        "features": {}
    })
    .to_string()
}

// --- list ---

#[tokio::test]
async fn list_things_empty() {
    let resp = app().oneshot(empty_request("GET", "/mongodb/things")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"things": []}));
}

#[tokio::test]
async fn list_shape_is_switchable() {
    for (shape, expected) in [
        (ListShape::Items, json!({"items": []})),
        (ListShape::Bare, json!([])),
        (ListShape::Unrecognized, json!({})),
    ] {
        let options = MockOptions {
            list_shape: shape,
            ..Default::default()
        };
        let resp = app_with(options)
            .oneshot(empty_request("GET", "/mongodb/things"))
            .await
            .unwrap();
        let body: Value = body_json(resp).await;
        assert_eq!(body, expected, "{shape:?}");
    }
}

#[tokio::test]
async fn failure_mode_answers_every_route() {
    let options = MockOptions {
        fail_with: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..Default::default()
    };
    for (method, uri) in [("GET", "/mongodb/things"), ("DELETE", "/mongodb/things/x"), ("GET", "/anything")] {
        let resp = app_with(options).oneshot(empty_request(method, uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
    }
}

// --- create ---

#[tokio::test]
async fn create_thing_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/mongodb/things", &sensor("Sensor:1")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["thingId"], "Sensor:1");
    assert_eq!(body["attributes"]["name"], "Boiler temp");
}

#[tokio::test]
async fn create_thing_without_id_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/mongodb/things", r#"{"attributes":{}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_thing_malformed_json_is_rejected() {
    let resp = app()
        .oneshot(json_request("POST", "/mongodb/things", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- get / update / delete on missing ids ---

#[tokio::test]
async fn get_thing_not_found() {
    let resp = app()
        .oneshot(empty_request("GET", "/mongodb/things/Sensor:0"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_thing_not_found() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/mongodb/things/Sensor:0",
            r#"{"attributes":{"status":"error"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_thing_not_found() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/mongodb/things/Sensor:0"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/mongodb/things", &sensor("Sensor:7")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // duplicate id is a conflict
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/mongodb/things", &sensor("Sensor:7")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // list contains the one thing
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/mongodb/things"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["things"].as_array().unwrap().len(), 1);
    assert_eq!(body["things"][0]["thingId"], "Sensor:7");

    // update: only status changes, name stays
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            "/mongodb/things/Sensor:7",
            r#"{"attributes":{"status":"maintenance"},"features":{"temp":{"properties":{"value":21.5}}}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = body_json(resp).await;
    assert_eq!(updated["attributes"]["status"], "maintenance");
    assert_eq!(updated["attributes"]["name"], "Boiler temp");
    assert_eq!(updated["features"]["temp"]["properties"]["value"], 21.5);

    // get reflects the update
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/mongodb/things/Sensor:7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = body_json(resp).await;
    assert_eq!(fetched, updated);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/mongodb/things/Sensor:7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/mongodb/things/Sensor:7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
