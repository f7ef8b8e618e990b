use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Envelope used for `GET /mongodb/things`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListShape {
    /// `{"things": [...]}`
    #[default]
    Things,
    /// `{"items": [...]}`
    Items,
    /// `[...]`
    Bare,
    /// `{}`: a payload the client does not recognize.
    Unrecognized,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MockOptions {
    pub list_shape: ListShape,
    /// When set, every request is answered with this status.
    pub fail_with: Option<StatusCode>,
}

/// Records in insertion order, stored as raw JSON keyed by `thingId`.
pub type Db = Arc<RwLock<Vec<Value>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    options: MockOptions,
}

pub fn app() -> Router {
    app_with(MockOptions::default())
}

pub fn app_with(options: MockOptions) -> Router {
    app_with_db(options, Db::default())
}

pub fn app_with_db(options: MockOptions, db: Db) -> Router {
    if let Some(status) = options.fail_with {
        return Router::new().fallback(move || async move {
            (status, Json(json!({"error": "backend failure", "status": status.as_u16()})))
        });
    }
    Router::new()
        .route("/mongodb/things", get(list_things).post(create_thing))
        .route(
            "/mongodb/things/{id}",
            get(get_thing).put(update_thing).delete(delete_thing),
        )
        .with_state(AppState { db, options })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, MockOptions::default()).await
}

pub async fn serve(listener: TcpListener, options: MockOptions) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(options)).await
}

fn thing_id(record: &Value) -> Option<&str> {
    record.get("thingId").and_then(Value::as_str)
}

async fn list_things(State(state): State<AppState>) -> Json<Value> {
    let things = state.db.read().await.clone();
    tracing::debug!(count = things.len(), shape = ?state.options.list_shape, "list things");
    Json(match state.options.list_shape {
        ListShape::Things => json!({ "things": things }),
        ListShape::Items => json!({ "items": things }),
        ListShape::Bare => Value::Array(things),
        ListShape::Unrecognized => json!({}),
    })
}

async fn create_thing(State(state): State<AppState>, Json(record): Json<Value>) -> Response {
    let Some(id) = thing_id(&record).map(str::to_owned) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "thingId is required"}))).into_response();
    };
    let mut db = state.db.write().await;
    if db.iter().any(|r| thing_id(r) == Some(id.as_str())) {
        return (StatusCode::CONFLICT, Json(json!({"error": format!("{id} already exists")}))).into_response();
    }
    tracing::debug!(%id, "create thing");
    db.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn get_thing(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let db = state.db.read().await;
    db.iter()
        .find(|r| thing_id(r) == Some(id.as_str()))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Merge `attributes` and `features` from the body into the stored record.
/// Keys absent from the body are left unchanged.
async fn update_thing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut db = state.db.write().await;
    let record = db
        .iter_mut()
        .find(|r| thing_id(r) == Some(id.as_str()))
        .ok_or(StatusCode::NOT_FOUND)?;
    for section in ["attributes", "features"] {
        let Some(Value::Object(changes)) = patch.get(section) else {
            continue;
        };
        let target = record
            .as_object_mut()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(fields) = target {
            for (key, value) in changes {
                fields.insert(key.clone(), value.clone());
            }
        }
    }
    tracing::debug!(%id, "update thing");
    Ok(Json(record.clone()))
}

async fn delete_thing(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    let mut db = state.db.write().await;
    let before = db.len();
    db.retain(|r| thing_id(r) != Some(id.as_str()));
    if db.len() < before {
        tracing::debug!(%id, "delete thing");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
