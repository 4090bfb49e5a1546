//! Handlers for `/groups/{group}/connectors`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use intools_core::{Connector, Executor};

use crate::error::AppResult;
use crate::state::AppState;

/// GET /groups/{group}/connectors
pub async fn list(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> AppResult<Json<Vec<Connector>>> {
    let connectors = state.registry.list_connectors(&group).await?;
    Ok(Json(connectors))
}

/// GET /groups/{group}/connectors/{connector}
pub async fn get_by_name(
    State(state): State<AppState>,
    Path((group, connector)): Path<(String, String)>,
) -> AppResult<Json<Connector>> {
    let connector = state.registry.get_connector(&group, &connector).await?;
    Ok(Json(connector))
}

/// POST /groups/{group}/connectors/{connector}
///
/// The body is a connector definition; its `group` and `name` are taken
/// from the path. The connector is saved, scheduled and run once in the
/// background.
pub async fn register(
    State(state): State<AppState>,
    Path((group, name)): Path<(String, String)>,
    payload: Result<Json<Connector>, JsonRejection>,
) -> AppResult<Json<Connector>> {
    let Json(mut connector) = payload?;
    connector.group = group;
    connector.name = name;

    let connector = state.registry.register_connector(connector).await?;
    Ok(Json(connector))
}

/// DELETE /groups/{group}/connectors/{connector}
pub async fn delete(
    State(state): State<AppState>,
    Path((group, connector)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let connector = state.registry.get_connector(&group, &connector).await?;
    state.registry.remove_connector(&connector).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /groups/{group}/connectors/{connector}/refresh
///
/// Runs the connector now and waits for the record.
pub async fn refresh(
    State(state): State<AppState>,
    Path((group, connector)): Path<(String, String)>,
) -> AppResult<Json<Executor>> {
    let executor = state.registry.execute_now(&group, &connector).await?;
    Ok(Json(executor))
}

/// GET /groups/{group}/connectors/{connector}/exec
pub async fn last_executor(
    State(state): State<AppState>,
    Path((group, connector)): Path<(String, String)>,
) -> AppResult<Json<Executor>> {
    let executor = state.registry.last_executor(&group, &connector).await?;
    Ok(Json(executor))
}

/// GET /groups/{group}/connectors/{connector}/result
pub async fn last_result(
    State(state): State<AppState>,
    Path((group, connector)): Path<(String, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let result = state.registry.last_result(&group, &connector).await?;
    Ok(Json(result))
}
