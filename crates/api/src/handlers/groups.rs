//! Handlers for the `/groups` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use intools_core::Group;

use crate::error::AppResult;
use crate::query::IncludeConnectorsParams;
use crate::state::AppState;

/// GET /groups
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<IncludeConnectorsParams>,
) -> AppResult<Json<Vec<Group>>> {
    let groups = state.registry.list_groups(params.connectors).await?;
    Ok(Json(groups))
}

/// GET /groups/{group}
pub async fn get_by_name(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Query(params): Query<IncludeConnectorsParams>,
) -> AppResult<Json<Group>> {
    let group = state.registry.get_group(&group, params.connectors).await?;
    Ok(Json(group))
}

/// POST /groups/{group}
///
/// `201 Created` for a new group, `200 OK` when it already existed.
pub async fn create(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let created = state.registry.create_group(&group).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(Group::new(group))))
}

/// DELETE /groups/{group}
///
/// Unschedules and purges every connector of the group.
pub async fn delete(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> AppResult<StatusCode> {
    state.registry.delete_group(&group).await?;
    Ok(StatusCode::NO_CONTENT)
}
