//! Route definitions for the `/groups` resource and its connectors.

use axum::routing::get;
use axum::Router;

use crate::handlers::{connectors, groups};
use crate::state::AppState;

/// Routes for groups and the connectors nested under them.
///
/// ```text
/// GET    /groups                                        -> groups::list
/// GET    /groups/{group}                                -> groups::get_by_name
/// POST   /groups/{group}                                -> groups::create
/// DELETE /groups/{group}                                -> groups::delete
///
/// GET    /groups/{group}/connectors                     -> connectors::list
/// GET    /groups/{group}/connectors/{connector}         -> connectors::get_by_name
/// POST   /groups/{group}/connectors/{connector}         -> connectors::register
/// DELETE /groups/{group}/connectors/{connector}         -> connectors::delete
/// GET    /groups/{group}/connectors/{connector}/refresh -> connectors::refresh
/// GET    /groups/{group}/connectors/{connector}/exec    -> connectors::last_executor
/// GET    /groups/{group}/connectors/{connector}/result  -> connectors::last_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(groups::list))
        .route("/groups/", get(groups::list))
        .route(
            "/groups/{group}",
            get(groups::get_by_name)
                .post(groups::create)
                .delete(groups::delete),
        )
        .route("/groups/{group}/connectors", get(connectors::list))
        .route(
            "/groups/{group}/connectors/{connector}",
            get(connectors::get_by_name)
                .post(connectors::register)
                .delete(connectors::delete),
        )
        .route(
            "/groups/{group}/connectors/{connector}/refresh",
            get(connectors::refresh),
        )
        .route(
            "/groups/{group}/connectors/{connector}/exec",
            get(connectors::last_executor),
        )
        .route(
            "/groups/{group}/connectors/{connector}/result",
            get(connectors::last_result),
        )
}
