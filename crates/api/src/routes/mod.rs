pub mod groups;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the public route tree, mounted at the root.
///
/// ```text
/// /websocket                                        WebSocket notifications
///
/// /groups                                           list (?connectors=true)
/// /groups/{group}                                   get, create, delete
/// /groups/{group}/connectors                        list
/// /groups/{group}/connectors/{connector}            get, register, delete
/// /groups/{group}/connectors/{connector}/refresh    run now
/// /groups/{group}/connectors/{connector}/exec       last execution record
/// /groups/{group}/connectors/{connector}/result     last valid result
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/websocket", get(ws::ws_handler))
        .merge(groups::router())
}
