use crate::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Application identity returned by the index route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppInfo {
    pub version: String,
    pub description: String,
}

impl AppInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            description: "Blocks API".into(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Application version and description", body = AppInfo)
    )
)]
/// Index endpoint
///
/// Returns the running version of the service; also serves as a liveness probe.
#[axum::debug_handler]
pub async fn home(State(state): State<AppState>) -> Json<AppInfo> {
    Json(state.app.as_ref().clone())
}
