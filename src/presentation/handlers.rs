// HTTP request handlers
use crate::application::controller::{AddIn, HostState, ViewSnapshot};
use crate::domain::selection::{DateRange, SelectionError, VisualizationMode};
use crate::infrastructure::map_view::MapView;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the browser shell needs to draw the page.
#[derive(Serialize)]
pub struct PageResponse {
    #[serde(flatten)]
    pub view: ViewSnapshot,
    pub map: MapView,
}

fn page(state: &AppState) -> Json<PageResponse> {
    Json(PageResponse {
        view: state.controller.view(),
        map: state.controller.map_snapshot(),
    })
}

#[derive(Deserialize)]
pub struct GroupSelection {
    #[serde(default)]
    pub group_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct VehicleSelection {
    #[serde(default)]
    pub vehicle_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct ModeSelection {
    pub mode: VisualizationMode,
}

#[derive(Deserialize)]
pub struct RuleSelection {
    pub rule_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for SelectionError {
    fn into_response(self) -> Response {
        let status = match self {
            SelectionError::RuleSelectorDisabled => StatusCode::CONFLICT,
            SelectionError::InvalidDate(_) | SelectionError::UnknownRule(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Host `focus` hook
pub async fn focus(
    State(state): State<Arc<AppState>>,
    host_state: Option<Json<HostState>>,
) -> Json<PageResponse> {
    let host_state = host_state.map(|Json(s)| s).unwrap_or_default();
    state.controller.focus(state.api.clone(), &host_state).await;
    page(&state)
}

/// Host `blur` hook
pub async fn blur(State(state): State<Arc<AppState>>) -> StatusCode {
    state.controller.blur();
    StatusCode::NO_CONTENT
}

pub async fn get_view(State(state): State<Arc<AppState>>) -> Json<PageResponse> {
    page(&state)
}

pub async fn select_groups(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GroupSelection>,
) -> Json<PageResponse> {
    state.controller.select_groups(body.group_ids).await;
    page(&state)
}

pub async fn select_vehicles(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VehicleSelection>,
) -> Json<PageResponse> {
    state.controller.select_vehicles(body.vehicle_ids);
    page(&state)
}

pub async fn set_dates(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DateRange>,
) -> Json<PageResponse> {
    state.controller.set_dates(body);
    page(&state)
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ModeSelection>,
) -> Json<PageResponse> {
    state.controller.set_mode(body.mode);
    page(&state)
}

pub async fn select_rule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RuleSelection>,
) -> Result<Json<PageResponse>, SelectionError> {
    state.controller.select_rule(body.rule_id)?;
    Ok(page(&state))
}

/// Run the aggregation for the current selection. Failures are reported in
/// the page (`error` / `alert`), not as HTTP errors.
pub async fn show_heatmap(State(state): State<Arc<AppState>>) -> Json<PageResponse> {
    state.controller.show_heatmap().await;
    page(&state)
}

pub async fn dismiss_alert(State(state): State<Arc<AppState>>) -> Json<PageResponse> {
    state.controller.dismiss_alert();
    page(&state)
}
