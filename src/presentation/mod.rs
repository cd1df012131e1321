// Presentation layer - HTTP surface the browser shell drives
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    blur, dismiss_alert, focus, get_view, health_check, select_groups, select_rule,
    select_vehicles, set_dates, set_mode, show_heatmap,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/addin/focus", post(focus))
        .route("/addin/blur", post(blur))
        .route("/view", get(get_view))
        .route("/selection/groups", put(select_groups))
        .route("/selection/vehicles", put(select_vehicles))
        .route("/selection/dates", put(set_dates))
        .route("/selection/mode", put(set_mode))
        .route("/selection/rule", put(select_rule))
        .route("/heatmap", post(show_heatmap))
        .route("/alert", delete(dismiss_alert))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::controller::{AddIn, ControllerSettings, HeatmapController, HostState};
    use crate::application::host_api::HostApi;
    use crate::application::host_api::testing::ScriptedHostApi;
    use crate::application::map_renderer::HeatLayerOptions;
    use crate::infrastructure::map_view::{ConfiguredLocation, MapView};
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app() -> Router {
        let api: Arc<dyn HostApi> = Arc::new(ScriptedHostApi::new(|params| {
            match params.type_name.as_str() {
                "Group" => Ok(json!([{"id": "g1", "name": "Depot"}])),
                "Rule" => Ok(json!([{"id": "RuleSpeedingId", "name": "Speeding"}])),
                "Device" => Ok(json!([{"id": "A", "name": "Van A"}, {"id": "B", "name": "Van B"}])),
                "LogRecord" => match params.search_id("deviceSearch") {
                    Some("A") => Ok(json!([{"latitude": 43.4, "longitude": -79.7}])),
                    _ => Ok(json!([{"latitude": 0.0, "longitude": 0.0}])),
                },
                _ => Ok(json!([])),
            }
        }));
        let controller = HeatmapController::new(
            api.clone(),
            MapView::new(HeatLayerOptions::default()),
            Arc::new(ConfiguredLocation::default()),
            ControllerSettings::default(),
        );
        controller
            .initialize(api.clone(), &HostState::default(), Box::new(|| {}))
            .await;
        build_router(Arc::new(AppState { controller, api }))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app().await;
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_heatmap_flow_over_http() {
        let app = app().await;

        let (status, page) = send(&app, Method::POST, "/addin/focus", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["vehicles"].as_array().unwrap().len(), 2);
        assert_eq!(page["rules"][0]["label"], "Select a rule");
        assert_eq!(page["rules"][0]["disabled"], true);

        send(
            &app,
            Method::PUT,
            "/selection/vehicles",
            Some(json!({"vehicle_ids": ["A", "B"]})),
        )
        .await;
        send(
            &app,
            Method::PUT,
            "/selection/dates",
            Some(json!({"from": "2026-10-17T00:00", "to": "2026-10-17T23:59"})),
        )
        .await;

        let (status, page) = send(&app, Method::POST, "/heatmap", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            page["message"]
                .as_str()
                .unwrap()
                .starts_with("Displaying 1 records for 2 vehicles.")
        );
        assert_eq!(page["map"]["heat_layer"]["points"], json!([{"lat": 43.4, "lon": -79.7}]));
        assert_eq!(page["map"]["heat_layer"]["options"]["radius"], 24.0);
    }

    #[tokio::test]
    async fn test_rule_selector_disabled_in_location_mode() {
        let app = app().await;
        send(&app, Method::POST, "/addin/focus", None).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/selection/rule",
            Some(json!({"rule_id": "RuleSpeedingId"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("exception history"));

        let (_, page) = send(
            &app,
            Method::PUT,
            "/selection/mode",
            Some(json!({"mode": "exception_history"})),
        )
        .await;
        assert_eq!(page["rule_selector_enabled"], true);

        let (status, page) = send(
            &app,
            Method::PUT,
            "/selection/rule",
            Some(json!({"rule_id": "RuleSpeedingId"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["selection"]["rule_id"], "RuleSpeedingId");
    }

    #[tokio::test]
    async fn test_show_heatmap_without_vehicles_reports_inline() {
        let app = app().await;
        let (status, page) = send(&app, Method::POST, "/heatmap", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            page["error"],
            "Please select at least one vehicle from the list and try again."
        );
    }
}
