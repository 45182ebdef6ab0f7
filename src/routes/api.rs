use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::handlers::{autocomplete, create_room, diagnostics, health_check, ready_check};
use crate::state::AppState;
use crate::websocket::websocket_handler;

/// Create API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
}

/// Assemble the full application router
pub fn create_app(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/autocomplete", post(autocomplete))
        .route("/ws/:room_id", get(websocket_handler))
        .nest("/api", create_api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config.cors_origin_list() {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRoomDirectory;
    use crate::models::{AutocompleteResponse, CreateRoomResponse};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let config = Config::default();
        let state = AppState::new(&config, Arc::new(MemoryRoomDirectory::default())).unwrap();
        (create_app(state.clone(), &config), state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_room_registers_in_directory() {
        let (app, state) = app();
        let response = app
            .oneshot(Request::post("/rooms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let created: CreateRoomResponse = body_json(response).await;
        assert!(state.directory.exists(&created.room_id).await.unwrap());
        // Creating a room does not start it
        assert!(!state.manager.store().contains(&created.room_id));
    }

    #[tokio::test]
    async fn autocomplete_returns_null_without_match() {
        let (app, _) = app();
        let request = Request::post("/autocomplete")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"x = 1","cursorPosition":5,"language":"python"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: AutocompleteResponse = body_json(response).await;
        assert_eq!(body, AutocompleteResponse { suggestion: None });
    }

    #[tokio::test]
    async fn autocomplete_suggests_after_keyword() {
        let (app, _) = app();
        let request = Request::post("/autocomplete")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"def","cursorPosition":3,"language":"python"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body: AutocompleteResponse = body_json(response).await;
        assert_eq!(body.suggestion.as_deref(), Some(" my_function():\n    pass"));
    }

    #[tokio::test]
    async fn websocket_route_rejects_plain_requests() {
        let (app, state) = app();
        let room_id = state.directory.create().await.unwrap();
        let response = app
            .oneshot(Request::get(format!("/ws/{room_id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(!state.manager.store().contains(&room_id));
    }

    #[tokio::test]
    async fn health_and_ready() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
