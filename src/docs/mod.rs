use utoipa::OpenApi;
use crate::models::*;

/// Create a room
#[utoipa::path(
    post,
    path = "/rooms",
    responses(
        (status = 200, description = "Room created", body = CreateRoomResponse),
        (status = 500, description = "Room directory failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_room_doc() {}

/// Suggest an inline completion
#[utoipa::path(
    post,
    path = "/autocomplete",
    request_body = AutocompleteRequest,
    responses(
        (status = 200, description = "Suggestion, null when no keyword matches", body = AutocompleteResponse)
    )
)]
#[allow(dead_code)]
pub async fn autocomplete_doc() {}

/// Join a room over WebSocket
///
/// The server sends `{"type":"init","code":...}` once, then relays every frame
/// other members send. Unknown rooms are refused with 403 before the upgrade.
#[utoipa::path(
    get,
    path = "/ws/{room_id}",
    params(("room_id" = String, Path, description = "Room identifier returned by POST /rooms")),
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 403, description = "Room does not exist"),
        (status = 503, description = "Room directory unavailable")
    )
)]
#[allow(dead_code)]
pub async fn websocket_doc() {}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Room directory unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Diagnostics endpoint
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Room and host statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_room_doc,
        autocomplete_doc,
        websocket_doc,
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            CreateRoomResponse,
            AutocompleteRequest,
            AutocompleteResponse,
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "coderoom", description = "Shared code rooms")
    )
)]
pub struct ApiDoc;
