use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

use crate::models::{CreateRoomResponse, ErrorResponse};
use crate::state::AppState;

/// Create a new room. Any request body is ignored.
pub async fn create_room(
    State(state): State<AppState>,
) -> Result<Json<CreateRoomResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.directory.create().await {
        Ok(room_id) => {
            info!("Room '{}' created", room_id);
            Ok(Json(CreateRoomResponse { room_id }))
        }
        Err(e) => {
            error!("Failed to create room: {}", e);
            Err(ErrorResponse::reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create room: {}", e),
            ))
        }
    }
}
