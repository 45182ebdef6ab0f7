use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response returned after creating a room
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    pub room_id: String,
}
