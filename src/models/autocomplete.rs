use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request payload for an inline code suggestion
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteRequest {
    pub code: String,
    pub cursor_position: i64,
    pub language: String,
}

/// Suggested completion, `null` when nothing matches
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq, Eq)]
pub struct AutocompleteResponse {
    pub suggestion: Option<String>,
}
