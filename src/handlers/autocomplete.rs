use axum::Json;
use tracing::debug;

use crate::models::{AutocompleteRequest, AutocompleteResponse};
use crate::services::autocomplete_service;

/// Suggest an inline completion for the code before the cursor
pub async fn autocomplete(Json(request): Json<AutocompleteRequest>) -> Json<AutocompleteResponse> {
    let suggestion = autocomplete_service::suggest(&request.code, request.cursor_position);
    debug!(
        "Autocomplete for {} ({} chars, cursor {}): {:?}",
        request.language,
        request.code.len(),
        request.cursor_position,
        suggestion
    );
    Json(AutocompleteResponse {
        suggestion: suggestion.map(str::to_string),
    })
}
