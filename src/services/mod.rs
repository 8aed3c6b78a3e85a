//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod conversation;
pub mod previews;

// Re-exports per facilitare l'import
pub use conversation::{mark_conversation_read, send_message, start_conversation};
pub use previews::list_previews;

use crate::core::AppState;
use crate::repositories::ConversationStore;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root<S: ConversationStore>(State(_state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
