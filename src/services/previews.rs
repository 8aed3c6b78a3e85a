//! Preview services - Lista anteprime delle conversazioni

use crate::core::{AppError, AppState, CurrentSession};
use crate::dtos::ConversationPreviewDTO;
use crate::repositories::ConversationStore;
use axum::{
    Extension,
    extract::{Json, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Caricamento singolo delle anteprime. Senza sessione la risposta è una lista vuota;
/// se le membership non si possono leggere la risposta è `503`.
#[instrument(skip(state, session), fields(user_id = session.as_ref().map(|s| s.user_id)))]
pub async fn list_previews<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<Json<Vec<ConversationPreviewDTO>>, AppError> {
    debug!("Listing conversation previews");
    let previews = state.assembler.load_previews(session.as_ref()).await?;

    info!("Returning {} previews", previews.len());
    Ok(Json(ConversationPreviewDTO::from_previews(previews)))
}
