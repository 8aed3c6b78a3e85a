//! Live Module - Feed in tempo reale delle anteprime via WebSocket
//!
//! Questo modulo mantiene aggiornata la lista di anteprime dei client connessi:
//! - Gestione upgrade HTTP -> WebSocket
//! - Canali broadcast delle modifiche per conversazione (`ChangeFeed`)
//! - Segnali interni verso i feed degli utenti online (`UserSignals`)
//! - Stato locale della lista con scarto dei caricamenti superati (`PreviewList`)

pub mod connection;
pub mod feed;
pub mod preview_list;
pub mod signals;

// Re-exports pubblici
pub use connection::{handle_socket, run_preview_feed};
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, FEED_CHANNEL_CAPACITY};
pub use preview_list::{LoadTicket, PreviewList};
pub use signals::{LiveSignal, UserSignals};

use crate::core::{AppState, CurrentSession};
use crate::repositories::ConversationStore;
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Entry point per le richieste di upgrade WebSocket.
/// La sessione è opzionale: senza sessione il client riceve una lista vuota e la connessione viene chiusa.
pub async fn ws_handler<S: ConversationStore>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session))
}
