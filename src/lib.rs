//! Conversation previews server - espone i moduli principali per i test

pub mod assembler;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod live;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use assembler::{AssemblerOptions, ConversationListAssembler, DataFetchError, PreviewLoad};
pub use crate::core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use repositories::ConversationStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Crea il router principale dell'applicazione
pub fn create_router<S: ConversationStore>(state: Arc<AppState<S>>) -> Router {
    use crate::core::session_middleware;
    use live::ws_handler;

    Router::new()
        .route("/", get(root::<S>))
        .nest("/conversations", configure_conversation_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler::<S>).layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware::<S>,
            )),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Configura le routes delle conversazioni: la lista accetta una sessione assente,
/// le operazioni di scrittura richiedono autenticazione
fn configure_conversation_routes<S: ConversationStore>(
    state: Arc<AppState<S>>,
) -> Router<Arc<AppState<S>>> {
    use crate::core::{authentication_middleware, session_middleware};
    use services::*;

    let list = get(list_previews::<S>).layer(middleware::from_fn_with_state(
        state.clone(),
        session_middleware::<S>,
    ));
    let start = post(start_conversation::<S>).layer(middleware::from_fn_with_state(
        state.clone(),
        authentication_middleware::<S>,
    ));

    // Rotte che richiedono autenticazione
    let write_routes = Router::new()
        .route("/{conversation_id}/messages", post(send_message::<S>))
        .route("/{conversation_id}/read", post(mark_conversation_read::<S>))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware::<S>,
        ));

    Router::new().route("/", list.merge(start)).merge(write_routes)
}
