//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Sessione e JWT
//! - Configurazione
//! - Gestione errori
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    Claims, CurrentSession, authentication_middleware, decode_jwt, encode_jwt, session_middleware,
};
pub use config::{Config, StoreBackend};
pub use error::{AppError, NO_CONVERSATIONS_AVAILABLE};
pub use state::AppState;
