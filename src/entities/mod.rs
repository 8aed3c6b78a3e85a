//! Entities module - Entità del dominio applicativo
//!
//! Membership, Profile e Message corrispondono alle tabelle `chat_participants`,
//! `profiles` e `messages`. Session e ConversationPreview vivono solo in memoria.

pub mod membership;
pub mod message;
pub mod preview;
pub mod profile;
pub mod session;

// Re-exports per facilitare l'import
pub use membership::Membership;
pub use message::Message;
pub use preview::{ConversationPreview, UNKNOWN_DISPLAY_NAME};
pub use profile::Profile;
pub use session::Session;
