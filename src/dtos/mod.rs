//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod conversation;
pub mod message;
pub mod preview;
pub mod ws_event;

// Re-exports per facilitare l'import
pub use conversation::{ConversationDTO, MarkReadDTO, StartConversationDTO};
pub use message::{MessageDTO, SendMessageDTO};
pub use preview::{ConversationPreviewDTO, format_message_time};
pub use ws_event::WsEventDTO;
