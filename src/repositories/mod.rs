//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Ogni repository SQL gestisce le query di una singola tabella; `SqlStore` li
//! compone dietro i trait `PreviewStore` e `ConversationWriter`.
//! `InMemoryStore` implementa gli stessi trait senza database.

// ************************* NOTA SULLE QUERY ************************* //

/*
   Le query usano sqlx::query_as::<_, T>() + #[derive(sqlx::FromRow)] invece della
   macro query_as!: la macro verifica lo schema in compilazione ma pretende un
   database raggiungibile (o i metadati offline) durante la build, mentre lo schema
   delle tabelle `chat_participants`, `messages`, `profiles` è esterno al progetto.
   Il resto non cambia:
   Number of Rows	Method to Call
   Zero or One	    .fetch_optional(...).await	Extra rows are ignored.
   Exactly One	    .fetch_one(...).await	    Aggregate queries (COUNT) use this.
   Multiple	    .fetch_all(...).await
   Lo schema di riferimento sta in migrations/.
*/

// ************************* MODULI REPOSITORY ************************* //

pub mod membership;
pub mod memory;
pub mod message;
pub mod profile;
pub mod sql;
pub mod traits;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{
    ConversationStore, ConversationWriter, NewConversation, PreviewStore, StoreError,
};

pub use membership::MembershipRepository;
pub use memory::InMemoryStore;
pub use message::MessageRepository;
pub use profile::ProfileRepository;
pub use sql::SqlStore;
