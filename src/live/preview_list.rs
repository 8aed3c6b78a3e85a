//! PreviewList - Stato locale del feed di una connessione
//!
//! Ogni caricamento prende un `LoadTicket`. Un risultato viene applicato solo se
//! il suo ticket è l'ultimo emesso e la lista non è stata chiusa: i caricamenti
//! superati da uno più recente, o che terminano dopo la chiusura della
//! connessione, vengono scartati.

use crate::entities::ConversationPreview;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Default)]
pub struct PreviewList {
    previews: Vec<ConversationPreview>,
    loading: bool,
    issued: u64,
    closed: bool,
}

impl PreviewList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        self.loading = true;
        LoadTicket(self.issued)
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        if self.closed {
            debug!("Preview list closed, discarding load result");
            return false;
        }
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                latest = self.issued,
                "Stale load result discarded"
            );
            return false;
        }
        true
    }

    /// Applica il risultato di un caricamento; `false` se è stato scartato
    pub fn commit(&mut self, ticket: LoadTicket, previews: Vec<ConversationPreview>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.previews = previews;
        self.loading = false;
        true
    }

    /// Registra un caricamento fallito: la lista resta vuota
    pub fn fail(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.previews.clear();
        self.loading = false;
        true
    }

    /// Chiusura della connessione: nessun risultato verrà più applicato
    pub fn close(&mut self) {
        self.closed = true;
        self.previews.clear();
        self.loading = false;
    }

    pub fn previews(&self) -> &[ConversationPreview] {
        &self.previews
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
