use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

/// Segnali interni verso il task che gestisce il feed di un utente
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveSignal {
    Shutdown,
    /// L'utente è entrato in una nuova conversazione: va sottoscritta e la lista ricaricata
    AddConversation(i32),
}

pub struct UserSignals {
    users_online: DashMap<i32, UnboundedSender<LiveSignal>>,
}

impl Default for UserSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl UserSignals {
    pub fn new() -> Self {
        UserSignals {
            users_online: DashMap::new(),
        }
    }

    /// Registra il canale del feed dell'utente; una seconda connessione sostituisce la prima,
    /// il cui canale viene chiuso
    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i32, tx: UnboundedSender<LiveSignal>) {
        info!("Registering user {} as online", user_id);
        self.users_online.insert(user_id, tx);
        info!("Total online users: {}", self.users_online.len());
    }

    /// Rimuove la registrazione solo se appartiene ancora a `tx`, così la chiusura
    /// di una connessione sostituita non scollega quella nuova
    #[instrument(skip(self, tx))]
    pub fn remove_from_online(&self, user_id: &i32, tx: &UnboundedSender<LiveSignal>) {
        if self
            .users_online
            .remove_if(user_id, |_, current| current.same_channel(tx))
            .is_some()
        {
            info!("Removed user from online");
        }
    }

    #[instrument(skip(self))]
    pub fn send_if_online(&self, user_id: &i32, signal: LiveSignal) {
        if let Some(entry) = self.users_online.get(user_id) {
            if let Err(e) = entry.value().send(signal) {
                warn!("Failed to send signal to user: {:?}", e);
            }
        } else {
            info!("User {} not online, {:?} not sent", user_id, signal);
        }
    }

    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    pub fn is_user_online(&self, user_id: &i32) -> bool {
        self.users_online.contains_key(user_id)
    }
}
