use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, info, instrument};

/// Capacità di ogni canale broadcast per conversazione
pub const FEED_CHANNEL_CAPACITY: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    MessageSent,
    MessagesRead,
    ConversationStarted,
}

/// Notifica che qualcosa in una conversazione è cambiato; i feed ricaricano la lista
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub conversation_id: i32,
    pub kind: ChangeKind,
}

pub struct ChangeFeed {
    /// tx head del canale broadcast di ogni conversazione, per conversation_id
    channels: DashMap<i32, Sender<Arc<ChangeEvent>>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        ChangeFeed {
            channels: DashMap::new(),
        }
    }

    /// Sottoscrive le modifiche di una conversazione, creando il canale se non esiste
    #[instrument(skip(self))]
    pub fn subscribe(&self, conversation_id: &i32) -> Receiver<Arc<ChangeEvent>> {
        self.channels
            .entry(*conversation_id)
            .or_insert_with(|| {
                debug!("Creating new broadcast channel for conversation");
                broadcast::channel::<Arc<ChangeEvent>>(FEED_CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    #[instrument(skip(self, conversation_ids))]
    pub fn subscribe_multiple(&self, conversation_ids: &[i32]) -> Vec<Receiver<Arc<ChangeEvent>>> {
        info!(count = conversation_ids.len(), "Subscribing to multiple conversations");
        conversation_ids.iter().map(|id| self.subscribe(id)).collect()
    }

    /// Pubblica un evento; ritorna quanti feed lo hanno ricevuto.
    /// Un canale senza più ricevitori viene rimosso.
    #[instrument(skip(self, event), fields(conversation_id = event.conversation_id, kind = ?event.kind))]
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let conversation_id = event.conversation_id;
        let Some(sender) = self.channels.get(&conversation_id).map(|c| c.value().clone()) else {
            debug!("Nobody is watching this conversation");
            return 0;
        };

        match sender.send(Arc::new(event)) {
            Ok(n) => {
                debug!(receivers = n, "Change broadcast to receivers");
                n
            }
            Err(_) => {
                debug!("No active receivers, removing channel");
                self.channels
                    .remove_if(&conversation_id, |_, tx| tx.receiver_count() == 0);
                0
            }
        }
    }

    /// Rimuove i canali delle conversazioni indicate rimasti senza ricevitori.
    /// Va chiamato dopo aver rilasciato i propri ricevitori.
    #[instrument(skip(self, conversation_ids))]
    pub fn release(&self, conversation_ids: &[i32]) {
        let removed = conversation_ids
            .iter()
            .filter(|id| {
                self.channels
                    .remove_if(id, |_, tx| tx.receiver_count() == 0)
                    .is_some()
            })
            .count();
        debug!(removed, "Released idle channels");
    }

    /// Numero di conversazioni con un canale attivo
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
