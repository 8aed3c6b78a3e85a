//! Assembler module - Costruzione della lista di anteprime delle conversazioni
//!
//! Per ogni conversazione dell'utente risolve controparte, profilo, ultimo
//! messaggio e numero di non letti, poi ordina per recenza.
//!
//! Politica sui guasti:
//! - membership non disponibili -> `DataFetchError`, la lista resta vuota
//! - controparte o profilo non risolti -> la conversazione viene saltata
//! - ultimo messaggio o conteggio non disponibili -> campo assente / 0

pub mod error;
pub mod ordering;

pub use error::DataFetchError;
pub use ordering::sort_by_recency;

use crate::entities::{ConversationPreview, Session, UNKNOWN_DISPLAY_NAME};
use crate::repositories::{PreviewStore, StoreError};
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Parametri di esecuzione dell'assembler
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Tempo massimo per ogni singola query allo store
    pub query_timeout: Duration,
    /// Conversazioni risolte contemporaneamente (1 = strettamente sequenziale)
    pub concurrency: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            concurrency: 4,
        }
    }
}

/// Esito completo di un caricamento: oltre alle anteprime, tutte le conversazioni
/// dell'utente (anche quelle saltate), che il feed live usa per le sottoscrizioni
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLoad {
    pub conversation_ids: Vec<i32>,
    pub previews: Vec<ConversationPreview>,
}

pub struct ConversationListAssembler<S> {
    store: Arc<S>,
    options: AssemblerOptions,
}

impl<S: PreviewStore> ConversationListAssembler<S> {
    pub fn new(store: Arc<S>, options: AssemblerOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Carica le anteprime delle conversazioni della sessione.
    ///
    /// Senza sessione ritorna una lista vuota senza interrogare lo store.
    /// Le conversazioni vengono risolte con concorrenza limitata ma raccolte
    /// nell'ordine delle membership, quindi il risultato non dipende da
    /// `concurrency`. Nessuna deduplica per controparte.
    pub async fn load_previews(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<ConversationPreview>, DataFetchError> {
        self.load(session).await.map(|load| load.previews)
    }

    /// Come `load_previews`, restituendo anche gli id di tutte le conversazioni lette
    #[instrument(skip(self, session), fields(user_id = session.map(|s| s.user_id)))]
    pub async fn load(&self, session: Option<&Session>) -> Result<PreviewLoad, DataFetchError> {
        let Some(session) = session else {
            debug!("No session, returning empty preview list");
            return Ok(PreviewLoad {
                conversation_ids: Vec::new(),
                previews: Vec::new(),
            });
        };
        let user_id = session.user_id;

        let memberships = self
            .bounded(self.store.list_memberships(user_id))
            .await
            .map_err(|source| {
                warn!("Failed to fetch memberships: {}", source);
                DataFetchError::Memberships { user_id, source }
            })?;

        let conversation_ids: Vec<i32> = memberships.iter().map(|m| m.conversation_id).collect();
        let total = conversation_ids.len();
        debug!("User is member of {} conversations", total);

        let pending = conversation_ids
            .iter()
            .copied()
            .map(|conversation_id| self.resolve_conversation(user_id, conversation_id));

        let mut previews: Vec<ConversationPreview> = stream::iter(pending)
            .buffered(self.options.concurrency.max(1))
            .collect::<Vec<Option<ConversationPreview>>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        sort_by_recency(&mut previews);

        info!(
            "Assembled {} previews out of {} conversations",
            previews.len(),
            total
        );
        Ok(PreviewLoad {
            conversation_ids,
            previews,
        })
    }

    /// Risolve una singola conversazione; `None` se va saltata
    async fn resolve_conversation(
        &self,
        user_id: i32,
        conversation_id: i32,
    ) -> Option<ConversationPreview> {
        let counterpart_id = match self
            .bounded(self.store.find_counterpart(conversation_id, user_id))
            .await
        {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(conversation_id, "No counterpart found, skipping conversation");
                return None;
            }
            Err(e) => {
                warn!(conversation_id, "Counterpart lookup failed, skipping: {}", e);
                return None;
            }
        };

        let profile = match self.bounded(self.store.get_profile(counterpart_id)).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(conversation_id, counterpart_id, "Profile not found, skipping conversation");
                return None;
            }
            Err(e) => {
                warn!(conversation_id, counterpart_id, "Profile lookup failed, skipping: {}", e);
                return None;
            }
        };

        let last_message = self
            .bounded(self.store.get_last_message(conversation_id))
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id, "Last message lookup failed: {}", e);
                None
            });

        let unread_count = self
            .bounded(self.store.count_unread(conversation_id, user_id))
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id, "Unread count failed, defaulting to 0: {}", e);
                0
            });

        let display_name = profile
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string());

        let (last_message, last_message_at) = match last_message {
            Some(message) => (Some(message.body), Some(message.created_at)),
            None => (None, None),
        };

        Some(ConversationPreview {
            conversation_id,
            counterpart_id,
            display_name,
            avatar_url: profile.avatar_url,
            last_message,
            last_message_at,
            unread_count,
        })
    }

    async fn bounded<T>(
        &self,
        query: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.options.query_timeout;
        timeout(limit, query)
            .await
            .map_err(|_| StoreError::Timeout(limit))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{ConversationWriter, InMemoryStore};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    const ALICE: i32 = 1;
    const BOB: i32 = 2;
    const CAROL: i32 = 3;
    const DAVE: i32 = 4;

    fn alice() -> Session {
        Session {
            user_id: ALICE,
            username: "alice".to_string(),
        }
    }

    fn assembler(store: Arc<InMemoryStore>) -> ConversationListAssembler<InMemoryStore> {
        ConversationListAssembler::new(store, AssemblerOptions::default())
    }

    /// A parla con B ("hi" a T1, 2 non letti) e con C (nessun messaggio)
    fn scenario_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_profile(BOB, Some("Bob"), Some("bob.png"));
        store.insert_profile(CAROL, Some("Carol"), None);

        let with_carol = store.insert_conversation(&[ALICE, CAROL]);
        let with_bob = store.insert_conversation(&[ALICE, BOB]);
        assert!(with_carol < with_bob);

        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        store.insert_message(with_bob, BOB, "ciao", t0, false);
        store.insert_message(with_bob, ALICE, "hey", t0 + ChronoDuration::minutes(1), false);
        store.insert_message(with_bob, BOB, "hi", t0 + ChronoDuration::minutes(2), false);
        store
    }

    #[tokio::test]
    async fn test_no_session_returns_empty_without_queries() {
        let store = scenario_store();
        let assembler = assembler(store.clone());

        let previews = assembler.load_previews(None).await.unwrap();

        assert!(previews.is_empty());
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_bob_before_carol() {
        let store = scenario_store();
        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        assert_eq!(previews.len(), 2);

        let bob = &previews[0];
        assert_eq!(bob.counterpart_id, BOB);
        assert_eq!(bob.display_name, "Bob");
        assert_eq!(bob.avatar_url.as_deref(), Some("bob.png"));
        assert_eq!(bob.last_message.as_deref(), Some("hi"));
        assert_eq!(
            bob.last_message_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 2, 0).unwrap())
        );
        // il messaggio "hey" è di alice e non conta
        assert_eq!(bob.unread_count, 2);

        let carol = &previews[1];
        assert_eq!(carol.counterpart_id, CAROL);
        assert_eq!(carol.last_message, None);
        assert_eq!(carol.last_message_at, None);
        assert_eq!(carol.unread_count, 0);
    }

    #[tokio::test]
    async fn test_conversation_without_counterpart_is_skipped() {
        let store = scenario_store();
        store.insert_conversation(&[ALICE]);

        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        assert_eq!(previews.len(), 2);
        assert!(previews.iter().all(|p| p.counterpart_id != ALICE));
    }

    #[tokio::test]
    async fn test_failed_lookups_drop_exactly_those_conversations() {
        let store = scenario_store();
        store.insert_profile(DAVE, Some("Dave"), None);
        let broken_counterpart = store.insert_conversation(&[ALICE, DAVE]);
        store.fail_counterpart_of(broken_counterpart);
        // profilo mancante
        store.insert_conversation(&[ALICE, 42]);
        // profilo che fallisce
        store.insert_profile(43, Some("Eve"), None);
        store.fail_profile_of(43);
        store.insert_conversation(&[ALICE, 43]);

        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        // N = 5 membership, M = 3 guasti
        assert_eq!(previews.len(), 2);
        let counterparts: Vec<i32> = previews.iter().map(|p| p.counterpart_id).collect();
        assert_eq!(counterparts, vec![BOB, CAROL]);
    }

    #[tokio::test]
    async fn test_load_reports_skipped_conversations_too() {
        let store = scenario_store();
        let lonely = store.insert_conversation(&[ALICE]);

        let load = assembler(store).load(Some(&alice())).await.unwrap();

        assert_eq!(load.previews.len(), 2);
        assert_eq!(load.conversation_ids.len(), 3);
        assert!(load.conversation_ids.contains(&lonely));
    }

    #[tokio::test]
    async fn test_membership_failure_is_fatal() {
        let store = scenario_store();
        store.fail_memberships(true);

        let result = assembler(store).load_previews(Some(&alice())).await;

        assert!(matches!(
            result,
            Err(DataFetchError::Memberships { user_id: ALICE, .. })
        ));
    }

    #[tokio::test]
    async fn test_message_and_count_failures_fall_back_to_defaults() {
        let store = scenario_store();
        let with_bob = store
            .find_two_party_conversation(ALICE, BOB)
            .await
            .unwrap()
            .unwrap();
        store.fail_last_message_of(with_bob);
        store.fail_unread_count_of(with_bob);

        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        assert_eq!(previews.len(), 2);
        let bob = previews.iter().find(|p| p.counterpart_id == BOB).unwrap();
        assert_eq!(bob.last_message, None);
        assert_eq!(bob.last_message_at, None);
        assert_eq!(bob.unread_count, 0);
    }

    #[tokio::test]
    async fn test_missing_display_name_uses_placeholder() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_profile(BOB, None, None);
        store.insert_profile(CAROL, Some("   "), None);
        store.insert_conversation(&[ALICE, BOB]);
        store.insert_conversation(&[ALICE, CAROL]);

        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        assert_eq!(previews.len(), 2);
        assert!(previews.iter().all(|p| p.display_name == UNKNOWN_DISPLAY_NAME));
    }

    #[tokio::test]
    async fn test_same_peer_in_two_conversations_is_not_collapsed() {
        let store = scenario_store();
        store.insert_conversation(&[BOB, ALICE]);

        let previews = assembler(store).load_previews(Some(&alice())).await.unwrap();

        let with_bob = previews.iter().filter(|p| p.counterpart_id == BOB).count();
        assert_eq!(with_bob, 2);
    }

    #[tokio::test]
    async fn test_repeated_loads_are_identical() {
        let store = scenario_store();
        let assembler = assembler(store);

        let first = assembler.load_previews(Some(&alice())).await.unwrap();
        let second = assembler.load_previews(Some(&alice())).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_result_does_not_depend_on_concurrency() {
        let store = scenario_store();
        for peer in 10..30 {
            store.insert_profile(peer, Some(&format!("peer {}", peer)), None);
            let conv = store.insert_conversation(&[ALICE, peer]);
            if peer % 3 != 0 {
                let at = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
                    + ChronoDuration::minutes((peer % 7) as i64);
                store.insert_message(conv, peer, "yo", at, peer % 2 == 0);
            }
        }

        let sequential = ConversationListAssembler::new(
            store.clone(),
            AssemblerOptions {
                concurrency: 1,
                ..AssemblerOptions::default()
            },
        )
        .load_previews(Some(&alice()))
        .await
        .unwrap();
        let parallel = ConversationListAssembler::new(
            store,
            AssemblerOptions {
                concurrency: 8,
                ..AssemblerOptions::default()
            },
        )
        .load_previews(Some(&alice()))
        .await
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 22);
        // timestamp definiti prima, assenti in fondo
        let first_missing = sequential
            .iter()
            .position(|p| p.last_message_at.is_none())
            .unwrap();
        assert!(sequential[first_missing..]
            .iter()
            .all(|p| p.last_message_at.is_none()));
        assert!(sequential[..first_missing]
            .windows(2)
            .all(|w| w[0].last_message_at >= w[1].last_message_at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out_memberships() {
        let store = scenario_store();
        store.set_delay(Duration::from_secs(10));
        let assembler = ConversationListAssembler::new(
            store,
            AssemblerOptions {
                query_timeout: Duration::from_secs(1),
                concurrency: 1,
            },
        );

        let result = assembler.load_previews(Some(&alice())).await;

        assert!(matches!(
            result,
            Err(DataFetchError::Memberships {
                source: StoreError::Timeout(_),
                ..
            })
        ));
    }
}
