//! InMemoryStore - Store in memoria per sviluppo locale e test
//!
//! Stesse semantiche di `SqlStore` (ordinamento delle membership per id
//! conversazione, ultimo messaggio per `created_at` poi id). In più permette di
//! simulare guasti per singola query e latenza, e conta le query ricevute.

use super::{ConversationWriter, NewConversation, PreviewStore, StoreError};
use crate::entities::{Membership, Message, Profile};
use chrono::{DateTime, SubsecRound, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Default)]
pub struct InMemoryStore {
    /// conversation_id -> partecipanti in ordine di inserimento
    participants: DashMap<i32, Vec<i32>>,
    /// (utente minore, utente maggiore) -> prima conversazione a due della coppia
    pairs: DashMap<(i32, i32), i32>,
    profiles: DashMap<i32, Profile>,
    /// conversation_id -> messaggi in ordine di inserimento
    messages: DashMap<i32, Vec<Message>>,
    next_conversation_id: AtomicI32,
    next_message_id: AtomicI32,

    // fault injection
    fail_memberships: AtomicBool,
    failing_counterparts: DashSet<i32>,
    failing_profiles: DashSet<i32>,
    failing_last_messages: DashSet<i32>,
    failing_counts: DashSet<i32>,
    delay_ms: AtomicU64,
    queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile
    pub fn insert_profile(&self, user_id: i32, display_name: Option<&str>, avatar_url: Option<&str>) {
        self.profiles.insert(
            user_id,
            Profile {
                user_id,
                display_name: display_name.map(str::to_string),
                avatar_url: avatar_url.map(str::to_string),
            },
        );
    }

    /// Creates a conversation with arbitrary participants (also 1 or 3+, to model anomalies)
    pub fn insert_conversation(&self, participants: &[i32]) -> i32 {
        let conversation_id = self.insert_participants(participants);
        if let [first, second] = participants {
            if first != second {
                self.pairs
                    .entry(Self::pair_key(*first, *second))
                    .or_insert(conversation_id);
            }
        }
        conversation_id
    }

    fn insert_participants(&self, participants: &[i32]) -> i32 {
        let conversation_id = self.next_conversation_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.participants
            .insert(conversation_id, participants.to_vec());
        conversation_id
    }

    fn pair_key(first: i32, second: i32) -> (i32, i32) {
        (first.min(second), first.max(second))
    }

    /// Inserts a message with an explicit timestamp and read flag
    pub fn insert_message(
        &self,
        conversation_id: i32,
        sender_id: i32,
        body: &str,
        created_at: DateTime<Utc>,
        is_read: bool,
    ) -> Message {
        let message = Message {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
            conversation_id,
            sender_id,
            body: body.to_string(),
            created_at,
            is_read,
        };
        self.messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        message
    }

    pub fn fail_memberships(&self, fail: bool) {
        self.fail_memberships.store(fail, Ordering::SeqCst);
    }

    pub fn fail_counterpart_of(&self, conversation_id: i32) {
        self.failing_counterparts.insert(conversation_id);
    }

    pub fn fail_profile_of(&self, user_id: i32) {
        self.failing_profiles.insert(user_id);
    }

    pub fn fail_last_message_of(&self, conversation_id: i32) {
        self.failing_last_messages.insert(conversation_id);
    }

    pub fn fail_unread_count_of(&self, conversation_id: i32) {
        self.failing_counts.insert(conversation_id);
    }

    /// Every query sleeps `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of queries received so far, reads and writes
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    fn injected(what: &str) -> StoreError {
        debug!("Injected failure on {}", what);
        StoreError::Unavailable(format!("injected failure: {}", what))
    }
}

impl PreviewStore for InMemoryStore {
    async fn list_memberships(&self, user_id: i32) -> Result<Vec<Membership>, StoreError> {
        self.enter().await;
        if self.fail_memberships.load(Ordering::SeqCst) {
            return Err(Self::injected("list_memberships"));
        }

        let mut memberships: Vec<Membership> = self
            .participants
            .iter()
            .filter(|entry| entry.value().contains(&user_id))
            .map(|entry| Membership {
                user_id,
                conversation_id: *entry.key(),
            })
            .collect();
        memberships.sort_by_key(|m| m.conversation_id);
        Ok(memberships)
    }

    async fn find_counterpart(
        &self,
        conversation_id: i32,
        excluding_user_id: i32,
    ) -> Result<Option<i32>, StoreError> {
        self.enter().await;
        if self.failing_counterparts.contains(&conversation_id) {
            return Err(Self::injected("find_counterpart"));
        }

        Ok(self.participants.get(&conversation_id).and_then(|members| {
            members
                .iter()
                .copied()
                .filter(|&id| id != excluding_user_id)
                .min()
        }))
    }

    async fn get_profile(&self, user_id: i32) -> Result<Option<Profile>, StoreError> {
        self.enter().await;
        if self.failing_profiles.contains(&user_id) {
            return Err(Self::injected("get_profile"));
        }
        Ok(self.profiles.get(&user_id).map(|p| p.value().clone()))
    }

    async fn get_last_message(&self, conversation_id: i32) -> Result<Option<Message>, StoreError> {
        self.enter().await;
        if self.failing_last_messages.contains(&conversation_id) {
            return Err(Self::injected("get_last_message"));
        }

        Ok(self.messages.get(&conversation_id).and_then(|messages| {
            messages
                .iter()
                .max_by_key(|m| (m.created_at, m.message_id))
                .cloned()
        }))
    }

    async fn count_unread(
        &self,
        conversation_id: i32,
        excluding_sender_id: i32,
    ) -> Result<i64, StoreError> {
        self.enter().await;
        if self.failing_counts.contains(&conversation_id) {
            return Err(Self::injected("count_unread"));
        }

        Ok(self
            .messages
            .get(&conversation_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| !m.is_read && m.sender_id != excluding_sender_id)
                    .count() as i64
            })
            .unwrap_or(0))
    }
}

impl ConversationWriter for InMemoryStore {
    async fn is_member(&self, user_id: i32, conversation_id: i32) -> Result<bool, StoreError> {
        self.enter().await;
        Ok(self
            .participants
            .get(&conversation_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn find_two_party_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> Result<Option<i32>, StoreError> {
        self.enter().await;
        Ok(self
            .participants
            .iter()
            .filter(|entry| {
                let members = entry.value();
                members.len() == 2
                    && members.contains(&first_user_id)
                    && members.contains(&second_user_id)
            })
            .map(|entry| *entry.key())
            .min())
    }

    async fn start_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> Result<NewConversation, StoreError> {
        self.enter().await;
        // l'entry tiene bloccata la coppia fino all'inserimento
        match self.pairs.entry(Self::pair_key(first_user_id, second_user_id)) {
            Entry::Occupied(existing) => Ok(NewConversation::Existing(*existing.get())),
            Entry::Vacant(slot) => {
                let conversation_id = self.insert_participants(&[first_user_id, second_user_id]);
                slot.insert(conversation_id);
                Ok(NewConversation::Created(conversation_id))
            }
        }
    }

    async fn send_message(
        &self,
        conversation_id: i32,
        sender_id: i32,
        body: &str,
    ) -> Result<Message, StoreError> {
        self.enter().await;
        Ok(self.insert_message(
            conversation_id,
            sender_id,
            body,
            Utc::now().trunc_subsecs(0),
            false,
        ))
    }

    async fn mark_read(&self, conversation_id: i32, reader_id: i32) -> Result<u64, StoreError> {
        self.enter().await;
        let mut changed = 0;
        if let Some(mut messages) = self.messages.get_mut(&conversation_id) {
            for message in messages.iter_mut() {
                if !message.is_read && message.sender_id != reader_id {
                    message.is_read = true;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}
