//! Ordinamento delle anteprime per recenza

use crate::entities::ConversationPreview;
use std::cmp::Ordering;

/// Ordina per `last_message_at` decrescente; le anteprime senza timestamp vanno
/// in fondo. L'ordinamento è stabile: a parità di chiave resta l'ordine delle membership.
pub fn sort_by_recency(previews: &mut [ConversationPreview]) {
    previews.sort_by(|a, b| match (&a.last_message_at, &b.last_message_at) {
        (Some(a_at), Some(b_at)) => b_at.cmp(a_at),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
