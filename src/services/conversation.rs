//! Conversation services - Operazioni che modificano le conversazioni
//!
//! Ogni operazione riuscita viene pubblicata sul `ChangeFeed` così i feed live
//! delle anteprime si aggiornano.

use crate::core::{AppError, AppState};
use crate::dtos::{ConversationDTO, MarkReadDTO, MessageDTO, SendMessageDTO, StartConversationDTO};
use crate::entities::Session;
use crate::live::{ChangeEvent, ChangeKind, LiveSignal};
use crate::repositories::{ConversationStore, NewConversation};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, session, body), fields(user_id = %session.user_id, peer_id = %body.peer_id))]
pub async fn start_conversation<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Json(body): Json<StartConversationDTO>,
) -> Result<(StatusCode, Json<ConversationDTO>), AppError> {
    debug!("Starting two-party conversation");
    // 1. Rifiutare una conversazione con se stessi (BAD_REQUEST)
    // 2. Verificare che il peer abbia un profilo (NOT_FOUND)
    // 3. Creare conversazione e membership in transazione; se la coppia ne ha già
    //    una, lo store lo rileva nella stessa transazione -> CONFLICT
    // 4. Segnalare ai feed online dei due utenti la nuova conversazione
    let peer_id = body.peer_id;
    if peer_id == session.user_id {
        warn!("User tried to start a conversation with themselves");
        return Err(AppError::bad_request(
            "Cannot start a conversation with yourself.",
        ));
    }

    let store = state.store();
    if store.get_profile(peer_id).await?.is_none() {
        warn!("Peer has no profile");
        return Err(AppError::not_found("User not found"));
    }

    let conversation_id = match store.start_conversation(session.user_id, peer_id).await? {
        NewConversation::Created(conversation_id) => conversation_id,
        NewConversation::Existing(existing) => {
            warn!("Conversation {} already exists", existing);
            return Err(AppError::conflict(
                "A conversation between these users already exists.",
            ));
        }
    };
    debug!("Conversation created with id {}", conversation_id);

    state.feed.publish(ChangeEvent {
        conversation_id,
        kind: ChangeKind::ConversationStarted,
    });
    for user_id in [session.user_id, peer_id] {
        state
            .users_online
            .send_if_online(&user_id, LiveSignal::AddConversation(conversation_id));
    }

    info!("Conversation {} started", conversation_id);
    Ok((
        StatusCode::CREATED,
        Json(ConversationDTO {
            conversation_id,
            participants: vec![session.user_id, peer_id],
        }),
    ))
}

#[instrument(skip(state, session, body), fields(user_id = %session.user_id))]
pub async fn send_message<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<i32>,
    Json(body): Json<SendMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    debug!("Sending message");
    body.validate()?;
    ensure_member(&state, &session, conversation_id).await?;

    let message = state
        .store()
        .send_message(conversation_id, session.user_id, &body.body)
        .await?;

    let receivers = state.feed.publish(ChangeEvent {
        conversation_id,
        kind: ChangeKind::MessageSent,
    });
    info!(
        "Message {} stored, {} live feeds notified",
        message.message_id, receivers
    );
    Ok((StatusCode::CREATED, Json(MessageDTO::from(message))))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn mark_conversation_read<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<i32>,
) -> Result<Json<MarkReadDTO>, AppError> {
    debug!("Marking conversation as read");
    ensure_member(&state, &session, conversation_id).await?;

    let updated = state
        .store()
        .mark_read(conversation_id, session.user_id)
        .await?;

    if updated > 0 {
        state.feed.publish(ChangeEvent {
            conversation_id,
            kind: ChangeKind::MessagesRead,
        });
    }
    info!("{} messages marked as read", updated);
    Ok(Json(MarkReadDTO {
        conversation_id,
        updated,
    }))
}

async fn ensure_member<S: ConversationStore>(
    state: &AppState<S>,
    session: &Session,
    conversation_id: i32,
) -> Result<(), AppError> {
    if !state
        .store()
        .is_member(session.user_id, conversation_id)
        .await?
    {
        warn!(conversation_id, "User is not a member of the conversation");
        return Err(AppError::forbidden(
            "You are not a member of this conversation",
        ));
    }
    Ok(())
}
