//! Live Connection Management - Gestione connessioni WebSocket del feed anteprime

use crate::assembler::{DataFetchError, PreviewLoad};
use crate::core::{AppState, NO_CONVERSATIONS_AVAILABLE};
use crate::dtos::{ConversationPreviewDTO, WsEventDTO};
use crate::entities::Session;
use crate::live::feed::{ChangeEvent, ChangeFeed};
use crate::live::preview_list::{LoadTicket, PreviewList};
use crate::live::signals::LiveSignal;
use crate::repositories::ConversationStore;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Instant, interval, timeout};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, info, instrument, warn};

type LoadResult = (LoadTicket, Result<PreviewLoad, DataFetchError>);
type WatchMap = StreamMap<i32, BroadcastStream<Arc<ChangeEvent>>>;

/// Attesa massima tra due tentativi dopo caricamenti falliti
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[instrument(skip(ws, state, session), fields(user_id = session.as_ref().map(|s| s.user_id)))]
pub async fn handle_socket<S: ConversationStore>(
    ws: WebSocket,
    state: Arc<AppState<S>>,
    session: Option<Session>,
) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (mut ws_tx, ws_rx) = ws.split();

    let Some(session) = session else {
        // senza sessione la lista è vuota e non cambierà
        info!("No session, sending empty list and closing");
        let empty = WsEventDTO::Previews {
            loading: false,
            previews: Vec::new(),
        };
        if send_event(&mut ws_tx, &empty).await.is_ok() {
            let _ = ws_tx.send(Message::Close(None)).await;
        }
        return;
    };
    let user_id = session.user_id;

    // segnali interni (shutdown, nuove conversazioni) ed eventi verso il client
    let (signal_tx, signal_rx) = unbounded_channel::<LiveSignal>();
    let (event_tx, event_rx) = unbounded_channel::<WsEventDTO>();

    state.users_online.register_online(user_id, signal_tx.clone());

    tokio::spawn(listen_ws(user_id, ws_rx, signal_tx, state.clone()));
    tokio::spawn(write_ws(ws_tx, event_rx));
    tokio::spawn(run_preview_feed(state, session, signal_rx, event_tx));
}

/// Mantiene aggiornata la lista di anteprime di una connessione.
///
/// Carica e invia la lista all'avvio, poi accorpa le modifiche delle
/// conversazioni osservate su `refresh_interval` e ricarica una volta per
/// finestra. I caricamenti girano in task separati e i loro risultati passano
/// da `PreviewList`, che scarta quelli superati o arrivati dopo la chiusura.
/// Ogni caricamento riuscito riallinea le sottoscrizioni alle membership lette;
/// dopo un caricamento fallito si riprova con attesa crescente.
/// Termina con `LiveSignal::Shutdown`, con la chiusura dei segnali o quando il
/// client non riceve più eventi.
#[instrument(skip(state, session, signals, events), fields(user_id = session.user_id))]
pub async fn run_preview_feed<S: ConversationStore>(
    state: Arc<AppState<S>>,
    session: Session,
    mut signals: UnboundedReceiver<LiveSignal>,
    events: UnboundedSender<WsEventDTO>,
) {
    info!("Preview feed started");
    let user_id = session.user_id;
    let mut list = PreviewList::new();
    let (done_tx, mut done_rx) = unbounded_channel::<LoadResult>();
    let mut stream_map: WatchMap = StreamMap::new();

    // sottoscrizione prima del primo caricamento, così nessuna modifica va persa;
    // se fallisce le sottoscrizioni arrivano col primo caricamento riuscito
    match timeout(
        state.assembler.options().query_timeout,
        state.store().list_memberships(user_id),
    )
    .await
    {
        Ok(Ok(memberships)) => {
            let watched: Vec<i32> = memberships.into_iter().map(|m| m.conversation_id).collect();
            sync_watched(&state.feed, &mut stream_map, &watched);
        }
        Ok(Err(e)) => warn!("Failed to load conversations to watch: {}", e),
        Err(_) => warn!("Timed out loading conversations to watch"),
    }

    if start_load(&state, &session, &mut list, &done_tx, &events) {
        let mut dirty = false;
        let mut failing = false;
        let mut retry_delay = state.refresh_interval;
        let mut retry_at: Option<Instant> = None;
        let mut refresh = interval(state.refresh_interval);
        refresh.tick().await; // Consuma primo tick immediato

        'external: loop {
            tokio::select! {
                // le modifiche in coda vengono smaltite prima del tick, così una raffica
                // produce un solo ricaricamento
                biased;

                signal = signals.recv() => {
                    match signal {
                        Some(LiveSignal::AddConversation(conversation_id)) => {
                            info!(conversation_id, "Watching new conversation");
                            if !stream_map.contains_key(&conversation_id) {
                                let rx = state.feed.subscribe(&conversation_id);
                                stream_map.insert(conversation_id, BroadcastStream::new(rx));
                            }
                            retry_at = None;
                            if !start_load(&state, &session, &mut list, &done_tx, &events) {
                                break 'external;
                            }
                        }
                        Some(LiveSignal::Shutdown) => {
                            info!("Shutdown signal received");
                            break 'external;
                        }
                        None => {
                            info!("Signal channel closed");
                            break 'external;
                        }
                    }
                }

                Some((conversation_id, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                    match result {
                        Ok(change) => debug!(conversation_id, kind = ?change.kind, "Change received"),
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!(conversation_id, skipped, "Change feed lagged");
                        }
                    }
                    dirty = true;
                }

                Some((ticket, result)) = done_rx.recv() => {
                    let outgoing = match result {
                        Ok(PreviewLoad { conversation_ids, previews }) => {
                            if !list.commit(ticket, previews) {
                                continue;
                            }
                            sync_watched(&state.feed, &mut stream_map, &conversation_ids);
                            failing = false;
                            retry_at = None;
                            vec![WsEventDTO::Previews {
                                loading: false,
                                previews: ConversationPreviewDTO::from_previews(list.previews().to_vec()),
                            }]
                        }
                        Err(e) => {
                            if !list.fail(ticket) {
                                continue;
                            }
                            retry_delay = if failing {
                                (retry_delay * 2).min(MAX_RETRY_DELAY)
                            } else {
                                state.refresh_interval
                            };
                            retry_at = Some(Instant::now() + retry_delay);
                            warn!(retry_in = ?retry_delay, "Preview load failed: {}", e);

                            // l'errore si notifica una volta sola per serie di fallimenti
                            let mut outgoing = Vec::with_capacity(2);
                            if !failing {
                                outgoing.push(WsEventDTO::Error {
                                    code: 503,
                                    message: NO_CONVERSATIONS_AVAILABLE.to_string(),
                                });
                            }
                            failing = true;
                            outgoing.push(WsEventDTO::Previews {
                                loading: false,
                                previews: Vec::new(),
                            });
                            outgoing
                        }
                    };
                    for event in outgoing {
                        if events.send(event).is_err() {
                            info!("Client gone, stopping feed");
                            break 'external;
                        }
                    }
                }

                // accorpa le modifiche arrivate nella finestra in un solo caricamento
                _ = refresh.tick() => {
                    let retry_due = !list.is_loading()
                        && retry_at.is_some_and(|at| Instant::now() >= at);
                    if dirty || retry_due {
                        dirty = false;
                        retry_at = None;
                        if !start_load(&state, &session, &mut list, &done_tx, &events) {
                            break 'external;
                        }
                    }
                }
            }
        }
    } else {
        info!("Client gone before first load");
    }

    // i caricamenti ancora in volo verranno scartati
    list.close();

    let watched: Vec<i32> = stream_map.keys().copied().collect();
    drop(stream_map);
    state.feed.release(&watched);
    info!("Preview feed terminated");
}

/// Allinea le sottoscrizioni alle conversazioni indicate
fn sync_watched(feed: &ChangeFeed, stream_map: &mut WatchMap, conversation_ids: &[i32]) {
    let stale: Vec<i32> = stream_map
        .keys()
        .copied()
        .filter(|id| !conversation_ids.contains(id))
        .collect();
    for conversation_id in &stale {
        stream_map.remove(conversation_id);
    }
    feed.release(&stale);

    for &conversation_id in conversation_ids {
        if !stream_map.contains_key(&conversation_id) {
            let rx = feed.subscribe(&conversation_id);
            stream_map.insert(conversation_id, BroadcastStream::new(rx));
        }
    }
    debug!(watched = stream_map.len(), "Watched conversations synced");
}

/// Avvia un caricamento in background e notifica il client che la lista è in aggiornamento.
/// Ritorna `false` se il client non è più raggiungibile.
fn start_load<S: ConversationStore>(
    state: &Arc<AppState<S>>,
    session: &Session,
    list: &mut PreviewList,
    done_tx: &UnboundedSender<LoadResult>,
    events: &UnboundedSender<WsEventDTO>,
) -> bool {
    let ticket = list.begin_load();
    let loading = WsEventDTO::Previews {
        loading: true,
        previews: ConversationPreviewDTO::from_previews(list.previews().to_vec()),
    };
    if events.send(loading).is_err() {
        return false;
    }

    let state = state.clone();
    let session = session.clone();
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let result = state.assembler.load(Some(&session)).await;
        // se il feed è già terminato il risultato viene perso
        let _ = done_tx.send((ticket, result));
    });
    true
}

/// Inoltra gli eventi del feed sul WebSocket
#[instrument(skip(websocket_tx, events))]
pub async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut events: UnboundedReceiver<WsEventDTO>,
) {
    info!("Write task started");
    while let Some(event) = events.recv().await {
        if send_event(&mut websocket_tx, &event).await.is_err() {
            warn!("Failed to send event, closing connection");
            break;
        }
    }
    let _ = websocket_tx.send(Message::Close(None)).await;
    info!("Write task terminated");
}

async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &WsEventDTO,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

/// Ascolta il client finché non chiude; il feed è solo in uscita, i frame ricevuti vengono ignorati
#[instrument(skip(websocket_rx, signal_tx, state))]
pub async fn listen_ws<S: ConversationStore>(
    user_id: i32,
    mut websocket_rx: SplitStream<WebSocket>,
    signal_tx: UnboundedSender<LiveSignal>,
    state: Arc<AppState<S>>,
) {
    info!("Listen task started");

    while let Some(msg_result) = StreamExt::next(&mut websocket_rx).await {
        match msg_result {
            Ok(Message::Close(_)) => {
                info!("Close message received");
                break;
            }
            Ok(_) => debug!("Ignoring client frame"),
            Err(e) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
        }
    }

    // Cleanup
    info!("Cleaning up connection");
    let _ = signal_tx.send(LiveSignal::Shutdown);
    state.users_online.remove_from_online(&user_id, &signal_tx);
    info!("Listen task terminated");
}
