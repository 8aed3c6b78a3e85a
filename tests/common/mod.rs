#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use conversation_previews::core::AppState;
use conversation_previews::repositories::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

pub const ALICE: i32 = 1;
pub const BOB: i32 = 2;
pub const CAROL: i32 = 3;
pub const DAVE: i32 = 4;

/// Crea un AppState per i test
///
/// # Arguments
/// * `store` - Store in memoria condiviso con il test
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test e un intervallo di refresh breve
pub fn create_test_state(store: Arc<InMemoryStore>) -> Arc<AppState<InMemoryStore>> {
    let mut state = AppState::new(store, TEST_JWT_SECRET.to_string());
    state.refresh_interval = Duration::from_millis(20);
    Arc::new(state)
}

/// Crea un TestServer per i test
///
/// # Arguments
/// * `state` - AppState da utilizzare per il server
///
/// # Returns
/// TestServer configurato e pronto per eseguire richieste
pub fn create_test_server(state: Arc<AppState<InMemoryStore>>) -> TestServer {
    let app = conversation_previews::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token per testing
///
/// # Arguments
/// * `user_id` - ID dell'utente per cui generare il token
/// * `username` - Username dell'utente
///
/// # Returns
/// Token JWT valido per 24 ore
pub fn create_test_jwt(user_id: i32, username: &str) -> String {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Claims {
        id: i32,
        username: String,
        exp: usize,
        iat: usize,
    }

    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        id: user_id,
        username: username.to_string(),
        exp: expiration,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create JWT token")
}

pub fn bearer(user_id: i32, username: &str) -> String {
    format!("Bearer {}", create_test_jwt(user_id, username))
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

/// Conversazioni del dataset di base
pub struct Scenario {
    pub alice_bob: i32,
    pub alice_carol: i32,
}

/// Alice parla con Bob (due messaggi non letti di Bob, l'ultimo "hi")
/// e con Carol (nessun messaggio). Dave ha un profilo ma nessuna conversazione.
pub fn seed_scenario(store: &InMemoryStore) -> Scenario {
    store.insert_profile(ALICE, Some("Alice"), None);
    store.insert_profile(BOB, Some("Bob"), Some("https://img.example/bob.png"));
    store.insert_profile(CAROL, Some("Carol"), None);
    store.insert_profile(DAVE, Some("Dave"), None);

    let alice_bob = store.insert_conversation(&[ALICE, BOB]);
    let alice_carol = store.insert_conversation(&[ALICE, CAROL]);

    store.insert_message(alice_bob, ALICE, "ciao Bob", at(9, 0), true);
    store.insert_message(alice_bob, BOB, "hello", at(9, 30), false);
    store.insert_message(alice_bob, BOB, "hi", at(10, 0), false);

    Scenario {
        alice_bob,
        alice_carol,
    }
}
