//! Integration tests per gli endpoints delle conversazioni
//!
//! Il router gira su `InMemoryStore`, così i guasti dello store si possono simulare.

mod common;

#[cfg(test)]
mod preview_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::http::HeaderName;
    use conversation_previews::repositories::InMemoryStore;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn authorization() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    // ============================================================
    // Test per GET / - health check
    // ============================================================

    #[tokio::test]
    async fn test_root_health_check() {
        let server = create_test_server(create_test_state(Arc::new(InMemoryStore::new())));

        let response = server.get("/").await;

        response.assert_status_ok();
        response.assert_text("Server is running!");
    }

    // ============================================================
    // Test per GET /conversations - list_previews
    // ============================================================

    #[tokio::test]
    async fn test_list_previews_without_token_is_empty() {
        let store = Arc::new(InMemoryStore::new());
        seed_scenario(&store);
        let server = create_test_server(create_test_state(store.clone()));

        let response = server.get("/conversations").await;

        response.assert_status_ok();
        let previews: Vec<Value> = response.json();
        assert!(previews.is_empty());
        assert_eq!(store.query_count(), 0, "Nessuna query senza sessione");
    }

    #[tokio::test]
    async fn test_list_previews_with_invalid_token_is_empty() {
        let store = Arc::new(InMemoryStore::new());
        seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        let response = server
            .get("/conversations")
            .add_header(authorization(), "Bearer invalid_token_here")
            .await;

        response.assert_status_ok();
        let previews: Vec<Value> = response.json();
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn test_list_previews_scenario() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await;

        response.assert_status_ok();
        let previews: Vec<Value> = response.json();
        assert_eq!(previews.len(), 2);

        assert_eq!(previews[0]["conversation_id"], scenario.alice_bob);
        assert_eq!(previews[0]["counterpart_id"], BOB);
        assert_eq!(previews[0]["display_name"], "Bob");
        assert_eq!(previews[0]["avatar_url"], "https://img.example/bob.png");
        assert_eq!(previews[0]["last_message"], "hi");
        assert_eq!(previews[0]["last_message_time"], "01/05/2024");
        assert_eq!(previews[0]["unread_count"], 2);

        assert_eq!(previews[1]["conversation_id"], scenario.alice_carol);
        assert_eq!(previews[1]["display_name"], "Carol");
        assert_eq!(previews[1]["last_message"], "");
        assert_eq!(previews[1]["last_message_at"], Value::Null);
        assert_eq!(previews[1]["unread_count"], 0);
    }

    #[tokio::test]
    async fn test_list_previews_membership_failure_is_unavailable() {
        let store = Arc::new(InMemoryStore::new());
        seed_scenario(&store);
        store.fail_memberships(true);
        let server = create_test_server(create_test_state(store));

        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["error"], "No conversations available");
    }

    #[tokio::test]
    async fn test_list_previews_skips_unresolvable_conversations() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        store.fail_profile_of(CAROL);
        let server = create_test_server(create_test_state(store));

        let response = server
            .get("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await;

        response.assert_status_ok();
        let previews: Vec<Value> = response.json();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0]["conversation_id"], scenario.alice_bob);
    }

    // ============================================================
    // Test per POST /conversations - start_conversation
    // ============================================================

    #[tokio::test]
    async fn test_start_conversation_success() {
        let store = Arc::new(InMemoryStore::new());
        seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        let response = server
            .post("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .json(&json!({ "peer_id": DAVE }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let conversation: Value = response.json();
        assert_eq!(conversation["participants"], json!([ALICE, DAVE]));

        let previews: Vec<Value> = server
            .get("/conversations")
            .add_header(authorization(), bearer(DAVE, "dave"))
            .await
            .json();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0]["display_name"], "Alice");
        assert_eq!(previews[0]["last_message"], "");
    }

    #[tokio::test]
    async fn test_start_conversation_rejections() {
        let store = Arc::new(InMemoryStore::new());
        seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        // senza token
        server
            .post("/conversations")
            .json(&json!({ "peer_id": DAVE }))
            .await
            .assert_status_forbidden();

        // token non valido
        server
            .post("/conversations")
            .add_header(authorization(), "Bearer invalid_token_here")
            .json(&json!({ "peer_id": DAVE }))
            .await
            .assert_status_unauthorized();

        // con se stessi
        server
            .post("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .json(&json!({ "peer_id": ALICE }))
            .await
            .assert_status_bad_request();

        // peer senza profilo
        server
            .post("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .json(&json!({ "peer_id": 999 }))
            .await
            .assert_status_not_found();

        // conversazione già esistente, in entrambe le direzioni
        server
            .post("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .json(&json!({ "peer_id": BOB }))
            .await
            .assert_status(StatusCode::CONFLICT);
        server
            .post("/conversations")
            .add_header(authorization(), bearer(BOB, "bob"))
            .json(&json!({ "peer_id": ALICE }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    // ============================================================
    // Test per POST /conversations/{id}/messages - send_message
    // ============================================================

    #[tokio::test]
    async fn test_send_message_updates_previews() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        let response = server
            .post(&format!("/conversations/{}/messages", scenario.alice_carol))
            .add_header(authorization(), bearer(CAROL, "carol"))
            .json(&json!({ "body": "ci sei?" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let message: Value = response.json();
        assert_eq!(message["sender_id"], CAROL);
        assert_eq!(message["is_read"], false);

        let previews: Vec<Value> = server
            .get("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await
            .json();

        // il messaggio appena inviato è il più recente
        assert_eq!(previews[0]["conversation_id"], scenario.alice_carol);
        assert_eq!(previews[0]["last_message"], "ci sei?");
        assert_eq!(previews[0]["unread_count"], 1);
        assert_eq!(previews[1]["conversation_id"], scenario.alice_bob);

        // i propri messaggi non contano come non letti
        let previews: Vec<Value> = server
            .get("/conversations")
            .add_header(authorization(), bearer(CAROL, "carol"))
            .await
            .json();
        assert_eq!(previews[0]["unread_count"], 0);
    }

    #[tokio::test]
    async fn test_send_message_rejections() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        // non membro
        server
            .post(&format!("/conversations/{}/messages", scenario.alice_bob))
            .add_header(authorization(), bearer(CAROL, "carol"))
            .json(&json!({ "body": "intrusione" }))
            .await
            .assert_status_forbidden();

        // corpo vuoto
        server
            .post(&format!("/conversations/{}/messages", scenario.alice_bob))
            .add_header(authorization(), bearer(ALICE, "alice"))
            .json(&json!({ "body": "" }))
            .await
            .assert_status_bad_request();

        // senza token
        server
            .post(&format!("/conversations/{}/messages", scenario.alice_bob))
            .json(&json!({ "body": "ciao" }))
            .await
            .assert_status_forbidden();
    }

    // ============================================================
    // Test per POST /conversations/{id}/read - mark_conversation_read
    // ============================================================

    #[tokio::test]
    async fn test_mark_read_resets_unread_count() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        let response = server
            .post(&format!("/conversations/{}/read", scenario.alice_bob))
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await;

        response.assert_status_ok();
        let result: Value = response.json();
        assert_eq!(result["updated"], 2);

        let previews: Vec<Value> = server
            .get("/conversations")
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await
            .json();
        assert_eq!(previews[0]["conversation_id"], scenario.alice_bob);
        assert_eq!(previews[0]["unread_count"], 0);

        // una seconda marcatura non cambia nulla
        let result: Value = server
            .post(&format!("/conversations/{}/read", scenario.alice_bob))
            .add_header(authorization(), bearer(ALICE, "alice"))
            .await
            .json();
        assert_eq!(result["updated"], 0);
    }

    #[tokio::test]
    async fn test_mark_read_requires_membership() {
        let store = Arc::new(InMemoryStore::new());
        let scenario = seed_scenario(&store);
        let server = create_test_server(create_test_state(store));

        server
            .post(&format!("/conversations/{}/read", scenario.alice_bob))
            .add_header(authorization(), bearer(DAVE, "dave"))
            .await
            .assert_status_forbidden();
    }
}
