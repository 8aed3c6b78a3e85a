use crate::core::{AppError, AppState};
use crate::entities::Session;
use crate::repositories::ConversationStore;
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub username: String,
}

/// Sessione opzionale inserita nelle Extension da `session_middleware`.
/// `None` è uno stato legittimo (utente non autenticato), non un errore.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

#[instrument(skip(secret), fields(username = %username, id = %id))]
pub fn encode_jwt(username: String, id: i32, secret: &str) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(24);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        username,
        id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.username);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

/// Estrae la sessione dall'header `Authorization: Bearer <token>`
fn session_from_request(req: &Request, secret: &str) -> Result<Session, AppError> {
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?,
        None => {
            return Err(AppError::forbidden(
                "Please add the JWT token to the header",
            ));
        }
    };

    let mut header = auth_header.split_whitespace();
    let token = match (header.next(), header.next()) {
        (Some("Bearer"), Some(token)) => token,
        _ => {
            warn!("Malformed authorization header");
            return Err(AppError::unauthorized("Unable to decode token"));
        }
    };

    let token_data =
        decode_jwt(token, secret).map_err(|_| AppError::unauthorized("Unable to decode token"))?;

    Ok(Session {
        user_id: token_data.claims.id,
        username: token_data.claims.username,
    })
}

/// Middleware per le route che richiedono autenticazione: senza token valido la richiesta viene rifiutata
#[instrument(skip(state, req, next))]
pub async fn authentication_middleware<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let session = session_from_request(&req, &state.jwt_secret).inspect_err(|_| {
        warn!("Rejecting unauthenticated request");
    })?;
    info!("User authenticated: {}", session.username);
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Middleware per le route di sola lettura: una sessione assente o non valida
/// diventa `CurrentSession(None)` e la richiesta prosegue
#[instrument(skip(state, req, next))]
pub async fn session_middleware<S: ConversationStore>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Response<Body> {
    debug!("Running session middleware");
    let session = match session_from_request(&req, &state.jwt_secret) {
        Ok(session) => Some(session),
        Err(e) => {
            debug!("No valid session: {}", e.message());
            None
        }
    };
    req.extensions_mut().insert(CurrentSession(session));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let token = encode_jwt("alice".to_string(), 7, "segreto").unwrap();
        let data = decode_jwt(&token, "segreto").unwrap();

        assert_eq!(data.claims.id, 7);
        assert_eq!(data.claims.username, "alice");
        assert!(decode_jwt(&token, "altro segreto").is_err());
    }

    #[test]
    fn test_session_requires_bearer_scheme() {
        let token = encode_jwt("alice".to_string(), 7, "segreto").unwrap();

        let req = http::Request::builder()
            .header(http::header::AUTHORIZATION, format!("Token {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            session_from_request(&req, "segreto").unwrap_err().status(),
            http::StatusCode::UNAUTHORIZED
        );

        let req = http::Request::builder()
            .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let session = session_from_request(&req, "segreto").unwrap();
        assert_eq!(session.user_id, 7);

        let req = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(
            session_from_request(&req, "segreto").unwrap_err().status(),
            http::StatusCode::FORBIDDEN
        );
    }
}
