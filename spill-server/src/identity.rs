//! Voter identity.
//!
//! Signed-in users vote as themselves. Everyone else gets a pseudonymous
//! `anon_xxxxxxxxxxxxx` identifier that the client keeps and sends back in the
//! `X-Vote-Identifier` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use spill_shared::errors::AppError;
use spill_shared::middleware::{JwtSecretProvider, OptionalAuthUser};

pub const IDENTITY_KEY: &str = "vote_identifier";
pub const IDENTITY_HEADER: HeaderName = HeaderName::from_static("x-vote-identifier");

const ANON_PREFIX: &str = "anon_";
const ANON_SUFFIX_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterIdentity {
    User(Uuid),
    Anonymous(String),
}

impl VoterIdentity {
    /// Value recorded as `reporter_identifier` and echoed to clients.
    pub fn as_identifier(&self) -> String {
        match self {
            VoterIdentity::User(id) => id.to_string(),
            VoterIdentity::Anonymous(anon) => anon.clone(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            VoterIdentity::User(id) => Some(*id),
            VoterIdentity::Anonymous(_) => None,
        }
    }
}

/// Client-side key/value persistence for the anonymous identifier.
pub trait ClientStorage {
    fn get(&self, key: &str) -> Option<String>;
    /// Returns `false` when the value could not be persisted.
    fn set(&mut self, key: &str, value: &str) -> bool;
}

pub fn generate_anonymous_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ANON_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{ANON_PREFIX}{suffix}")
}

/// Accepts identifiers this service could have issued. Older clients produced
/// shorter suffixes, so anything from 1 to 32 base-36 characters is honoured.
pub fn is_valid_anonymous_id(value: &str) -> bool {
    value
        .strip_prefix(ANON_PREFIX)
        .map(|suffix| {
            (1..=32).contains(&suffix.len())
                && suffix.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        })
        .unwrap_or(false)
}

/// Stored identifier if present and well formed, otherwise a new one which is
/// persisted on a best-effort basis.
pub fn get_or_create_identity<S: ClientStorage>(storage: &mut S) -> String {
    if let Some(existing) = storage.get(IDENTITY_KEY).filter(|v| is_valid_anonymous_id(v)) {
        return existing;
    }

    let fresh = generate_anonymous_id();
    if !storage.set(IDENTITY_KEY, &fresh) {
        tracing::warn!("could not persist anonymous vote identifier");
    }
    fresh
}

/// Request headers as client storage. Writes are collected so they can be
/// echoed back on the response.
#[derive(Debug, Default)]
pub struct HeaderStorage {
    incoming: Option<String>,
    issued: Option<String>,
}

impl HeaderStorage {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let incoming = headers
            .get(&IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());
        Self { incoming, issued: None }
    }

    pub fn issued(&self) -> Option<&str> {
        self.issued.as_deref()
    }
}

impl ClientStorage for HeaderStorage {
    fn get(&self, key: &str) -> Option<String> {
        (key == IDENTITY_KEY).then(|| self.incoming.clone()).flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        if key != IDENTITY_KEY {
            return false;
        }
        self.issued = Some(value.to_string());
        true
    }
}

/// Who is acting on this request.
#[derive(Debug, Clone)]
pub struct Voter {
    pub identity: VoterIdentity,
    /// Set when a new anonymous identifier was minted for this request.
    pub issued: Option<String>,
}

impl Voter {
    pub fn is_new(&self) -> bool {
        self.issued.is_some()
    }

    /// Header to attach so the client can persist a freshly issued identity.
    pub fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.issued.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(IDENTITY_HEADER, value);
        }
        headers
    }

    /// JSON response carrying the identity header when one was just issued.
    /// Handlers taking a `Voter` answer through this so no minted id is lost.
    pub fn respond<T: Serialize>(&self, body: T) -> Response {
        (self.response_headers(), Json(body)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Voter
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuthUser(user) = OptionalAuthUser::from_request_parts(parts, state).await?;
        if let Some(user) = user {
            return Ok(Self { identity: VoterIdentity::User(user.id), issued: None });
        }

        let mut storage = HeaderStorage::from_headers(&parts.headers);
        let anon = get_or_create_identity(&mut storage);
        let issued = storage.issued().map(str::to_string);
        Ok(Self { identity: VoterIdentity::Anonymous(anon), issued })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStorage {
        values: HashMap<String, String>,
        read_only: bool,
    }

    impl ClientStorage for MemoryStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.values.get(key).cloned()
        }

        fn set(&mut self, key: &str, value: &str) -> bool {
            if self.read_only {
                return false;
            }
            self.values.insert(key.to_string(), value.to_string());
            true
        }
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = generate_anonymous_id();
        assert!(id.starts_with("anon_"));
        assert_eq!(id.len(), 5 + 13);
        assert!(is_valid_anonymous_id(&id));
    }

    #[test]
    fn identity_is_stable_once_stored() {
        let mut storage = MemoryStorage::default();
        let first = get_or_create_identity(&mut storage);
        let second = get_or_create_identity(&mut storage);
        assert_eq!(first, second);
        assert_eq!(storage.values.get(IDENTITY_KEY), Some(&first));
    }

    #[test]
    fn existing_identifier_is_reused() {
        let mut storage = MemoryStorage::default();
        storage.values.insert(IDENTITY_KEY.into(), "anon_ab12".into());
        assert_eq!(get_or_create_identity(&mut storage), "anon_ab12");
    }

    #[test]
    fn malformed_identifier_is_replaced() {
        let mut storage = MemoryStorage::default();
        storage.values.insert(IDENTITY_KEY.into(), "'; drop table".into());
        let id = get_or_create_identity(&mut storage);
        assert!(is_valid_anonymous_id(&id));
        assert_ne!(id, "'; drop table");
    }

    #[test]
    fn write_failure_still_returns_identity() {
        let mut storage = MemoryStorage { read_only: true, ..Default::default() };
        let id = get_or_create_identity(&mut storage);
        assert!(is_valid_anonymous_id(&id));
        assert!(storage.values.is_empty());
    }

    #[test]
    fn header_storage_records_issued_value() {
        let mut headers = HeaderMap::new();
        let mut storage = HeaderStorage::from_headers(&headers);
        let id = get_or_create_identity(&mut storage);
        assert_eq!(storage.issued(), Some(id.as_str()));

        headers.insert(IDENTITY_HEADER, HeaderValue::from_str(&id).unwrap());
        let mut storage = HeaderStorage::from_headers(&headers);
        assert_eq!(get_or_create_identity(&mut storage), id);
        assert!(storage.issued().is_none());
    }

    struct TestState;

    impl JwtSecretProvider for TestState {
        fn jwt_secret(&self) -> &str {
            "test-secret"
        }
    }

    fn parts_with(headers: &[(HeaderName, String)]) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/confessions/x/reports");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn fresh_identity_is_echoed_on_response() {
        let mut parts = parts_with(&[]);
        let voter = Voter::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert!(voter.is_new());

        let response = voter.respond(serde_json::json!({ "ok": true }));
        let echoed = response.headers().get(&IDENTITY_HEADER).unwrap().to_str().unwrap();
        assert_eq!(echoed, voter.identity.as_identifier());
        assert!(is_valid_anonymous_id(echoed));
    }

    #[tokio::test]
    async fn known_identity_is_not_echoed() {
        let mut parts = parts_with(&[(IDENTITY_HEADER, "anon_ab12".to_string())]);
        let voter = Voter::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert_eq!(voter.identity, VoterIdentity::Anonymous("anon_ab12".into()));
        assert!(!voter.is_new());
        assert!(voter.respond(()).headers().get(&IDENTITY_HEADER).is_none());
    }

    #[tokio::test]
    async fn repeated_requests_keep_the_echoed_identity() {
        let mut first = parts_with(&[]);
        let issued = Voter::from_request_parts(&mut first, &TestState).await.unwrap();
        let echoed = issued.respond(()).headers()[&IDENTITY_HEADER].to_str().unwrap().to_string();

        let mut second = parts_with(&[(IDENTITY_HEADER, echoed.clone())]);
        let again = Voter::from_request_parts(&mut second, &TestState).await.unwrap();
        assert_eq!(again.identity.as_identifier(), echoed);
        assert!(!again.is_new());
    }

    #[tokio::test]
    async fn signed_in_user_votes_as_themselves() {
        use spill_shared::middleware::sign_jwt;
        use spill_shared::types::auth::{Claims, UserRole};

        let user_id = Uuid::new_v4();
        let token = sign_jwt(&Claims::new(user_id, UserRole::User, 300), "test-secret").unwrap();
        let mut parts = parts_with(&[(axum::http::header::AUTHORIZATION, format!("Bearer {token}"))]);
        let voter = Voter::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert_eq!(voter.identity, VoterIdentity::User(user_id));
        assert!(voter.respond(()).headers().get(&IDENTITY_HEADER).is_none());
    }

    #[test]
    fn validity_rules() {
        assert!(is_valid_anonymous_id("anon_x"));
        assert!(!is_valid_anonymous_id("anon_"));
        assert!(!is_valid_anonymous_id("anon_ABC"));
        assert!(!is_valid_anonymous_id("user_abc"));
        assert!(!is_valid_anonymous_id(&format!("anon_{}", "a".repeat(33))));
    }
}
