use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

/// Router state that knows the HS256 signing secret.
pub trait JwtSecretProvider {
    fn jwt_secret(&self) -> &str;
}

impl<T: JwtSecretProvider> JwtSecretProvider for Arc<T> {
    fn jwt_secret(&self) -> &str {
        (**self).jwt_secret()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(&token, state.jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired, "token has expired")
            }
            _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
        })?;

    Ok(token_data.claims)
}

pub fn sign_jwt(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
}

/// Signed-in user if a valid bearer token is present, otherwise `None`.
/// Bad or expired tokens degrade to anonymous instead of rejecting.
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

/// Require Admin role
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::new(ErrorCode::Forbidden, "admin privileges required"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::auth::UserRole;
    use axum::http::Request;
    use uuid::Uuid;

    struct TestState;

    impl JwtSecretProvider for TestState {
        fn jwt_secret(&self) -> &str {
            "test-secret"
        }
    }

    fn parts_with(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/reports");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn admin_token_passes_admin_gate() {
        let claims = Claims::new(Uuid::new_v4(), UserRole::Admin, 300);
        let token = sign_jwt(&claims, "test-secret").unwrap();
        let mut parts = parts_with(Some(&token));
        let AdminUser(user) = AdminUser::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert_eq!(user.id, claims.sub);
    }

    #[tokio::test]
    async fn user_token_is_forbidden_for_admin() {
        let claims = Claims::new(Uuid::new_v4(), UserRole::User, 300);
        let token = sign_jwt(&claims, "test-secret").unwrap();
        let mut parts = parts_with(Some(&token));
        let err = AdminUser::from_request_parts(&mut parts, &TestState).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let claims = Claims::new(Uuid::new_v4(), UserRole::Admin, 300);
        let token = sign_jwt(&claims, "other-secret").unwrap();
        let mut parts = parts_with(Some(&token));
        let err = AuthUser::from_request_parts(&mut parts, &TestState).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_for_optional() {
        let mut parts = parts_with(None);
        let OptionalAuthUser(user) = OptionalAuthUser::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert!(user.is_none());

        let err = AuthUser::from_request_parts(&mut parts, &TestState).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
