use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::AppError,
    middleware::session::{SESSION_HEADER, is_valid_session_token},
    state::AppState,
};

pub const CUSTOMER_ROLE: &str = "customer";
pub const STAFF_ROLE: &str = "staff";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

/// Who is calling. Account callers carry a verified bearer token; anonymous
/// callers are identified by the session token the server issued them.
#[derive(Debug, Clone)]
pub enum Identity {
    Account(AuthUser),
    Session(String),
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, STAFF_ROLE)
}

pub fn decode_bearer(auth_str: &str, secret: &str) -> Result<AuthUser, AppError> {
    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
    }
    let token = auth_str.trim_start_matches("Bearer ").trim();

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

fn bearer_from_parts(parts: &Parts, secret: &str) -> Option<Result<AuthUser, AppError>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;
    let result = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))
        .and_then(|auth_str| decode_bearer(auth_str, secret));
    Some(result)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_from_parts(parts, &state.config.jwt_secret).unwrap_or(Err(AppError::Unauthorized))
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = bearer_from_parts(parts, &state.config.jwt_secret) {
            return user.map(Identity::Account);
        }

        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if !is_valid_session_token(token) {
            return Err(AppError::BadRequest("Invalid session token".into()));
        }
        Ok(Identity::Session(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(sub: &str, role: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn bearer_resolves_account() {
        let id = Uuid::new_v4();
        let token = token_for(&id.to_string(), STAFF_ROLE, "secret");
        let user = decode_bearer(&format!("Bearer {token}"), "secret").unwrap();
        assert_eq!(user.user_id, id);
        assert!(ensure_staff(&user).is_ok());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = token_for(&Uuid::new_v4().to_string(), CUSTOMER_ROLE, "other");
        let err = decode_bearer(&format!("Bearer {token}"), "secret").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        assert!(decode_bearer("Basic abc", "secret").is_err());
    }

    #[test]
    fn customers_are_not_staff() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: CUSTOMER_ROLE.into(),
        };
        assert!(matches!(ensure_staff(&user), Err(AppError::Forbidden)));
    }
}
