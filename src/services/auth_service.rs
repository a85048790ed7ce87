use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditEntry, record},
    db::is_unique_violation,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
    error::{AppError, AppResult},
    middleware::auth::CUSTOMER_ROLE,
    models::Customer,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn issue_token(customer_id: Uuid, role: &str, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: customer_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_customer(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<Customer>> {
    payload.validate()?;
    let RegisterRequest {
        email,
        password,
        full_name,
    } = payload;
    let email = email.trim().to_lowercase();

    let password_hash = hash_password(&password)?;
    let inserted = CustomerActive {
        id: Set(Uuid::new_v4()),
        email: Set(Some(email)),
        password_hash: Set(Some(password_hash)),
        session_key: Set(None),
        full_name: Set(full_name),
        role: Set(CUSTOMER_ROLE.to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    let customer = match inserted {
        Ok(customer) => customer,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::BadRequest("Email is already taken".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer.id),
            action: "customer_register",
            resource: "customers",
            metadata: serde_json::json!({ "customer_id": customer.id }),
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Customer created",
        Customer::from(customer),
        Some(Meta::empty()),
    ))
}

pub async fn login_customer(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let invalid = || AppError::BadRequest("Invalid email or password".into());

    let customer = Customers::find()
        .filter(CustomerCol::Email.eq(email.trim().to_lowercase()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    let stored = customer.password_hash.as_deref().ok_or_else(invalid)?;
    let parsed_hash = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    let token = issue_token(
        customer.id,
        &customer.role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer.id),
            action: "customer_login",
            resource: "customers",
            metadata: serde_json::json!({ "customer_id": customer.id }),
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::{STAFF_ROLE, decode_bearer};

    #[test]
    fn issued_token_round_trips_through_bearer_decoding() {
        let id = Uuid::new_v4();
        let token = issue_token(id, STAFF_ROLE, "s3cret", 1).unwrap();
        let user = decode_bearer(&format!("Bearer {token}"), "s3cret").unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, STAFF_ROLE);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
