use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    db::is_unique_violation,
    entity::customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
    error::{AppError, AppResult},
    middleware::auth::{CUSTOMER_ROLE, Identity},
};

/// Read path: never creates a customer. Anonymous callers that have not
/// written to a basket yet resolve to `None`.
pub async fn find_customer<C>(conn: &C, identity: &Identity) -> AppResult<Option<Uuid>>
where
    C: ConnectionTrait,
{
    match identity {
        Identity::Account(user) => Ok(Some(user.user_id)),
        Identity::Session(token) => Ok(Customers::find()
            .filter(CustomerCol::SessionKey.eq(token.as_str()))
            .one(conn)
            .await?
            .map(|customer| customer.id)),
    }
}

/// Write path: binds an anonymous customer to the session token on first use.
/// Concurrent first writes from the same session converge on one row through
/// the unique `session_key` constraint.
pub async fn find_or_create_customer(
    txn: &DatabaseTransaction,
    identity: &Identity,
) -> AppResult<Uuid> {
    let token = match identity {
        Identity::Account(user) => {
            let exists = Customers::find_by_id(user.user_id).one(txn).await?;
            return exists.map(|c| c.id).ok_or(AppError::Unauthorized);
        }
        Identity::Session(token) => token,
    };

    if let Some(id) = find_customer(txn, identity).await? {
        return Ok(id);
    }

    let savepoint = txn.begin().await?;
    let inserted = CustomerActive {
        id: Set(Uuid::new_v4()),
        email: Set(None),
        password_hash: Set(None),
        session_key: Set(Some(token.clone())),
        full_name: Set(None),
        role: Set(CUSTOMER_ROLE.to_string()),
        created_at: NotSet,
    }
    .insert(&savepoint)
    .await;

    match inserted {
        Ok(customer) => {
            savepoint.commit().await?;
            tracing::info!(customer_id = %customer.id, "anonymous customer created");
            Ok(customer.id)
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            find_customer(txn, identity)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session customer vanished")))
        }
        Err(err) => Err(err.into()),
    }
}

/// Row lock on the customer. Every basket and order mutation takes it first,
/// which serializes them per customer.
pub async fn lock_customer(txn: &DatabaseTransaction, customer_id: Uuid) -> AppResult<()> {
    Customers::find_by_id(customer_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(())
}
