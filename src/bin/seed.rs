use std::env;

use menu_order_api::{
    db::{DbPool, create_orm_conn, run_migrations},
    middleware::auth::STAFF_ROLE,
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct MenuRow {
    category: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    #[serde(default)]
    discount: Decimal,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,menu_order_api=debug,seed=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = env::var("DATABASE_URL")?;
    let menu_file = env::var("MENU_FILE").unwrap_or_else(|_| "data/menu.json".to_string());

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool().clone();

    let raw = tokio::fs::read_to_string(&menu_file).await?;
    let rows: Vec<MenuRow> = serde_json::from_str(&raw)?;
    let inserted = import_menu(&pool, &rows).await?;
    tracing::info!(file = %menu_file, rows = rows.len(), inserted, "menu imported");

    if let (Ok(email), Ok(password)) = (env::var("STAFF_EMAIL"), env::var("STAFF_PASSWORD")) {
        let staff_id = ensure_staff(&pool, &email, &password).await?;
        tracing::info!(%staff_id, %email, "staff account ready");
    }

    Ok(())
}

/// Rows whose name already exists in the same category are skipped, so the
/// import can be re-run.
async fn import_menu(pool: &DbPool, rows: &[MenuRow]) -> anyhow::Result<u64> {
    let mut inserted = 0;
    for row in rows {
        if row.price.is_sign_negative() || row.discount > row.price {
            tracing::warn!(name = %row.name, "skipping row with invalid price/discount");
            continue;
        }

        let (category_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO categories (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.category.trim())
        .fetch_one(pool)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO menu_items (id, name, description, price, discount, category_id)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (
                SELECT 1 FROM menu_items WHERE name = $2 AND category_id = $6
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.name.trim())
        .bind(row.description.as_deref())
        .bind(row.price)
        .bind(row.discount)
        .bind(category_id)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// Creates the staff account, or promotes an existing one and resets its
/// password to `password`.
async fn ensure_staff(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO customers (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET role = EXCLUDED.role, password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.trim().to_lowercase())
    .bind(password_hash)
    .bind(STAFF_ROLE)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    #[tokio::test]
    async fn existing_account_is_promoted_with_new_password() -> anyhow::Result<()> {
        let Ok(database_url) =
            env::var("TEST_DATABASE_URL").or_else(|_| env::var("DATABASE_URL"))
        else {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run seed tests.");
            return Ok(());
        };
        let orm = create_orm_conn(&database_url).await?;
        run_migrations(&orm).await?;
        let pool = orm.get_postgres_connection_pool().clone();
        let email = format!("{}@example.com", Uuid::new_v4().simple());

        sqlx::query("INSERT INTO customers (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(&email)
            .bind(hash_password("old-password")?)
            .execute(&pool)
            .await?;

        let id = ensure_staff(&pool, &email, "new-password").await?;

        let (role, hash): (String, String) =
            sqlx::query_as("SELECT role, password_hash FROM customers WHERE id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(role, STAFF_ROLE);
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"new-password", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"old-password", &parsed).is_err());
        Ok(())
    }
}
