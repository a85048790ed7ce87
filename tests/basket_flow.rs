use menu_order_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        basket::{AddToBasketRequest, MAX_LINE_QUANTITY, RemoveFromBasketRequest},
        menu::{ArchiveItemRequest, CreateMenuItemRequest, UpdateMenuItemRequest},
        orders::OrderDetailsRequest,
    },
    entity::{
        categories::ActiveModel as CategoryActive,
        customers::Entity as Customers,
        orders::{Column as OrderCol, Entity as Orders, OrderStatus},
    },
    error::AppError,
    middleware::auth::{AuthUser, CUSTOMER_ROLE, Identity, STAFF_ROLE, decode_bearer},
    models::MenuItem,
    services::{auth_service, basket_service, catalog_service, order_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tokio::sync::Mutex;
use uuid::Uuid;

// Migrations are re-runnable but not safe to run concurrently.
static MIGRATED: Mutex<bool> = Mutex::const_new(false);

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run basket flow tests.");
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    {
        let mut migrated = MIGRATED.lock().await;
        if !*migrated {
            run_migrations(&orm).await?;
            *migrated = true;
        }
    }

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
    };
    Ok(Some(AppState::new(orm, config)))
}

fn staff() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: STAFF_ROLE.into(),
    }
}

fn fresh_session() -> Identity {
    Identity::Session(Uuid::new_v4().simple().to_string())
}

async fn create_item(state: &AppState, price: &str, discount: &str) -> anyhow::Result<MenuItem> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("category-{}", Uuid::new_v4())),
    }
    .insert(&state.orm)
    .await?;

    let resp = catalog_service::create_item(
        state,
        &staff(),
        CreateMenuItemRequest {
            name: format!("item-{}", Uuid::new_v4()),
            description: None,
            price: price.parse()?,
            discount: Some(discount.parse()?),
            category_id: category.id,
            available: None,
            tag_ids: Vec::new(),
        },
    )
    .await?;
    Ok(resp.data.expect("item"))
}

async fn add(state: &AppState, identity: &Identity, id: Uuid, count: i32) -> Result<i32, AppError> {
    let resp = basket_service::add_to_basket(state, identity, AddToBasketRequest { id, count }).await?;
    Ok(resp.data.expect("line").quantity)
}

async fn active_order_id(state: &AppState, identity: &Identity) -> anyhow::Result<Uuid> {
    let orders = order_service::list_orders(state, identity).await?;
    let order = orders
        .data
        .expect("orders")
        .items
        .into_iter()
        .find(|o| o.order.status == OrderStatus::Active)
        .expect("active order");
    Ok(order.order.id)
}

#[tokio::test]
async fn repeated_adds_accumulate_on_one_line() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "5.00", "0").await?;
    let me = fresh_session();

    assert_eq!(add(&state, &me, item.id, 2).await?, 2);
    assert_eq!(add(&state, &me, item.id, 2).await?, 4);

    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 4);
    assert_eq!(basket.items[0].item.id, item.id);
    Ok(())
}

#[tokio::test]
async fn line_keeps_price_captured_at_first_add() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "10.00", "2.00").await?;
    let me = fresh_session();

    add(&state, &me, item.id, 1).await?;
    catalog_service::update_item(
        &state,
        &staff(),
        item.id,
        UpdateMenuItemRequest {
            price: Some("20.00".parse()?),
            ..Default::default()
        },
    )
    .await?;
    add(&state, &me, item.id, 1).await?;

    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert_eq!(basket.items[0].sale_price, "8.00".parse::<Decimal>()?);
    assert_eq!(basket.items[0].quantity, 2);

    // A fresh basket sees the new price.
    let other = fresh_session();
    add(&state, &other, item.id, 1).await?;
    let basket = basket_service::get_basket(&state, &other).await?.data.expect("basket");
    assert_eq!(basket.items[0].sale_price, "18.00".parse::<Decimal>()?);
    Ok(())
}

#[tokio::test]
async fn removing_last_line_drops_the_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let first = create_item(&state, "4.00", "0").await?;
    let second = create_item(&state, "6.00", "0").await?;
    let me = fresh_session();

    add(&state, &me, first.id, 3).await?;
    add(&state, &me, second.id, 1).await?;

    let resp = basket_service::remove_from_basket(
        &state,
        &me,
        first.id,
        RemoveFromBasketRequest { id: Some(first.id), count: 1 },
    )
    .await?;
    let lines = resp.data.expect("basket").items;
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines.iter().find(|l| l.item.id == first.id).map(|l| l.quantity),
        Some(2)
    );

    // Over-removal deletes the line.
    basket_service::remove_from_basket(
        &state,
        &me,
        first.id,
        RemoveFromBasketRequest { id: None, count: 10 },
    )
    .await?;
    let resp = basket_service::remove_from_basket(
        &state,
        &me,
        second.id,
        RemoveFromBasketRequest { id: None, count: 1 },
    )
    .await?;
    assert!(resp.data.expect("basket").items.is_empty());

    // Reading the basket afterwards is not an error.
    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert!(basket.items.is_empty());

    let orders = order_service::list_orders(&state, &me).await?.data.expect("orders");
    assert!(orders.items.is_empty());

    let err = basket_service::remove_from_basket(
        &state,
        &me,
        second.id,
        RemoveFromBasketRequest { id: None, count: 1 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    Ok(())
}

#[tokio::test]
async fn mismatched_body_id_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "4.00", "0").await?;
    let me = fresh_session();
    add(&state, &me, item.id, 1).await?;

    let err = basket_service::remove_from_basket(
        &state,
        &me,
        item.id,
        RemoveFromBasketRequest { id: Some(Uuid::new_v4()), count: 1 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn concurrent_first_adds_share_one_active_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "3.00", "0").await?;
    let me = fresh_session();

    let (a, b) = tokio::join!(add(&state, &me, item.id, 1), add(&state, &me, item.id, 1));
    a?;
    b?;

    let order_id = active_order_id(&state, &me).await?;
    let order = Orders::find_by_id(order_id).one(&state.orm).await?.expect("order");
    let active = Orders::find()
        .filter(OrderCol::CustomerId.eq(order.customer_id))
        .filter(OrderCol::Status.eq(OrderStatus::Active))
        .count(&state.orm)
        .await?;
    assert_eq!(active, 1);

    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 2);
    Ok(())
}

#[tokio::test]
async fn archived_item_cannot_be_added() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "4.00", "0").await?;
    catalog_service::archive_item(&state, &staff(), ArchiveItemRequest { id: item.id }).await?;

    let err = add(&state, &fresh_session(), item.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Still reachable by id for order history.
    let fetched = catalog_service::get_menu_item(&state, item.id).await?;
    assert!(fetched.data.expect("item").archived);
    Ok(())
}

#[tokio::test]
async fn finalize_then_attach_details() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let pizza = create_item(&state, "10.00", "2.00").await?;
    let soup = create_item(&state, "5.00", "0").await?;
    let me = fresh_session();

    add(&state, &me, pizza.id, 2).await?;
    add(&state, &me, soup.id, 1).await?;

    // Details cannot skip the pending step.
    let active_id = active_order_id(&state, &me).await?;
    let err = order_service::attach_details(&state, &me, active_id, OrderDetailsRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let receipt = order_service::finalize_order(&state, &me).await?.data.expect("receipt");
    let order = order_service::get_order(&state, &me, receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.order.total_amount, "21.00".parse::<Decimal>()?);
    assert_eq!(order.total, "21.00".parse::<Decimal>()?);

    // The basket is empty again once the order left `active`.
    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert!(basket.items.is_empty());

    order_service::attach_details(
        &state,
        &me,
        receipt.order_id,
        OrderDetailsRequest {
            full_name: Some("Ana Lima".into()),
            payment_type: Some("card".into()),
            address: Some("Rua Augusta 1".into()),
            ..Default::default()
        },
    )
    .await?;
    order_service::attach_details(
        &state,
        &me,
        receipt.order_id,
        OrderDetailsRequest {
            city: Some("Lisbon".into()),
            ..Default::default()
        },
    )
    .await?;

    let order = order_service::get_order(&state, &me, receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.status, OrderStatus::Payment);
    assert_eq!(order.order.city.as_deref(), Some("Lisbon"));
    assert_eq!(order.order.address.as_deref(), Some("Rua Augusta 1"));
    assert_eq!(order.order.payment_type.as_deref(), Some("card"));
    assert!(order.order.delivery_type.is_none());

    let customer = Customers::find_by_id(order.order.customer_id)
        .one(&state.orm)
        .await?
        .expect("customer");
    assert_eq!(customer.full_name.as_deref(), Some("Ana Lima"));
    assert_eq!(order.order.total_amount, "21.00".parse::<Decimal>()?);
    Ok(())
}

#[tokio::test]
async fn finalize_without_basket_is_invalid_state() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let err = order_service::finalize_order(&state, &fresh_session())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    Ok(())
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "2.00", "0").await?;
    let owner = fresh_session();
    add(&state, &owner, item.id, 1).await?;
    let receipt = order_service::finalize_order(&state, &owner).await?.data.expect("receipt");

    let stranger = fresh_session();
    add(&state, &stranger, item.id, 1).await?;
    let err = order_service::get_order(&state, &stranger, receipt.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn registered_customer_shops_with_bearer_token() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "7.00", "0").await?;
    let email = format!("{}@example.com", Uuid::new_v4().simple());

    auth_service::register_customer(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "long-enough".into(),
            full_name: None,
        },
    )
    .await?;
    let duplicate = auth_service::register_customer(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "long-enough".into(),
            full_name: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(duplicate, AppError::BadRequest(_)));

    let login = auth_service::login_customer(
        &state,
        LoginRequest {
            email,
            password: "long-enough".into(),
        },
    )
    .await?;
    let token = login.data.expect("token").token;
    let user = decode_bearer(&token, &state.config.jwt_secret)?;
    assert_eq!(user.role, CUSTOMER_ROLE);

    let err = catalog_service::archive_item(&state, &user, ArchiveItemRequest { id: item.id })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let me = Identity::Account(user);
    assert_eq!(add(&state, &me, item.id, 1).await?, 1);
    let receipt = order_service::finalize_order(&state, &me).await?.data.expect("receipt");
    let order = order_service::get_order(&state, &me, receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.total, "7.00".parse::<Decimal>()?);
    Ok(())
}

#[tokio::test]
async fn line_quantity_is_capped() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "1.00", "0").await?;
    let me = fresh_session();

    assert_eq!(add(&state, &me, item.id, MAX_LINE_QUANTITY).await?, MAX_LINE_QUANTITY);
    let err = add(&state, &me, item.id, 1).await.unwrap_err();
    match err {
        AppError::Validation(errors) => assert!(errors.field_errors().contains_key("count")),
        other => panic!("expected a count validation error, got {other:?}"),
    }

    let err = add(&state, &me, item.id, i32::MAX).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The rejected adds left the line as it was.
    let basket = basket_service::get_basket(&state, &me).await?.data.expect("basket");
    assert_eq!(basket.items[0].quantity, MAX_LINE_QUANTITY);
    Ok(())
}

#[tokio::test]
async fn oversized_price_is_a_validation_error() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let item = create_item(&state, "10.00", "0").await?;

    let err = catalog_service::update_item(
        &state,
        &staff(),
        item.id,
        UpdateMenuItemRequest {
            price: Some("100000000000.00".parse()?),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = create_item(&state, "100000000000.00", "0").await.unwrap_err();
    let err = err.downcast::<AppError>()?;
    assert!(matches!(err, AppError::Validation(_)));
    Ok(())
}
