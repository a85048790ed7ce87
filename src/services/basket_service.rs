use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditEntry, record},
    db::is_unique_violation,
    dto::basket::{AddToBasketRequest, BasketList, MAX_LINE_QUANTITY, RemoveFromBasketRequest},
    entity::{
        basket_lines::{
            ActiveModel as LineActive, Column as LineCol, Entity as BasketLines, Model as LineModel,
        },
        menu_items::{Entity as MenuItems, Model as MenuItemModel},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::Identity,
    models::{BasketLine, ItemSummary},
    response::{ApiResponse, Meta},
    services::identity_service::{find_customer, find_or_create_customer, lock_customer},
    state::AppState,
};

pub async fn get_basket(
    state: &AppState,
    identity: &Identity,
) -> AppResult<ApiResponse<BasketList>> {
    let Some(customer_id) = find_customer(&state.orm, identity).await? else {
        return Ok(ApiResponse::success("OK", BasketList::empty(), Some(Meta::with_total(0))));
    };

    let items = match find_active_order(&state.orm, customer_id, false).await? {
        Some(order) => load_lines(&state.orm, &[order.id])
            .await?
            .remove(&order.id)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("OK", BasketList { items }, Some(meta)))
}

pub async fn add_to_basket(
    state: &AppState,
    identity: &Identity,
    payload: AddToBasketRequest,
) -> AppResult<ApiResponse<BasketLine>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    let item = MenuItems::find_by_id(payload.id)
        .one(&txn)
        .await?
        .filter(MenuItemModel::is_orderable)
        .ok_or(AppError::NotFound)?;

    let customer_id = find_or_create_customer(&txn, identity).await?;
    lock_customer(&txn, customer_id).await?;

    let order = find_or_create_active_order(&txn, customer_id).await?;
    let line = match insert_line(&txn, order.id, &item, payload.count).await? {
        Some(line) => line,
        None => increment_line(&txn, order.id, item.id, payload.count).await?,
    };

    txn.commit().await?;

    tracing::debug!(
        customer_id = %customer_id,
        order_id = %order.id,
        item_id = %item.id,
        quantity = line.quantity,
        "basket line updated"
    );
    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer_id),
            action: "basket_add",
            resource: "basket_lines",
            metadata: serde_json::json!({ "item_id": item.id, "count": payload.count }),
        },
    )
    .await;

    let summary = ItemSummary::from(&item);
    Ok(ApiResponse::success(
        "Added to basket",
        BasketLine::from_entity(line, summary),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_basket(
    state: &AppState,
    identity: &Identity,
    item_id: Uuid,
    payload: RemoveFromBasketRequest,
) -> AppResult<ApiResponse<BasketList>> {
    payload.validate()?;
    if payload.id.is_some_and(|body_id| body_id != item_id) {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "id",
            validator::ValidationError::new("id_mismatch")
                .with_message("item id in body does not match path".into()),
        );
        return Err(errors.into());
    }

    let txn = state.orm.begin().await?;

    let customer_id = find_customer(&txn, identity)
        .await?
        .ok_or_else(no_active_order)?;
    lock_customer(&txn, customer_id).await?;

    let order = find_active_order(&txn, customer_id, true)
        .await?
        .ok_or_else(no_active_order)?;

    let line = BasketLines::find()
        .filter(
            Condition::all()
                .add(LineCol::OrderId.eq(order.id))
                .add(LineCol::MenuItemId.eq(item_id)),
        )
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut order_deleted = false;
    if payload.count < line.quantity {
        let remaining = line.quantity - payload.count;
        let mut active: LineActive = line.into();
        active.quantity = Set(remaining);
        active.update(&txn).await?;
    } else {
        BasketLines::delete_by_id(line.id).exec(&txn).await?;
        let left = BasketLines::find()
            .filter(LineCol::OrderId.eq(order.id))
            .count(&txn)
            .await?;
        if left == 0 {
            Orders::delete_by_id(order.id).exec(&txn).await?;
            order_deleted = true;
        }
    }

    let items = if order_deleted {
        Vec::new()
    } else {
        load_lines(&txn, &[order.id])
            .await?
            .remove(&order.id)
            .unwrap_or_default()
    };

    txn.commit().await?;

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer_id),
            action: "basket_remove",
            resource: "basket_lines",
            metadata: serde_json::json!({
                "item_id": item_id,
                "count": payload.count,
                "order_deleted": order_deleted,
            }),
        },
    )
    .await;

    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Removed from basket", BasketList { items }, Some(meta)))
}

pub(crate) fn no_active_order() -> AppError {
    AppError::InvalidState("customer has no active order".into())
}

pub(crate) async fn find_active_order<C>(
    conn: &C,
    customer_id: Uuid,
    for_update: bool,
) -> AppResult<Option<OrderModel>>
where
    C: ConnectionTrait,
{
    let mut finder = Orders::find().filter(
        Condition::all()
            .add(OrderCol::CustomerId.eq(customer_id))
            .add(OrderCol::Status.eq(OrderStatus::Active)),
    );
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.one(conn).await?)
}

/// Lines of the given orders keyed by order id, oldest line first.
pub(crate) async fn load_lines<C>(
    conn: &C,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<BasketLine>>>
where
    C: ConnectionTrait,
{
    let rows = BasketLines::find()
        .filter(LineCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(LineCol::CreatedAt)
        .find_also_related(MenuItems)
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<BasketLine>> = HashMap::new();
    for (line, item) in rows {
        let summary = match &item {
            Some(item) => ItemSummary::from(item),
            None => ItemSummary {
                id: line.menu_item_id,
                name: String::new(),
            },
        };
        grouped
            .entry(line.order_id)
            .or_default()
            .push(BasketLine::from_entity(line, summary));
    }
    Ok(grouped)
}

/// Snapshot pairs used for totals.
pub(crate) async fn line_prices<C>(conn: &C, order_id: Uuid) -> AppResult<Vec<(Decimal, i32)>>
where
    C: ConnectionTrait,
{
    let lines: Vec<(Decimal, i32)> = BasketLines::find()
        .select_only()
        .column(LineCol::SalePrice)
        .column(LineCol::Quantity)
        .filter(LineCol::OrderId.eq(order_id))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(lines)
}

async fn find_or_create_active_order(
    txn: &DatabaseTransaction,
    customer_id: Uuid,
) -> AppResult<OrderModel> {
    if let Some(order) = find_active_order(txn, customer_id, true).await? {
        return Ok(order);
    }

    let savepoint = txn.begin().await?;
    let inserted = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        status: Set(OrderStatus::Active),
        total_amount: Set(Decimal::ZERO),
        payment_type: Set(None),
        city: Set(None),
        address: Set(None),
        delivery_type: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&savepoint)
    .await;

    match inserted {
        Ok(order) => {
            savepoint.commit().await?;
            tracing::info!(customer_id = %customer_id, order_id = %order.id, "basket opened");
            Ok(order)
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            find_active_order(txn, customer_id, true)
                .await?
                .ok_or_else(no_active_order)
        }
        Err(err) => Err(err.into()),
    }
}

/// Inserts a new line with the current sale price captured. Returns `None`
/// when a line for this item already exists on the order.
async fn insert_line(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    item: &MenuItemModel,
    count: i32,
) -> AppResult<Option<LineModel>> {
    let exists = BasketLines::find()
        .filter(
            Condition::all()
                .add(LineCol::OrderId.eq(order_id))
                .add(LineCol::MenuItemId.eq(item.id)),
        )
        .count(txn)
        .await?;
    if exists > 0 {
        return Ok(None);
    }

    let savepoint = txn.begin().await?;
    let inserted = LineActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        menu_item_id: Set(item.id),
        quantity: Set(count),
        sale_price: Set(item.sale_price()),
        created_at: NotSet,
    }
    .insert(&savepoint)
    .await;

    match inserted {
        Ok(line) => {
            savepoint.commit().await?;
            Ok(Some(line))
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Adds to an existing line. The stored sale price is left untouched.
/// The caller holds the customer lock, so the read-check-update is not racy.
async fn increment_line(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    item_id: Uuid,
    count: i32,
) -> AppResult<LineModel> {
    let filter = Condition::all()
        .add(LineCol::OrderId.eq(order_id))
        .add(LineCol::MenuItemId.eq(item_id));

    let line = BasketLines::find()
        .filter(filter.clone())
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if line
        .quantity
        .checked_add(count)
        .is_none_or(|total| total > MAX_LINE_QUANTITY)
    {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "count",
            validator::ValidationError::new("line_quantity_limit")
                .with_message("basket line quantity cannot exceed 10000".into()),
        );
        return Err(errors.into());
    }

    BasketLines::update_many()
        .col_expr(LineCol::Quantity, Expr::col(LineCol::Quantity).add(count))
        .filter(filter.clone())
        .exec(txn)
        .await?;

    BasketLines::find()
        .filter(filter)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}
