use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditEntry, record},
    dto::orders::{OrderDetailsRequest, OrderList, OrderReceipt, OrderWithLines},
    entity::{
        customers::{ActiveModel as CustomerActive, Entity as Customers},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
    },
    error::{AppError, AppResult},
    lifecycle::{basket_total, displayed_total},
    middleware::auth::Identity,
    models::{BasketLine, Order},
    response::{ApiResponse, Meta},
    services::{
        basket_service::{find_active_order, line_prices, load_lines, no_active_order},
        identity_service::{find_customer, lock_customer},
    },
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    identity: &Identity,
) -> AppResult<ApiResponse<OrderList>> {
    let Some(customer_id) = find_customer(&state.orm, identity).await? else {
        return Ok(ApiResponse::success(
            "Ok",
            OrderList { items: Vec::new() },
            Some(Meta::with_total(0)),
        ));
    };

    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut lines = load_lines(&state.orm, &ids).await?;

    let items: Vec<OrderWithLines> = orders
        .into_iter()
        .map(|order| {
            let order_lines = lines.remove(&order.id).unwrap_or_default();
            with_lines(order, order_lines)
        })
        .collect();

    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithLines>> {
    let customer_id = find_customer(&state.orm, identity)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = find_owned_order(&state.orm, customer_id, id, false).await?;

    let order_lines = load_lines(&state.orm, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();

    Ok(ApiResponse::success(
        "OK",
        with_lines(order, order_lines),
        Some(Meta::empty()),
    ))
}

/// Closes the caller's basket: computes the total from the snapshotted line
/// prices and moves the order to `pending`.
pub async fn finalize_order(
    state: &AppState,
    identity: &Identity,
) -> AppResult<ApiResponse<OrderReceipt>> {
    let txn = state.orm.begin().await?;

    let customer_id = find_customer(&txn, identity)
        .await?
        .ok_or_else(no_active_order)?;
    lock_customer(&txn, customer_id).await?;

    let order = find_active_order(&txn, customer_id, true)
        .await?
        .ok_or_else(no_active_order)?;

    let total_amount = basket_total(line_prices(&txn, order.id).await?);
    let status = order.status.transition(OrderStatus::Pending)?;

    let mut active: OrderActive = order.into();
    active.total_amount = Set(total_amount);
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = %order.total_amount, "order finalized");
    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer_id),
            action: "order_finalize",
            resource: "orders",
            metadata: serde_json::json!({
                "order_id": order.id,
                "total_amount": order.total_amount,
            }),
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Order finalized",
        OrderReceipt { order_id: order.id },
        Some(Meta::empty()),
    ))
}

/// Merges delivery/payment details into the order and moves it to
/// `payment`. The total is carried forward as is.
pub async fn attach_details(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    payload: OrderDetailsRequest,
) -> AppResult<ApiResponse<OrderReceipt>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    let customer_id = find_customer(&txn, identity)
        .await?
        .ok_or(AppError::NotFound)?;
    lock_customer(&txn, customer_id).await?;

    let order = find_owned_order(&txn, customer_id, id, true).await?;
    let status = order.status.transition(OrderStatus::Payment)?;

    let OrderDetailsRequest {
        full_name,
        payment_type,
        city,
        address,
        delivery_type,
    } = payload;

    if let Some(full_name) = full_name {
        let customer = Customers::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut customer: CustomerActive = customer.into();
        customer.full_name = Set(Some(full_name));
        customer.update(&txn).await?;
    }

    let mut active: OrderActive = order.into();
    if let Some(payment_type) = payment_type {
        active.payment_type = Set(Some(payment_type));
    }
    if let Some(city) = city {
        active.city = Set(Some(city));
    }
    if let Some(address) = address {
        active.address = Set(Some(address));
    }
    if let Some(delivery_type) = delivery_type {
        active.delivery_type = Set(Some(delivery_type));
    }
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "delivery details attached");
    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(customer_id),
            action: "order_details",
            resource: "orders",
            metadata: serde_json::json!({ "order_id": order.id, "status": status.as_str() }),
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Details recorded",
        OrderReceipt { order_id: order.id },
        Some(Meta::empty()),
    ))
}

async fn find_owned_order<C>(
    conn: &C,
    customer_id: Uuid,
    id: Uuid,
    for_update: bool,
) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    let mut finder = Orders::find().filter(
        Condition::all()
            .add(OrderCol::CustomerId.eq(customer_id))
            .add(OrderCol::Id.eq(id)),
    );
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound)
}

fn with_lines(order: OrderModel, lines: Vec<BasketLine>) -> OrderWithLines {
    let total = displayed_total(
        order.status,
        order.total_amount,
        lines.iter().map(|l| (l.sale_price, l.quantity)),
    );
    OrderWithLines {
        order: Order::from(order),
        lines,
        total,
    }
}
