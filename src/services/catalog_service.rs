use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{AuditEntry, record},
    dto::menu::{
        ArchiveItemRequest, CategoryList, CreateMenuItemRequest, MenuList, MenuQuery, TagList,
        UpdateMenuItemRequest, check_discount,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        menu_item_tags::{
            ActiveModel as ItemTagActive, Column as ItemTagCol, Entity as MenuItemTags,
        },
        menu_items::{ActiveModel as ItemActive, Column as ItemCol, Entity as MenuItems},
        tags::{Column as TagCol, Entity as Tags},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Category, MenuItem, Tag},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Non-archived, available items, optionally narrowed to one category.
pub async fn list_menu(state: &AppState, query: MenuQuery) -> AppResult<ApiResponse<MenuList>> {
    let mut condition = Condition::all()
        .add(ItemCol::Archived.eq(false))
        .add(ItemCol::Available.eq(true));

    if let Some(name) = query.category.as_ref().filter(|s| !s.is_empty()) {
        let category = Categories::find()
            .filter(CategoryCol::Name.eq(name.as_str()))
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        condition = condition.add(ItemCol::CategoryId.eq(category.id));
    }

    let models = MenuItems::find()
        .filter(condition)
        .order_by_asc(ItemCol::Name)
        .all(&state.orm)
        .await?;
    let tags = models
        .load_many_to_many(Tags, MenuItemTags, &state.orm)
        .await?;

    let items: Vec<MenuItem> = models
        .into_iter()
        .zip(tags)
        .map(|(item, tags)| MenuItem::from_entity(item, tags))
        .collect();

    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Menu", MenuList { items }, Some(meta)))
}

/// Archived items stay reachable here so order history can link to them.
pub async fn get_menu_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<MenuItem>> {
    let item = load_item(&state.orm, id).await?;
    Ok(ApiResponse::success("Menu item", item, None))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Categories", CategoryList { items }, Some(meta)))
}

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items: Vec<Tag> = Tags::find()
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Tag::from)
        .collect();
    let meta = Meta::with_total(items.len());
    Ok(ApiResponse::success("Tags", TagList { items }, Some(meta)))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    ensure_staff(user)?;
    payload.validate()?;
    let discount = payload.discount.unwrap_or(Decimal::ZERO);
    check_discount(payload.price, discount)?;

    let txn = state.orm.begin().await?;
    ensure_category(&txn, payload.category_id).await?;

    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        discount: Set(discount),
        category_id: Set(payload.category_id),
        available: Set(payload.available.unwrap_or(true)),
        archived: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    replace_tags(&txn, item.id, &payload.tag_ids).await?;
    let item = load_item(&txn, item.id).await?;
    txn.commit().await?;

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(user.user_id),
            action: "item_create",
            resource: "menu_items",
            metadata: serde_json::json!({ "item_id": item.id }),
        },
    )
    .await;

    Ok(ApiResponse::success("Item created", item, Some(Meta::empty())))
}

/// Partial update. Prices already captured in basket lines are not touched.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    ensure_staff(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let existing = MenuItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let price = payload.price.unwrap_or(existing.price);
    let discount = payload.discount.unwrap_or(existing.discount);
    check_discount(price, discount)?;

    if let Some(category_id) = payload.category_id {
        ensure_category(&txn, category_id).await?;
    }

    let mut active: ItemActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(available) = payload.available {
        active.available = Set(available);
    }
    active.price = Set(price);
    active.discount = Set(discount);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    if let Some(tag_ids) = payload.tag_ids.as_deref() {
        replace_tags(&txn, id, tag_ids).await?;
    }
    let item = load_item(&txn, id).await?;
    txn.commit().await?;

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(user.user_id),
            action: "item_update",
            resource: "menu_items",
            metadata: serde_json::json!({ "item_id": id }),
        },
    )
    .await;

    Ok(ApiResponse::success("Updated", item, Some(Meta::empty())))
}

/// Soft delete: the row stays for order history.
pub async fn archive_item(
    state: &AppState,
    user: &AuthUser,
    payload: ArchiveItemRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;

    let existing = MenuItems::find_by_id(payload.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ItemActive = existing.into();
    active.archived = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    record(
        &state.pool,
        AuditEntry {
            customer_id: Some(user.user_id),
            action: "item_archive",
            resource: "menu_items",
            metadata: serde_json::json!({ "item_id": payload.id }),
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Archived",
        serde_json::json!({ "id": payload.id }),
        Some(Meta::empty()),
    ))
}

async fn load_item<C>(conn: &C, id: Uuid) -> AppResult<MenuItem>
where
    C: ConnectionTrait,
{
    let item = MenuItems::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let tags = item
        .find_related(Tags)
        .order_by_asc(TagCol::Name)
        .all(conn)
        .await?;
    Ok(MenuItem::from_entity(item, tags))
}

async fn ensure_category(txn: &DatabaseTransaction, category_id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(category_id).one(txn).await?.is_none() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "categoryId",
            validator::ValidationError::new("unknown_category")
                .with_message("category does not exist".into()),
        );
        return Err(errors.into());
    }
    Ok(())
}

async fn replace_tags(txn: &DatabaseTransaction, item_id: Uuid, tag_ids: &[Uuid]) -> AppResult<()> {
    MenuItemTags::delete_many()
        .filter(ItemTagCol::MenuItemId.eq(item_id))
        .exec(txn)
        .await?;
    let wanted: BTreeSet<Uuid> = tag_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let known = Tags::find()
        .filter(TagCol::Id.is_in(wanted.iter().copied()))
        .all(txn)
        .await?;
    if known.len() != wanted.len() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "tagIds",
            validator::ValidationError::new("unknown_tag").with_message("unknown tag id".into()),
        );
        return Err(errors.into());
    }

    MenuItemTags::insert_many(known.into_iter().map(|tag| ItemTagActive {
        menu_item_id: Set(item_id),
        tag_id: Set(tag.id),
    }))
    .exec(txn)
    .await?;
    Ok(())
}
