use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    basket_lines::Model as BasketLineModel, categories::Model as CategoryModel,
    customers::Model as CustomerModel, menu_items::Model as MenuItemModel,
    orders::{Model as OrderModel, OrderStatus},
    tags::Model as TagModel,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount: Decimal,
    pub sale_price: Decimal,
    pub category_id: Uuid,
    pub available: bool,
    pub archived: bool,
    pub tags: Vec<Tag>,
}

/// Item reference embedded in basket lines.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasketLine {
    pub id: Uuid,
    pub item: ItemSummary,
    pub quantity: i32,
    pub sale_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_type: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub delivery_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerModel> for Customer {
    fn from(model: CustomerModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<CategoryModel> for Category {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<TagModel> for Tag {
    fn from(model: TagModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl MenuItem {
    pub fn from_entity(model: MenuItemModel, tags: Vec<TagModel>) -> Self {
        Self {
            id: model.id,
            sale_price: model.sale_price(),
            name: model.name,
            description: model.description,
            price: model.price,
            discount: model.discount,
            category_id: model.category_id,
            available: model.available,
            archived: model.archived,
            tags: tags.into_iter().map(Tag::from).collect(),
        }
    }
}

impl BasketLine {
    pub fn from_entity(line: BasketLineModel, item: ItemSummary) -> Self {
        Self {
            id: line.id,
            item,
            quantity: line.quantity,
            sale_price: line.sale_price,
        }
    }
}

impl From<&MenuItemModel> for ItemSummary {
    fn from(model: &MenuItemModel) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            status: model.status,
            total_amount: model.total_amount,
            payment_type: model.payment_type,
            city: model.city,
            address: model.address,
            delivery_type: model.delivery_type,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
