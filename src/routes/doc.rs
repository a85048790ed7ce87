use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        basket::{AddToBasketRequest, BasketList, RemoveFromBasketRequest},
        menu::{
            ArchiveItemRequest, CategoryList, CreateMenuItemRequest, MenuList, TagList,
            UpdateMenuItemRequest,
        },
        orders::{OrderDetailsRequest, OrderList, OrderReceipt, OrderWithLines},
    },
    entity::orders::OrderStatus,
    error::ErrorData,
    middleware::session::SESSION_HEADER,
    models::{BasketLine, Category, Customer, ItemSummary, MenuItem, Order, Tag},
    response::{ApiResponse, Meta},
    routes::{auth, basket, health, item, menu, order},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(SESSION_HEADER))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        basket::basket_list,
        basket::add_to_basket,
        basket::remove_from_basket,
        order::list_orders,
        order::finalize_order,
        order::get_order,
        order::attach_details,
        menu::list_menu,
        menu::get_menu_item,
        menu::list_categories,
        menu::list_tags,
        item::create_item,
        item::update_item,
        item::archive_item
    ),
    components(
        schemas(
            Customer,
            Category,
            Tag,
            MenuItem,
            ItemSummary,
            BasketLine,
            Order,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToBasketRequest,
            RemoveFromBasketRequest,
            BasketList,
            OrderDetailsRequest,
            OrderReceipt,
            OrderWithLines,
            OrderList,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            ArchiveItemRequest,
            MenuList,
            CategoryList,
            TagList,
            ErrorData,
            Meta,
            ApiResponse<MenuItem>,
            ApiResponse<BasketList>,
            ApiResponse<OrderWithLines>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Basket", description = "Basket endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Menu", description = "Menu, category and tag endpoints"),
        (name = "Items", description = "Staff menu management endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
