pub mod auth_service;
pub mod basket_service;
pub mod catalog_service;
pub mod identity_service;
pub mod order_service;
