pub mod auth;
pub mod basket;
pub mod menu;
pub mod orders;
