pub mod basket_lines;
pub mod categories;
pub mod customers;
pub mod menu_item_tags;
pub mod menu_items;
pub mod orders;
pub mod tags;

pub use basket_lines::Entity as BasketLines;
pub use categories::Entity as Categories;
pub use customers::Entity as Customers;
pub use menu_item_tags::Entity as MenuItemTags;
pub use menu_items::Entity as MenuItems;
pub use orders::Entity as Orders;
pub use tags::Entity as Tags;
