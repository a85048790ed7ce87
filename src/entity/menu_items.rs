use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount: Decimal,
    pub category_id: Uuid,
    pub available: bool,
    pub archived: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Price a customer pays right now; captured into a basket line on first add.
    pub fn sale_price(&self) -> Decimal {
        self.price - self.discount
    }

    pub fn is_orderable(&self) -> bool {
        self.available && !self.archived
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(has_many = "super::basket_lines::Entity")]
    BasketLines,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::basket_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BasketLines.def()
    }
}

impl Related<super::tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::menu_item_tags::Relation::Tags.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::menu_item_tags::Relation::MenuItems.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
