use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{Category, MenuItem, Tag};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MenuQuery {
    /// Category name.
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom(function = "money_amount"))]
    pub price: Decimal,
    #[validate(custom(function = "money_amount"))]
    pub discount: Option<Decimal>,
    pub category_id: Uuid,
    pub available: Option<bool>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom(function = "money_amount"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "money_amount"))]
    pub discount: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
    pub tag_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ArchiveItemRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuList {
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagList {
    pub items: Vec<Tag>,
}

/// Amounts must fit `NUMERIC(12, 2)`: below this bound, at most two decimals.
const MONEY_LIMIT: i64 = 10_000_000_000;

fn money_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative").with_message("must not be negative".into()));
    }
    if *value >= Decimal::from(MONEY_LIMIT) {
        return Err(ValidationError::new("too_large")
            .with_message("must be less than 10000000000".into()));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("precision")
            .with_message("must have at most 2 decimal places".into()));
    }
    Ok(())
}

/// Runs on the merged values so partial updates cannot slip past it.
pub fn check_discount(price: Decimal, discount: Decimal) -> Result<(), ValidationErrors> {
    if discount > price {
        let mut errors = ValidationErrors::new();
        errors.add(
            "discount",
            ValidationError::new("discount_exceeds_price")
                .with_message("discount must not exceed price".into()),
        );
        return Err(errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(price: i64, discount: Option<i64>) -> CreateMenuItemRequest {
        CreateMenuItemRequest {
            name: "Soup".into(),
            description: None,
            price: Decimal::from(price),
            discount: discount.map(Decimal::from),
            category_id: Uuid::new_v4(),
            available: None,
            tag_ids: Vec::new(),
        }
    }

    #[test]
    fn negative_price_is_a_field_error() {
        let errors = create(-1, None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }

    #[test]
    fn price_beyond_column_range_is_a_field_error() {
        let mut req = create(10, None);
        req.price = "100000000000.00".parse().unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));

        req.price = "9999999999.99".parse().unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn sub_cent_amounts_are_field_errors() {
        let mut req = create(10, None);
        req.discount = Some("0.005".parse().unwrap());
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("discount"));

        // Trailing zeros are not extra precision.
        req.discount = Some("1.5000".parse().unwrap());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_checks_amounts_too() {
        let req = UpdateMenuItemRequest {
            price: Some("10000000000".parse().unwrap()),
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn empty_name_is_a_field_error() {
        let mut req = create(10, None);
        req.name = String::new();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn discount_above_price_is_rejected() {
        let errors = check_discount(Decimal::from(10), Decimal::from(12)).unwrap_err();
        assert!(errors.field_errors().contains_key("discount"));
        assert!(check_discount(Decimal::from(10), Decimal::from(10)).is_ok());
    }

    #[test]
    fn well_formed_item_passes() {
        assert!(create(10, Some(2)).validate().is_ok());
    }
}
