use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::BasketLine;

/// Upper bound for a single request and for the accumulated quantity of a line.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddToBasketRequest {
    /// Menu item id.
    pub id: Uuid,
    #[validate(range(min = 1, max = MAX_LINE_QUANTITY, message = "count must be between 1 and 10000"))]
    pub count: i32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RemoveFromBasketRequest {
    /// Optional echo of the item id in the path; must match when present.
    pub id: Option<Uuid>,
    #[validate(range(min = 1, max = MAX_LINE_QUANTITY, message = "count must be between 1 and 10000"))]
    pub count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BasketList {
    pub items: Vec<BasketLine>,
}

impl BasketList {
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_is_rejected() {
        let req = AddToBasketRequest {
            id: Uuid::new_v4(),
            count: 0,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("count"));
    }

    #[test]
    fn count_above_line_limit_is_rejected() {
        let req = AddToBasketRequest {
            id: Uuid::new_v4(),
            count: MAX_LINE_QUANTITY + 1,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("count"));

        let req = RemoveFromBasketRequest {
            id: None,
            count: i32::MAX,
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("count"));

        let req = AddToBasketRequest {
            id: Uuid::new_v4(),
            count: MAX_LINE_QUANTITY,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn remove_body_may_omit_id() {
        let req: RemoveFromBasketRequest =
            serde_json::from_value(serde_json::json!({ "count": 2 })).unwrap();
        assert!(req.id.is_none());
        assert!(req.validate().is_ok());
    }
}
