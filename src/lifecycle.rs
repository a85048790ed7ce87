//! Order status transitions and total computation.
//!
//! Statuses only move forward along [`TRANSITIONS`]; anything else is an
//! [`AppError::InvalidState`].

use rust_decimal::Decimal;

use crate::{entity::orders::OrderStatus, error::AppError};

/// Legal `(from, to)` pairs.
pub const TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Active, OrderStatus::Pending),
    (OrderStatus::Pending, OrderStatus::Payment),
    (OrderStatus::Payment, OrderStatus::Payment),
];

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Pending => "pending",
            OrderStatus::Payment => "payment",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        TRANSITIONS.contains(&(self, next))
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, AppError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidState(format!(
                "order cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// Sum of `sale_price * quantity` over basket lines.
pub fn basket_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(sale_price, quantity)| sale_price * Decimal::from(quantity))
        .sum()
}

/// Total shown to the customer: the stored amount once finalized, a
/// provisional sum of the lines while the basket is still open.
pub fn displayed_total<I>(status: OrderStatus, stored: Decimal, lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    match status {
        OrderStatus::Active => basket_total(lines),
        OrderStatus::Pending | OrderStatus::Payment => stored,
    }
}
