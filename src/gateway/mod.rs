//! Payment gateway client.
//!
//! The gateway is the external collaborator that collects money. This
//! service only ever asks it to create a payment order for a reserved
//! booking; everything after that arrives back through the webhook or the
//! client verify path.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{OrderId, UserId};
use crate::error::BoxofficeError;

pub use http::HttpPaymentGateway;
pub use mock::MockPaymentGateway;

/// A payment order created at the gateway.
///
/// `reference` is the gateway-assigned identifier later echoed by
/// webhooks and client verification calls; it is the join key between the
/// gateway's world and the local `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway-assigned order reference.
    pub reference: String,
    /// Amount in minor currency units (e.g. paise).
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Client for the upstream payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    /// Creates a payment order for the given booking total.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PaymentGatewayFailure`] when the gateway
    /// rejects the request or cannot be reached.
    async fn create_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<PaymentOrder, BoxofficeError>;
}

/// Converts a major-unit amount to minor units (two decimal places).
///
/// Conversion happens only at this boundary; everything inside the
/// service works in major-unit decimals.
pub(crate) fn to_minor_units(amount: Decimal) -> Result<i64, BoxofficeError> {
    use rust_decimal::prelude::ToPrimitive;

    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| {
            BoxofficeError::Internal(format!("order total {amount} out of range for gateway"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_scale_by_hundred() {
        assert_eq!(to_minor_units(Decimal::new(15_000, 2)).ok(), Some(15_000));
        assert_eq!(to_minor_units(Decimal::new(50, 0)).ok(), Some(5_000));
        assert_eq!(to_minor_units(Decimal::ZERO).ok(), Some(0));
    }
}
