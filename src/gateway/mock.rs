//! Mock payment gateway for development and testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{PaymentGateway, PaymentOrder, to_minor_units};
use crate::domain::{OrderId, UserId};
use crate::error::BoxofficeError;

/// Mock gateway that mints order references locally.
///
/// Succeeds by default; flip [`MockPaymentGateway::set_failing`] to make
/// every subsequent call fail, which is how compensation paths are
/// exercised in tests.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    failing: AtomicBool,
}

impl MockPaymentGateway {
    /// Creates a mock gateway that succeeds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
        }
    }

    /// Creates an Arc-wrapped instance for sharing.
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }

    /// Makes every subsequent `create_order` call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(
        &self,
        order_id: OrderId,
        _user_id: UserId,
        amount: Decimal,
    ) -> Result<PaymentOrder, BoxofficeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BoxofficeError::PaymentGatewayFailure(
                "mock gateway failure".to_string(),
            ));
        }

        let amount_minor = to_minor_units(amount)?;
        let reference = format!("order_mock_{}", uuid::Uuid::new_v4().simple());

        tracing::info!(%order_id, %reference, amount_minor, "mock payment order created");

        Ok(PaymentOrder {
            reference,
            amount_minor,
            currency: "INR".to_string(),
        })
    }
}
