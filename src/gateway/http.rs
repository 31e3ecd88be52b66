//! HTTP implementation of the payment gateway client.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{PaymentGateway, PaymentOrder, to_minor_units};
use crate::domain::{OrderId, UserId};
use crate::error::BoxofficeError;

/// Payment order as returned by the gateway's REST API.
#[derive(Debug, Deserialize)]
struct CreatedOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

/// REST client for the payment gateway, authenticated with the merchant
/// key pair.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    currency: String,
}

impl HttpPaymentGateway {
    /// Creates a client for the gateway at `base_url`.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            currency: currency.into(),
        }
    }
}

impl fmt::Debug for HttpPaymentGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPaymentGateway")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<PaymentOrder, BoxofficeError> {
        let amount_minor = to_minor_units(amount)?;
        let body = serde_json::json!({
            "amount": amount_minor,
            "currency": self.currency,
            "receipt": format!("receipt_order_{order_id}"),
            "notes": {
                "booking_id": order_id.to_string(),
                "user_id": user_id.to_string(),
            },
        });

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                BoxofficeError::PaymentGatewayFailure(format!("order creation request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_body, "payment gateway rejected order creation");
            return Err(BoxofficeError::PaymentGatewayFailure(format!(
                "gateway returned {status}"
            )));
        }

        let created: CreatedOrderResponse = response.json().await.map_err(|e| {
            BoxofficeError::PaymentGatewayFailure(format!("unreadable gateway response: {e}"))
        })?;

        tracing::info!(
            %order_id,
            reference = %created.id,
            amount_minor = created.amount,
            "payment order created"
        );

        Ok(PaymentOrder {
            reference: created.id,
            amount_minor: created.amount,
            currency: created.currency,
        })
    }
}
