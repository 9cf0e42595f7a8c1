use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CheckoutError;

/// Outcome of one committed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub total_amount: Decimal,
}

/// Body of `POST /orders/create`.
///
/// The persisted cart is authoritative for line items and prices; the
/// client-side `items` and `total_amount` travel along for display and
/// notification purposes and are cross-checked, never trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<RequestedItem>,
    pub total_amount: Option<Decimal>,
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_time_of_order: Decimal,
    pub name: String,
}

/// Shipping profile captured at checkout time and denormalized onto the
/// order row, so later profile edits never rewrite order history.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
}

impl CustomerInfo {
    /// Fails with the first missing required field, in a fixed order so the
    /// error message is reproducible.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let required: [(&'static str, &str); 4] = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address1", &self.address1),
            ("city", &self.city),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::IncompleteProfile(field));
            }
        }

        Ok(())
    }
}
