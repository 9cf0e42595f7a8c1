use thiserror::Error;

/// Failure taxonomy for the checkout transaction.
///
/// The first three variants are the client's fault and map to 4xx at the HTTP
/// layer. `InsufficientStock` is a business-rule conflict (409) that the
/// caller may retry with a reduced quantity. `Timeout` and `Storage` are
/// infrastructure failures (500); the whole checkout is safe to retry because
/// rollback guarantees no partial effect was persisted.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("shipping profile is incomplete: missing {0}")]
    IncompleteProfile(&'static str),

    #[error("cart is empty; cannot create order")]
    EmptyCart,

    #[error("cart has {lines} lines, exceeding the limit of {max}")]
    CartTooLarge { lines: usize, max: usize },

    #[error(
        "Insufficient stock for product: {name}. Requested {requested}, only {available} left."
    )]
    InsufficientStock {
        product_id: i64,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("checkout transaction exceeded its time budget")]
    Timeout,

    #[error("checkout storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl CheckoutError {
    /// Retryable without user action: rollback left the store untouched.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Storage(_))
    }
}
