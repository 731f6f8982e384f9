use thiserror::Error;

/// A platform payload that could not be turned into a domain record.
///
/// Raised for missing or malformed fields that carry economic meaning
/// (totals, quantities, identifiers). These are never papered over with
/// defaults.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("money divisor must be positive, got {0}")]
    InvalidDivisor(i64),

    #[error(
        "receipt {receipt_id}: grand total {grand_total:.2} does not equal \
         subtotal {subtotal:.2} + tax {tax:.2} + shipping {shipping:.2} - discount {discount:.2}"
    )]
    TotalsMismatch {
        receipt_id: u64,
        grand_total: f64,
        subtotal: f64,
        tax: f64,
        shipping: f64,
        discount: f64,
    },

    #[error("transaction {transaction_id}: quantity must be positive, got {quantity}")]
    Quantity { transaction_id: u64, quantity: i64 },

    #[error("review rating {0} is outside 1..=5")]
    Rating(i64),

    #[error("timestamp {0} is out of range")]
    Timestamp(i64),

    #[error("invalid destination id {0:?}")]
    Gid(String),
}

/// A record that decoded fine but cannot be mapped onto the other platform.
///
/// Per-record and never retried: the caller logs it and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("unknown product type {0:?}")]
    UnknownProductType(String),

    #[error("transaction {0} has no SKU")]
    MissingSku(u64),

    #[error("no destination variant for SKU {0:?}")]
    UnresolvedSku(String),

    #[error("no destination product for SKU {0:?}")]
    UnresolvedProduct(String),
}
