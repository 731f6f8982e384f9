//! Etsy receipts decoded into canonical orders.
//!
//! The raw payload structs mirror Etsy's v3 `ShopReceipt` and
//! `ShopReceiptTransaction` shapes, declaring which fields are required.
//! Conversion into [`Order`] / [`Transaction`] validates the economics
//! (positive quantities, consistent totals) so handlers never see a
//! half-formed order.

use serde::Deserialize;
use serde_json::Value;

use crate::money::{Money, approx_eq};
use crate::DecodeError;

/// Tag prefix written onto Shopify orders imported from Etsy.
pub const ORDER_TAG_PREFIX: &str = "ETSY_";

/// Tag prefix identifying the Etsy buyer a Shopify record came from.
pub const BUYER_TAG_PREFIX: &str = "ETSY_BUYER_ID_";

/// Deterministic idempotency tag for an Etsy receipt.
pub fn order_tag(receipt_id: u64) -> String {
    format!("{ORDER_TAG_PREFIX}{receipt_id}")
}

/// Split a full name into `(first, last)` on its last whitespace boundary.
///
/// Lossy: multi-word last names ("van der Berg") and suffixes ("Jr.") land
/// in the wrong half, and a single word yields an empty last name. Kept
/// behind this function so a better splitter can replace it.
pub fn split_name(full: &str) -> (String, String) {
    let trimmed = full.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((first, last)) => (first.trim_end().to_string(), last.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

/// The person who placed an Etsy order, with the shipping address on the
/// receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Buyer {
    pub buyer_user_id: u64,
    pub name: String,
    /// Withheld by Etsy for some buyers depending on privacy settings.
    pub email: Option<String>,
    pub first_line: String,
    pub second_line: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country_iso: Option<String>,
}

impl Buyer {
    /// `ETSY_BUYER_ID_<id>`.
    pub fn idempotency_tag(&self) -> String {
        format!("{BUYER_TAG_PREFIX}{}", self.buyer_user_id)
    }

    pub fn split_name(&self) -> (String, String) {
        split_name(&self.name)
    }
}

/// A single line item of an Etsy receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: u64,
    pub receipt_id: u64,
    pub listing_id: Option<u64>,
    pub title: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub shipping_cost: f64,
    pub currency: String,
}

impl Transaction {
    /// Decode a `getShopReceiptTransaction` response.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let raw: RawTransaction = serde_json::from_value(value)?;
        raw.try_into()
    }
}

/// Totals carried by an order, in major currency units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSummary {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discount: f64,
    pub grand_total: f64,
}

impl OrderSummary {
    pub fn expected_grand_total(&self) -> f64 {
        self.subtotal + self.tax + self.shipping - self.discount
    }

    pub fn is_consistent(&self) -> bool {
        approx_eq(self.grand_total, self.expected_grand_total())
    }
}

/// Canonical order assembled from an Etsy receipt.
///
/// Built once per run and never mutated after the reconciliation decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub receipt_id: u64,
    pub buyer: Buyer,
    pub transactions: Vec<Transaction>,
    pub currency: String,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discount: f64,
    pub grand_total: f64,
    pub is_gift: bool,
    pub gift_message: Option<String>,
    pub message_from_buyer: Option<String>,
    pub is_shipped: bool,
    pub created: i64,
    pub updated: i64,
}

impl Order {
    /// Decode a `ShopReceipt` payload.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let raw: RawReceipt = serde_json::from_value(value)?;
        raw.try_into()
    }

    /// `ETSY_<receipt_id>`.
    pub fn idempotency_tag(&self) -> String {
        order_tag(self.receipt_id)
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            discount: self.discount,
            grand_total: self.grand_total,
        }
    }
}

// ── Raw payloads ──

#[derive(Debug, Deserialize)]
struct RawReceipt {
    receipt_id: u64,
    buyer_user_id: u64,
    name: String,
    #[serde(default)]
    buyer_email: Option<String>,
    #[serde(default)]
    first_line: Option<String>,
    #[serde(default)]
    second_line: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zip: Option<String>,
    #[serde(default)]
    country_iso: Option<String>,
    #[serde(default)]
    message_from_buyer: Option<String>,
    is_shipped: bool,
    #[serde(default)]
    is_gift: bool,
    #[serde(default)]
    gift_message: Option<String>,
    create_timestamp: i64,
    update_timestamp: i64,
    grandtotal: Money,
    total_price: Money,
    total_shipping_cost: Money,
    total_tax_cost: Money,
    discount_amt: Money,
    // Absent for shops outside VAT jurisdictions and for orders without gift wrap.
    #[serde(default)]
    total_vat_cost: Option<Money>,
    #[serde(default)]
    gift_wrap_price: Option<Money>,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    transaction_id: u64,
    receipt_id: u64,
    #[serde(default)]
    listing_id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    quantity: i64,
    price: Money,
    shipping_cost: Money,
}

/// Empty and whitespace-only strings are treated as absent.
fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn optional_amount(money: Option<&Money>) -> Result<f64, DecodeError> {
    money.map(Money::to_f64).transpose().map(|v| v.unwrap_or(0.0))
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = DecodeError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(raw.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(DecodeError::Quantity {
                transaction_id: raw.transaction_id,
                quantity: raw.quantity,
            })?;

        Ok(Self {
            transaction_id: raw.transaction_id,
            receipt_id: raw.receipt_id,
            listing_id: raw.listing_id,
            title: raw.title.unwrap_or_default(),
            sku: non_empty(raw.sku),
            quantity,
            unit_price: raw.price.to_f64()?,
            shipping_cost: raw.shipping_cost.to_f64()?,
            currency: raw.price.currency_code,
        })
    }
}

impl TryFrom<RawReceipt> for Order {
    type Error = DecodeError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let subtotal = raw.total_price.to_f64()?;
        let tax = raw.total_tax_cost.to_f64()? + optional_amount(raw.total_vat_cost.as_ref())?;
        let shipping =
            raw.total_shipping_cost.to_f64()? + optional_amount(raw.gift_wrap_price.as_ref())?;
        let discount = raw.discount_amt.to_f64()?;
        let grand_total = raw.grandtotal.to_f64()?;

        let summary = OrderSummary {
            subtotal,
            tax,
            shipping,
            discount,
            grand_total,
        };
        if !summary.is_consistent() {
            return Err(DecodeError::TotalsMismatch {
                receipt_id: raw.receipt_id,
                grand_total,
                subtotal,
                tax,
                shipping,
                discount,
            });
        }

        let transactions = raw
            .transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let buyer = Buyer {
            buyer_user_id: raw.buyer_user_id,
            name: raw.name.trim().to_string(),
            email: non_empty(raw.buyer_email),
            first_line: raw.first_line.unwrap_or_default(),
            second_line: non_empty(raw.second_line),
            city: raw.city.unwrap_or_default(),
            state: non_empty(raw.state),
            zip: non_empty(raw.zip),
            country_iso: non_empty(raw.country_iso),
        };

        Ok(Self {
            receipt_id: raw.receipt_id,
            buyer,
            transactions,
            currency: raw.grandtotal.currency_code,
            subtotal,
            tax,
            shipping,
            discount,
            grand_total,
            is_gift: raw.is_gift,
            gift_message: non_empty(raw.gift_message),
            message_from_buyer: non_empty(raw.message_from_buyer),
            is_shipped: raw.is_shipped,
            created: raw.create_timestamp,
            updated: raw.update_timestamp,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    fn money(amount: i64) -> Value {
        json!({ "amount": amount, "divisor": 100, "currency_code": "USD" })
    }

    /// A paid, unshipped two-line receipt: 2 x 25.00 + 1 x 30.00, 5.00 off,
    /// 6.50 shipping, 4.80 tax.
    pub(crate) fn receipt_json() -> Value {
        json!({
            "receipt_id": 12345,
            "buyer_user_id": 777,
            "name": "Jane Q Public",
            "buyer_email": "jane@example.com",
            "first_line": "1 Main St",
            "second_line": "",
            "city": "Springfield",
            "state": "IL",
            "zip": "62701",
            "country_iso": "US",
            "message_from_buyer": null,
            "is_paid": true,
            "is_shipped": false,
            "is_gift": true,
            "gift_message": "Happy birthday!",
            "create_timestamp": 1714564800,
            "update_timestamp": 1714565400,
            "grandtotal": money(8630),
            "total_price": money(8000),
            "total_shipping_cost": money(650),
            "total_tax_cost": money(480),
            "total_vat_cost": money(0),
            "discount_amt": money(500),
            "transactions": [
                {
                    "transaction_id": 1,
                    "receipt_id": 12345,
                    "listing_id": 55,
                    "title": "Plaid Bandana",
                    "sku": "BAN-PLAID-M",
                    "quantity": 2,
                    "price": money(2500),
                    "shipping_cost": money(400)
                },
                {
                    "transaction_id": 2,
                    "receipt_id": 12345,
                    "listing_id": 56,
                    "title": "Velvet Bow",
                    "sku": "BOW-VELVET",
                    "quantity": 1,
                    "price": money(3000),
                    "shipping_cost": money(250)
                }
            ]
        })
    }

    #[test]
    fn decodes_receipt() {
        let order = Order::from_value(receipt_json()).unwrap();
        assert_eq!(order.receipt_id, 12345);
        assert_eq!(order.buyer.email.as_deref(), Some("jane@example.com"));
        assert_eq!(order.buyer.second_line, None);
        assert_eq!(order.transactions.len(), 2);
        assert_eq!(order.transactions[0].quantity, 2);
        assert_eq!(order.transactions[0].unit_price, 25.0);
        assert_eq!(order.gift_message.as_deref(), Some("Happy birthday!"));
        assert_eq!(order.currency, "USD");
        assert_eq!(order.idempotency_tag(), "ETSY_12345");
        assert_eq!(order.buyer.idempotency_tag(), "ETSY_BUYER_ID_777");
    }

    #[test]
    fn summary_reproduces_totals() {
        let order = Order::from_value(receipt_json()).unwrap();
        let s = order.summary();
        assert!((s.grand_total - 86.30).abs() <= 0.01);
        assert!((s.expected_grand_total() - s.grand_total).abs() <= 0.01);
        assert_eq!(s.subtotal, 80.0);
        assert_eq!(s.discount, 5.0);
    }

    #[test]
    fn grandtotal_is_converted_from_minor_units() {
        let mut v = receipt_json();
        v["grandtotal"] = money(10000);
        v["total_price"] = money(10000);
        v["total_shipping_cost"] = money(0);
        v["total_tax_cost"] = money(0);
        v["discount_amt"] = money(0);
        let order = Order::from_value(v).unwrap();
        assert_eq!(order.grand_total, 100.00);
    }

    #[test]
    fn inconsistent_totals_are_rejected() {
        let mut v = receipt_json();
        v["grandtotal"] = money(9999);
        let err = Order::from_value(v).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TotalsMismatch {
                receipt_id: 12345,
                ..
            }
        ));
    }

    #[test]
    fn missing_total_is_a_decode_error() {
        let mut v = receipt_json();
        v.as_object_mut().unwrap().remove("total_tax_cost");
        assert!(matches!(
            Order::from_value(v),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut v = receipt_json();
        v["transactions"][1]["quantity"] = json!(0);
        assert!(matches!(
            Order::from_value(v),
            Err(DecodeError::Quantity {
                transaction_id: 2,
                quantity: 0
            })
        ));
    }

    #[test]
    fn withheld_email_is_none() {
        let mut v = receipt_json();
        v["buyer_email"] = Value::Null;
        let order = Order::from_value(v).unwrap();
        assert!(order.buyer.email.is_none());
    }

    #[test]
    fn empty_sku_is_none() {
        let v = json!({
            "transaction_id": 9,
            "receipt_id": 1,
            "sku": "",
            "quantity": 1,
            "price": money(100),
            "shipping_cost": money(0)
        });
        let t = Transaction::from_value(v).unwrap();
        assert!(t.sku.is_none());
    }

    #[test]
    fn split_name_on_last_space() {
        assert_eq!(
            split_name("Jane Q Public"),
            ("Jane Q".to_string(), "Public".to_string())
        );
        assert_eq!(
            split_name("  Mary Ann   Smith "),
            ("Mary Ann".to_string(), "Smith".to_string())
        );
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
    }
}
