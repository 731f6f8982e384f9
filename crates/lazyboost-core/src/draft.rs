//! Creation payloads: Shopify orders built from Etsy receipts, and Etsy
//! draft listings built from Shopify variants.

use std::collections::HashMap;

use chrono::DateTime;
use serde::Serialize;

use crate::customer::customer_gid;
use crate::listing::{Listing, Variant};
use crate::mapping;
use crate::money::format_amount;
use crate::order::{Buyer, Order};
use crate::MappingError;

/// Human-readable tag marking orders created by this tool.
pub const MARKER_TAG: &str = "LazyBoost";
pub const DISCOUNT_CODE: &str = "ETSY_DISCOUNT";
pub const PAYMENT_GATEWAY: &str = "Etsy";
pub const SOURCE_NAME: &str = "etsy";
pub const SHIPPING_LINE_TITLE: &str = "Etsy Shipping";
pub const TAX_LINE_TITLE: &str = "Etsy Sales Tax";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyInput {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBag {
    pub shop_money: MoneyInput,
}

impl MoneyBag {
    fn new(amount: f64, currency: &str) -> Self {
        Self {
            shop_money: MoneyInput {
                amount: format_amount(amount),
                currency_code: currency.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub variant_id: String,
    pub quantity: u32,
    pub price_set: MoneyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLineInput {
    pub title: &'static str,
    pub price_set: MoneyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLineInput {
    pub title: &'static str,
    /// Decimal fraction of the subtotal, e.g. `"0.06"`.
    pub rate: String,
    pub price_set: MoneyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDiscountInput {
    pub code: &'static str,
    pub amount_set: MoneyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodeInput {
    pub item_fixed_discount_code: FixedDiscountInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub kind: &'static str,
    pub status: &'static str,
    pub gateway: &'static str,
    pub amount_set: MoneyBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddressInput {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    pub country_code: String,
}

impl From<&Buyer> for MailingAddressInput {
    fn from(buyer: &Buyer) -> Self {
        let (first_name, last_name) = buyer.split_name();
        Self {
            first_name,
            last_name,
            address1: buyer.first_line.clone(),
            address2: buyer.second_line.clone(),
            city: buyer.city.clone(),
            province_code: buyer.state.clone(),
            zip: buyer.zip.clone(),
            country_code: buyer
                .country_iso
                .clone()
                .unwrap_or_else(|| crate::customer::FALLBACK_COUNTRY.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociateCustomer {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub to_associate: AssociateCustomer,
}

/// `OrderCreateOrderInput` for the Admin GraphQL `orderCreate` mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Absent for guest orders (buyer email withheld by Etsy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub currency: String,
    pub line_items: Vec<LineItemInput>,
    pub shipping_lines: Vec<ShippingLineInput>,
    pub tax_lines: Vec<TaxLineInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<DiscountCodeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub financial_status: &'static str,
    pub transactions: Vec<TransactionInput>,
    pub shipping_address: MailingAddressInput,
    pub billing_address: MailingAddressInput,
    pub source_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl OrderDraft {
    /// Assemble the Shopify order for an Etsy receipt.
    ///
    /// `variants` maps SKU to Shopify variant GID; every line item must
    /// resolve or the whole order is rejected.
    pub fn build(
        order: &Order,
        customer_id: Option<u64>,
        variants: &HashMap<String, String>,
    ) -> Result<Self, MappingError> {
        let currency = order.currency.as_str();

        let line_items = order
            .transactions
            .iter()
            .map(|t| -> Result<LineItemInput, MappingError> {
                let sku = t
                    .sku
                    .as_deref()
                    .ok_or(MappingError::MissingSku(t.transaction_id))?;
                let variant_id = variants
                    .get(sku)
                    .ok_or_else(|| MappingError::UnresolvedSku(sku.to_string()))?;
                Ok(LineItemInput {
                    variant_id: variant_id.clone(),
                    quantity: t.quantity,
                    price_set: MoneyBag::new(t.unit_price, currency),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let shipping_lines = (order.shipping > 0.0)
            .then(|| ShippingLineInput {
                title: SHIPPING_LINE_TITLE,
                price_set: MoneyBag::new(order.shipping, currency),
            })
            .into_iter()
            .collect();

        let tax_lines = (order.tax > 0.0)
            .then(|| TaxLineInput {
                title: TAX_LINE_TITLE,
                rate: tax_rate(order.tax, order.subtotal),
                price_set: MoneyBag::new(order.tax, currency),
            })
            .into_iter()
            .collect();

        let discount_code = (order.discount > 0.0).then(|| DiscountCodeInput {
            item_fixed_discount_code: FixedDiscountInput {
                code: DISCOUNT_CODE,
                amount_set: MoneyBag::new(order.discount, currency),
            },
        });

        let address = MailingAddressInput::from(&order.buyer);

        Ok(Self {
            customer: customer_id.map(|id| CustomerInput {
                to_associate: AssociateCustomer {
                    id: customer_gid(id),
                },
            }),
            email: order.buyer.email.clone(),
            currency: order.currency.clone(),
            line_items,
            shipping_lines,
            tax_lines,
            discount_code,
            note: order_note(order),
            tags: vec![
                order.idempotency_tag(),
                MARKER_TAG.to_string(),
                order.buyer.idempotency_tag(),
            ],
            financial_status: "PAID",
            transactions: vec![TransactionInput {
                kind: "SALE",
                status: "SUCCESS",
                gateway: PAYMENT_GATEWAY,
                amount_set: MoneyBag::new(order.grand_total, currency),
            }],
            shipping_address: address.clone(),
            billing_address: address,
            source_name: SOURCE_NAME,
            processed_at: DateTime::from_timestamp(order.created, 0).map(|t| t.to_rfc3339()),
        })
    }
}

fn tax_rate(tax: f64, subtotal: f64) -> String {
    if subtotal > 0.0 {
        format!("{:.4}", tax / subtotal)
    } else {
        "0".to_string()
    }
}

/// Gift message first, then the buyer's note to the seller.
fn order_note(order: &Order) -> Option<String> {
    let mut parts = Vec::new();
    if order.is_gift
        && let Some(msg) = &order.gift_message
    {
        parts.push(format!("Gift message: {msg}"));
    }
    if let Some(msg) = &order.message_from_buyer {
        parts.push(format!("Message from buyer: {msg}"));
    }
    (!parts.is_empty()).then(|| parts.join("\n"))
}

/// Form body for Etsy's `createDraftListing`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub quantity: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub who_made: &'static str,
    pub when_made: &'static str,
    pub taxonomy_id: u64,
    pub shipping_profile_id: u64,
    pub shop_section_id: u64,
    pub materials: Vec<String>,
    pub tags: Vec<String>,
    pub should_auto_renew: bool,
    pub is_supply: bool,
    pub listing_type: &'static str,
    /// Shopify variant the draft was built from, for logging.
    pub source_variant: String,
}

impl ListingDraft {
    pub fn build(listing: &Listing, variant: &Variant) -> Result<Self, MappingError> {
        let product_type = listing.product_type.as_str();
        let title = if listing.is_single_variant() {
            listing.title.clone()
        } else {
            format!("{} - {}", listing.title, variant.title)
        };
        let quantity = if listing.is_single_variant() {
            listing.total_inventory
        } else {
            variant.inventory()
        };

        Ok(Self {
            quantity,
            title,
            description: listing.description.clone(),
            price: variant.price,
            who_made: "i_did",
            when_made: "made_to_order",
            taxonomy_id: mapping::taxonomy_id(product_type)?,
            shipping_profile_id: mapping::shipping_profile_id(product_type, variant.price),
            shop_section_id: mapping::shop_section_id(&listing.tags),
            materials: mapping::extract_materials(&listing.description),
            tags: mapping::etsy_tags(&listing.tags),
            should_auto_renew: mapping::should_auto_renew(product_type),
            is_supply: false,
            listing_type: "physical",
            source_variant: variant.id.clone(),
        })
    }

    /// URL-encoded form fields; list fields repeat with a `[]` suffix.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("quantity".to_string(), self.quantity.to_string()),
            ("title".to_string(), self.title.clone()),
            ("description".to_string(), self.description.clone()),
            ("price".to_string(), format_amount(self.price)),
            ("who_made".to_string(), self.who_made.to_string()),
            ("when_made".to_string(), self.when_made.to_string()),
            ("taxonomy_id".to_string(), self.taxonomy_id.to_string()),
            (
                "shipping_profile_id".to_string(),
                self.shipping_profile_id.to_string(),
            ),
            ("shop_section_id".to_string(), self.shop_section_id.to_string()),
            (
                "should_auto_renew".to_string(),
                self.should_auto_renew.to_string(),
            ),
            ("is_supply".to_string(), self.is_supply.to_string()),
            ("type".to_string(), self.listing_type.to_string()),
        ];
        form.extend(
            self.materials
                .iter()
                .map(|m| ("materials[]".to_string(), m.clone())),
        );
        form.extend(self.tags.iter().map(|t| ("tags[]".to_string(), t.clone())));
        form
    }
}
