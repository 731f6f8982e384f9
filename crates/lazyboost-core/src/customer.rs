//! Shopify customers and the address-matching rule used to reconcile them
//! with Etsy buyers.

use serde::{Deserialize, Serialize};

use crate::order::Buyer;

/// Country assumed when Etsy omits `country_iso` on a receipt.
pub const FALLBACK_COUNTRY: &str = "US";

/// A Shopify customer address (REST `customer_address` shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province_code: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl Address {
    /// The shipping address on an Etsy receipt, as a new default address.
    pub fn from_buyer(buyer: &Buyer) -> Self {
        let (first, last) = buyer.split_name();
        Self {
            id: None,
            first_name: Some(first),
            last_name: Some(last).filter(|l| !l.is_empty()),
            address1: Some(buyer.first_line.clone()),
            address2: buyer.second_line.clone(),
            city: Some(buyer.city.clone()),
            province_code: buyer.state.clone(),
            zip: buyer.zip.clone(),
            country_code: Some(
                buyer
                    .country_iso
                    .clone()
                    .unwrap_or_else(|| FALLBACK_COUNTRY.to_string()),
            ),
            default: true,
        }
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }

    /// Same delivery point: name, both address lines, city and state agree
    /// after case and whitespace normalisation. Postal code and country are
    /// not compared.
    pub fn is_same_destination(&self, other: &Address) -> bool {
        normalize(&self.full_name()) == normalize(&other.full_name())
            && normalize_opt(&self.address1) == normalize_opt(&other.address1)
            && normalize_opt(&self.address2) == normalize_opt(&other.address2)
            && normalize_opt(&self.city) == normalize_opt(&other.city)
            && normalize_opt(&self.province_code) == normalize_opt(&other.province_code)
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_opt(s: &Option<String>) -> String {
    s.as_deref().map(normalize).unwrap_or_default()
}

/// A Shopify customer as returned by the customer search endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Customer {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub default_address: Option<Address>,
}

impl Customer {
    /// Shopify GraphQL id for this customer.
    pub fn gid(&self) -> String {
        customer_gid(self.id)
    }
}

pub fn customer_gid(id: u64) -> String {
    format!("gid://shopify/Customer/{id}")
}

/// REST body for creating a customer from an Etsy buyer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub verified_email: bool,
    pub send_email_welcome: bool,
    pub tags: String,
}

impl NewCustomer {
    pub fn from_buyer(buyer: &Buyer, email: &str) -> Self {
        let (first_name, last_name) = buyer.split_name();
        Self {
            first_name,
            last_name,
            email: email.to_string(),
            verified_email: true,
            send_email_welcome: false,
            tags: buyer.idempotency_tag(),
        }
    }
}

/// What to do with an existing customer's addresses so the order address
/// becomes their default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressAction {
    /// The default address already matches.
    Keep,
    /// A non-default saved address matches; make it the default.
    Promote(u64),
    /// Nothing matches; save the order address as the new default.
    Add,
}

/// Decide how to reconcile `customer` with the order address `target`.
pub fn plan_address(customer: &Customer, target: &Address) -> AddressAction {
    if customer
        .default_address
        .as_ref()
        .is_some_and(|d| d.is_same_destination(target))
    {
        return AddressAction::Keep;
    }

    customer
        .addresses
        .iter()
        .find(|a| a.is_same_destination(target))
        .and_then(|a| a.id)
        .map_or(AddressAction::Add, AddressAction::Promote)
}
