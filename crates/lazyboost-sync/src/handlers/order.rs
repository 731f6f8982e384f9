//! Etsy receipts → Shopify orders.

use std::collections::HashMap;

use lazyboost_core::{
    Address, AddressAction, Buyer, MappingError, NewCustomer, Order, OrderDraft, SyncWindow,
    plan_address,
};
use tracing::{error, info, warn};

use super::{SyncReport, raw_id};
use crate::api::{EtsyApi, ShopifyApi};
use crate::error::SyncError;

/// What happened to a single receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// An order tagged with the receipt's idempotency tag already exists.
    AlreadySynced,
    Created(String),
}

pub struct OrderHandler<'a> {
    etsy: &'a dyn EtsyApi,
    shopify: &'a dyn ShopifyApi,
}

impl<'a> OrderHandler<'a> {
    pub fn new(etsy: &'a dyn EtsyApi, shopify: &'a dyn ShopifyApi) -> Self {
        Self { etsy, shopify }
    }

    /// Mirror every open Etsy receipt in `window` into Shopify.
    ///
    /// Duplicate protection rests entirely on Shopify's tag search: two
    /// overlapping runs, or a search index that lags a fresh write, can
    /// both create the same order.
    pub async fn run(&self, window: &SyncWindow) -> Result<SyncReport, SyncError> {
        let receipts = self
            .etsy
            .open_receipts(window)
            .await
            .map_err(SyncError::Etsy)?;

        let mut report = SyncReport::default();
        for value in receipts {
            let receipt_id = raw_id(&value, "receipt_id");
            let order = match Order::from_value(value) {
                Ok(order) => order,
                Err(e) => {
                    error!(
                        receipt_id = %receipt_id,
                        platform = "etsy",
                        error = %e,
                        "cannot decode receipt"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match self.sync_order(&order).await {
                Ok(OrderOutcome::AlreadySynced) => report.skipped += 1,
                Ok(OrderOutcome::Created(_)) => report.synced += 1,
                Err(e) => {
                    error!(
                        receipt_id = order.receipt_id,
                        operation = "order_sync",
                        error = %e,
                        "order sync failed; needs manual follow-up"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(%report, total = report.total(), "order sync finished");
        Ok(report)
    }

    /// Existence check, then customer resolution, then order creation.
    pub async fn sync_order(&self, order: &Order) -> Result<OrderOutcome, SyncError> {
        let tag = order.idempotency_tag();
        if self
            .shopify
            .order_tagged(&tag)
            .await
            .map_err(SyncError::Shopify)?
        {
            info!(receipt_id = order.receipt_id, tag = %tag, "already synced, skipping");
            return Ok(OrderOutcome::AlreadySynced);
        }

        let customer_id = self.resolve_customer(&order.buyer).await?;
        let variants = self.resolve_variants(order).await?;
        let draft = OrderDraft::build(order, customer_id, &variants)?;

        let order_id = self
            .shopify
            .create_order(&draft)
            .await
            .map_err(SyncError::Shopify)?;
        info!(
            receipt_id = order.receipt_id,
            order_id = %order_id,
            guest = customer_id.is_none(),
            "created shopify order"
        );
        Ok(OrderOutcome::Created(order_id))
    }

    /// Find or create the Shopify customer for `buyer` and make the receipt
    /// address their default. Buyers without an email become guest orders.
    async fn resolve_customer(&self, buyer: &Buyer) -> Result<Option<u64>, SyncError> {
        let Some(email) = buyer.email.as_deref() else {
            warn!(
                buyer_user_id = buyer.buyer_user_id,
                "buyer email withheld, creating guest order"
            );
            return Ok(None);
        };
        let target = Address::from_buyer(buyer);

        let existing = self
            .shopify
            .customer_by_email(email)
            .await
            .map_err(SyncError::Shopify)?;

        let Some(customer) = existing else {
            let created = self
                .shopify
                .create_customer(&NewCustomer::from_buyer(buyer, email))
                .await
                .map_err(SyncError::Shopify)?;
            self.shopify
                .add_address(created.id, &target)
                .await
                .map_err(SyncError::Shopify)?;
            return Ok(Some(created.id));
        };

        match plan_address(&customer, &target) {
            AddressAction::Keep => {}
            AddressAction::Promote(address_id) => self
                .shopify
                .set_default_address(customer.id, address_id)
                .await
                .map_err(SyncError::Shopify)?,
            AddressAction::Add => {
                self.shopify
                    .add_address(customer.id, &target)
                    .await
                    .map_err(SyncError::Shopify)?;
            }
        }
        Ok(Some(customer.id))
    }

    /// SKU → variant id for every line item. Any miss rejects the order.
    async fn resolve_variants(&self, order: &Order) -> Result<HashMap<String, String>, SyncError> {
        let mut variants = HashMap::new();
        for transaction in &order.transactions {
            let sku = transaction
                .sku
                .as_deref()
                .ok_or(MappingError::MissingSku(transaction.transaction_id))?;
            if variants.contains_key(sku) {
                continue;
            }
            let variant = self
                .shopify
                .variant_by_sku(sku)
                .await
                .map_err(SyncError::Shopify)?
                .ok_or_else(|| MappingError::UnresolvedSku(sku.to_string()))?;
            variants.insert(sku.to_string(), variant);
        }
        Ok(variants)
    }
}
