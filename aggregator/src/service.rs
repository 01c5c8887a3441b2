use crate::config::Config;
use crate::error::{AggregatorError, Result};
use core_types::{CollectionRecord, Farmer, FarmerId, Listing, Order, OrderId, Quantity};
use ledger::{InMemoryLedger, Ledger, NewListing};
use payment_allocator::{Allocator, PaymentSplit};
use std::sync::Arc;
use tracing::{debug, info};

/// A completed order and what each farmer is owed for it.
/// An empty split means no attribution was recorded.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub order: Order,
    pub payments: PaymentSplit,
}

pub struct AggregatorService<L: Ledger = InMemoryLedger> {
    ledger: Arc<L>,
    allocator: Allocator,
}

impl AggregatorService<InMemoryLedger> {
    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(InMemoryLedger::new()), config)
    }
}

impl<L: Ledger> AggregatorService<L> {
    pub fn new(ledger: Arc<L>, config: &Config) -> Self {
        AggregatorService {
            ledger,
            allocator: Allocator::new(config.allocator()),
        }
    }

    pub fn ledger(&self) -> Arc<L> {
        Arc::clone(&self.ledger)
    }

    pub fn add_listing(&self, listing: NewListing) -> Result<(Farmer, Listing)> {
        Ok(self.ledger.add_listing(listing)?)
    }

    pub fn place_order(&self, crop: &str, quantity: Quantity) -> Result<Order> {
        Ok(self.ledger.create_order(crop, quantity)?)
    }

    pub fn complete_order(&self, order_id: OrderId) -> Result<Order> {
        Ok(self.ledger.complete_order(order_id)?)
    }

    pub fn log_collection(&self, farmer_id: FarmerId, quantity: Quantity) -> Result<CollectionRecord> {
        Ok(self.ledger.log_collection(farmer_id, quantity)?)
    }

    /// Payout per farmer for a completed order, from its allocation rows.
    pub fn payments_for(&self, order_id: OrderId) -> Result<PaymentSplit> {
        let order = self.completed_order(order_id)?;
        // Rows of a completed order are frozen, so separate snapshots agree
        let rows = self.ledger.allocations_for(order_id);
        let listings = self.ledger.listings();

        let split = self.allocator.allocate_order(&order, &rows, &listings);
        info!(%order_id, farmers = split.len(), total = %split.total(), "Computed payouts");
        Ok(split)
    }

    /// Payout from the listings' `sold_in_this_order` field. Wrong for any
    /// listing that a later order has touched since.
    pub fn legacy_payments_for(&self, order_id: OrderId) -> Result<PaymentSplit> {
        let order = self.completed_order(order_id)?;
        Ok(self.allocator.allocate(&order, &self.ledger.listings()))
    }

    pub fn payment_summaries(&self) -> Vec<PaymentSummary> {
        // Orders first: listings are never removed, so the later listing
        // snapshot covers every row of these orders
        let orders = self.ledger.orders();
        let listings = self.ledger.listings();
        orders
            .into_iter()
            .filter(Order::is_completed)
            .map(|order| {
                let rows = self.ledger.allocations_for(order.id);
                let payments = self.allocator.allocate_order(&order, &rows, &listings);
                PaymentSummary { order, payments }
            })
            .collect()
    }

    fn completed_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.ledger.get_order(order_id)?;
        if !order.is_completed() {
            debug!(%order_id, status = %order.status, "Payout requested before completion");
            return Err(AggregatorError::OrderNotCompleted(order_id));
        }
        Ok(order)
    }
}
