//! Listing and order ledgers for the farm aggregator.
//!
//! The [`Ledger`] trait is the repository every caller goes through. Any
//! operation that reads a listing's remaining quantity and then writes it
//! back happens atomically inside the implementation, so the quantity
//! attributed to orders can never exceed what a farmer listed.

pub mod error;
pub mod memory;

use core_types::{
    CollectionRecord, Crop, Farmer, FarmerId, Listing, ListingId, Order, OrderAllocation, OrderId,
    Price, Quantity,
};

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;

/// A farmer's listing submission.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub name: String,
    pub phone: String,
    pub crop: Crop,
    pub quantity: Quantity,
    pub price: Price,
}

pub trait Ledger: Send + Sync {
    /// Registers the farmer (keyed by phone) if needed and lists the produce.
    fn add_listing(&self, listing: NewListing) -> LedgerResult<(Farmer, Listing)>;

    fn get_listing(&self, id: ListingId) -> LedgerResult<Listing>;

    /// Replaces a listing if `listing.version` still matches the stored one.
    /// Returns the stored listing with its bumped version.
    fn put_listing(&self, listing: Listing) -> LedgerResult<Listing>;

    /// Takes `quantity` from a listing and adds it to a pending order of the
    /// same crop, growing the order's quantity and total.
    fn consume(&self, order_id: OrderId, listing_id: ListingId, quantity: Quantity)
    -> LedgerResult<Order>;

    fn listings(&self) -> Vec<Listing>;

    fn farmers(&self) -> Vec<Farmer>;

    fn get_order(&self, id: OrderId) -> LedgerResult<Order>;

    fn orders(&self) -> Vec<Order>;

    /// Fills `quantity` of `crop` from listed stock, oldest listing first.
    fn create_order(&self, crop: &str, quantity: Quantity) -> LedgerResult<Order>;

    /// Fills an order from listings the buyer picked, in the given order.
    fn create_order_from(&self, crop: &str, picks: &[(ListingId, Quantity)])
    -> LedgerResult<Order>;

    fn complete_order(&self, id: OrderId) -> LedgerResult<Order>;

    fn allocations_for(&self, order_id: OrderId) -> Vec<OrderAllocation>;

    fn log_collection(&self, farmer_id: FarmerId, quantity: Quantity)
    -> LedgerResult<CollectionRecord>;

    /// Latest collection per farmer.
    fn collections(&self) -> Vec<CollectionRecord>;

    fn total_available(&self, crop: &str) -> Quantity;

    /// Crops with listed stock, in the order they were first listed.
    fn available_crops(&self) -> Vec<Crop>;

    fn farmer_listed_quantity(&self, farmer_id: FarmerId) -> Quantity;
}
