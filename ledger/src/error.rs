//! Error types for the listing and order ledgers

use core_types::{Crop, FarmerId, ListingId, OrderId, Quantity};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Listing not found: {0}")]
    ListingNotFound(ListingId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Farmer not found: {0}")]
    FarmerNotFound(FarmerId),

    /// Requested more than the ledger can supply. Nothing was consumed.
    #[error("Insufficient quantity of {crop}: requested {requested}, available {available}")]
    InsufficientQuantity {
        crop: Crop,
        requested: Quantity,
        available: Quantity,
    },

    #[error("Listing {0} is no longer available")]
    ListingNotAvailable(ListingId),

    #[error("Order {order_id} cannot be {operation} in state {current_state}")]
    InvalidOrderState {
        order_id: OrderId,
        operation: &'static str,
        current_state: String,
    },

    #[error("Invalid quantity: {reason}")]
    InvalidQuantity { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Compare-and-set on a listing lost against a concurrent writer
    #[error("Version conflict on listing {listing_id}: expected {expected}, found {actual}")]
    VersionConflict {
        listing_id: ListingId,
        expected: u64,
        actual: u64,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
