use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Price = Decimal;
pub type Amount = Decimal;
pub type Quantity = Decimal; // kg
pub type ListingId = Uuid;
pub type OrderId = Uuid;
pub type FarmerId = Uuid;
pub type Crop = String; // e.g Wheat, matched case-sensitively

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Listed,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Listed => write!(f, "listed"),
            ListingStatus::Sold => write!(f, "sold"),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: FarmerId,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub farmer_id: FarmerId,
    pub farmer_name: String,
    pub crop: Crop,
    // Remaining quantity, decremented as orders consume it
    pub quantity: Quantity,
    pub original_quantity: Quantity,
    pub price: Price,
    pub status: ListingStatus,
    // Legacy attribution: only the most recent order touching this listing
    #[serde(default, alias = "soldInThisOrder")]
    pub sold_in_this_order: Quantity,
    #[serde(default)]
    pub version: u64,
}

impl Listing {
    pub fn new(farmer: &Farmer, crop: impl Into<Crop>, quantity: Quantity, price: Price) -> Self {
        Listing {
            id: Uuid::new_v4(),
            farmer_id: farmer.id,
            farmer_name: farmer.name.clone(),
            crop: crop.into(),
            quantity,
            original_quantity: quantity,
            price,
            status: ListingStatus::Listed,
            sold_in_this_order: Decimal::ZERO,
            version: 0,
        }
    }

    pub fn is_listed(&self) -> bool {
        self.status == ListingStatus::Listed
    }

    /// Quantity consumed by all orders over the listing's lifetime.
    pub fn consumed(&self) -> Quantity {
        self.original_quantity - self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub crop: Crop,
    pub total_quantity: Quantity,
    pub price: Price,
    // Fixed at creation, authoritative for payment splitting
    pub total_amount: Amount,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(crop: impl Into<Crop>, total_quantity: Quantity, price: Price) -> Self {
        Order {
            id: Uuid::new_v4(),
            crop: crop.into(),
            total_quantity,
            price,
            total_amount: total_quantity * price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }
}

/// One listing's contribution to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAllocation {
    pub order_id: OrderId,
    pub listing_id: ListingId,
    pub quantity_consumed: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub farmer_id: FarmerId,
    pub farmer_name: String,
    pub quantity: Quantity,
    pub logged_at: DateTime<Utc>,
}
