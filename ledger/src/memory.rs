use crate::{Ledger, LedgerError, LedgerResult, NewListing};
use chrono::Utc;
use core_types::{
    CollectionRecord, Crop, Farmer, FarmerId, Listing, ListingId, ListingStatus, Order,
    OrderAllocation, OrderId, OrderStatus, Quantity,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    farmers: Vec<Farmer>,
    // Insertion order is the FIFO order orders are filled in
    listings: Vec<Listing>,
    orders: Vec<Order>,
    allocations: Vec<OrderAllocation>,
    collections: Vec<CollectionRecord>,
}

impl State {
    fn listing_index(&self, id: ListingId) -> LedgerResult<usize> {
        self.listings
            .iter()
            .position(|l| l.id == id)
            .ok_or(LedgerError::ListingNotFound(id))
    }

    fn order_index(&self, id: OrderId) -> LedgerResult<usize> {
        self.orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(LedgerError::OrderNotFound(id))
    }

    /// Moves `quantity` from the listing at `index` into `order_id`.
    /// Callers validate availability first; this never fails.
    fn take(&mut self, index: usize, order_id: OrderId, quantity: Quantity) {
        let listing_id = self.listings[index].id;

        // Repeat takes by the same order add up; a new order starts the field over
        let sold_in_this_order = match self
            .allocations
            .iter_mut()
            .find(|a| a.order_id == order_id && a.listing_id == listing_id)
        {
            Some(row) => {
                row.quantity_consumed += quantity;
                row.quantity_consumed
            }
            None => {
                self.allocations.push(OrderAllocation {
                    order_id,
                    listing_id,
                    quantity_consumed: quantity,
                });
                quantity
            }
        };

        let listing = &mut self.listings[index];
        listing.quantity -= quantity;
        listing.sold_in_this_order = sold_in_this_order;
        listing.version += 1;
        if listing.quantity <= Decimal::ZERO {
            listing.quantity = Decimal::ZERO;
            listing.status = ListingStatus::Sold;
        }

        debug!(%order_id, %listing_id, %quantity, "Consumed listing");
    }

    fn available(&self, crop: &str) -> Quantity {
        self.listings
            .iter()
            .filter(|l| l.crop == crop && l.is_listed())
            .map(|l| l.quantity)
            .sum()
    }
}

/// Ledger held in process memory behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_order(
        state: &mut State,
        crop: &str,
        plan: Vec<(usize, Quantity)>,
    ) -> LedgerResult<Order> {
        let Some(&(first, _)) = plan.first() else {
            return Err(LedgerError::InvalidQuantity {
                reason: "order must take from at least one listing".to_string(),
            });
        };
        let total: Quantity = plan.iter().map(|(_, q)| *q).sum();
        let order = Order::new(crop, total, state.listings[first].price);

        for (index, quantity) in plan {
            state.take(index, order.id, quantity);
        }
        state.orders.push(order.clone());

        info!(
            order_id = %order.id,
            crop = %order.crop,
            quantity = %order.total_quantity,
            total_amount = %order.total_amount,
            "Order created"
        );

        Ok(order)
    }
}

fn require_text(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation {
            message: format!("{field} is required"),
        });
    }
    Ok(())
}

fn require_positive(field: &str, value: Quantity) -> LedgerResult<()> {
    if value <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity {
            reason: format!("{field} must be positive, got {value}"),
        });
    }
    Ok(())
}

impl Ledger for InMemoryLedger {
    fn add_listing(&self, new: NewListing) -> LedgerResult<(Farmer, Listing)> {
        require_text("name", &new.name)?;
        require_text("phone", &new.phone)?;
        require_text("crop", &new.crop)?;
        require_positive("quantity", new.quantity)?;
        require_positive("price", new.price)?;

        let phone = new.phone.trim();
        let mut state = self.state.write();

        let farmer = match state.farmers.iter().find(|f| f.phone == phone) {
            Some(existing) => {
                if existing.name != new.name.trim() {
                    warn!(farmer_id = %existing.id, "Phone already registered under another name, keeping it");
                }
                existing.clone()
            }
            None => {
                let farmer = Farmer {
                    id: Uuid::new_v4(),
                    name: new.name.trim().to_string(),
                    phone: phone.to_string(),
                };
                state.farmers.push(farmer.clone());
                farmer
            }
        };

        let listing = Listing::new(&farmer, new.crop.trim(), new.quantity, new.price);
        state.listings.push(listing.clone());

        info!(
            listing_id = %listing.id,
            farmer = %farmer.name,
            crop = %listing.crop,
            quantity = %listing.quantity,
            "Listing added"
        );

        Ok((farmer, listing))
    }

    fn get_listing(&self, id: ListingId) -> LedgerResult<Listing> {
        let state = self.state.read();
        let index = state.listing_index(id)?;
        Ok(state.listings[index].clone())
    }

    fn put_listing(&self, mut listing: Listing) -> LedgerResult<Listing> {
        if listing.quantity < Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                reason: format!("remaining quantity cannot be negative, got {}", listing.quantity),
            });
        }

        let mut state = self.state.write();
        let index = state.listing_index(listing.id)?;
        let stored = &mut state.listings[index];

        if stored.version != listing.version {
            return Err(LedgerError::VersionConflict {
                listing_id: listing.id,
                expected: listing.version,
                actual: stored.version,
            });
        }
        if listing.farmer_id != stored.farmer_id
            || listing.crop != stored.crop
            || listing.original_quantity != stored.original_quantity
        {
            return Err(LedgerError::Validation {
                message: "farmer, crop and original quantity of a listing are fixed".to_string(),
            });
        }
        // Raising the remainder would let orders take more than was listed
        if listing.quantity > stored.quantity {
            return Err(LedgerError::InvalidQuantity {
                reason: format!(
                    "remaining quantity can only shrink, {} > {}",
                    listing.quantity, stored.quantity
                ),
            });
        }

        if listing.quantity.is_zero() {
            listing.status = ListingStatus::Sold;
        }
        listing.version += 1;
        *stored = listing.clone();
        debug!(listing_id = %listing.id, version = listing.version, "Listing updated");
        Ok(listing)
    }

    fn consume(
        &self,
        order_id: OrderId,
        listing_id: ListingId,
        quantity: Quantity,
    ) -> LedgerResult<Order> {
        require_positive("quantity", quantity)?;

        let mut state = self.state.write();
        let order_index = state.order_index(order_id)?;
        let listing_index = state.listing_index(listing_id)?;

        let order = &state.orders[order_index];
        if order.status != OrderStatus::Pending {
            return Err(LedgerError::InvalidOrderState {
                order_id,
                operation: "extended",
                current_state: order.status.to_string(),
            });
        }

        let listing = &state.listings[listing_index];
        if !listing.is_listed() {
            return Err(LedgerError::ListingNotAvailable(listing_id));
        }
        if listing.crop != order.crop {
            return Err(LedgerError::Validation {
                message: format!("listing crop {} does not match order crop {}", listing.crop, order.crop),
            });
        }
        if quantity > listing.quantity {
            warn!(%order_id, %listing_id, requested = %quantity, available = %listing.quantity, "Listing cannot cover request");
            return Err(LedgerError::InsufficientQuantity {
                crop: listing.crop.clone(),
                requested: quantity,
                available: listing.quantity,
            });
        }

        state.take(listing_index, order_id, quantity);

        let order = &mut state.orders[order_index];
        order.total_quantity += quantity;
        order.total_amount = order.total_quantity * order.price;
        Ok(order.clone())
    }

    fn listings(&self) -> Vec<Listing> {
        self.state.read().listings.clone()
    }

    fn farmers(&self) -> Vec<Farmer> {
        self.state.read().farmers.clone()
    }

    fn get_order(&self, id: OrderId) -> LedgerResult<Order> {
        let state = self.state.read();
        let index = state.order_index(id)?;
        Ok(state.orders[index].clone())
    }

    fn orders(&self) -> Vec<Order> {
        self.state.read().orders.clone()
    }

    fn create_order(&self, crop: &str, quantity: Quantity) -> LedgerResult<Order> {
        require_text("crop", crop)?;
        require_positive("quantity", quantity)?;

        let mut state = self.state.write();
        let available = state.available(crop);
        if quantity > available {
            warn!(%crop, requested = %quantity, %available, "Not enough stock for order");
            return Err(LedgerError::InsufficientQuantity {
                crop: crop.to_string(),
                requested: quantity,
                available,
            });
        }

        let mut remaining = quantity;
        let mut plan = Vec::new();
        for (index, listing) in state.listings.iter().enumerate() {
            if remaining <= Decimal::ZERO {
                break;
            }
            if listing.crop != crop || !listing.is_listed() || listing.quantity <= Decimal::ZERO {
                continue;
            }
            let take = remaining.min(listing.quantity);
            plan.push((index, take));
            remaining -= take;
        }

        Self::open_order(&mut state, crop, plan)
    }

    fn create_order_from(
        &self,
        crop: &str,
        picks: &[(ListingId, Quantity)],
    ) -> LedgerResult<Order> {
        require_text("crop", crop)?;
        if picks.is_empty() {
            return Err(LedgerError::InvalidQuantity {
                reason: "no listings picked".to_string(),
            });
        }

        let mut state = self.state.write();
        let mut plan: Vec<(usize, Quantity)> = Vec::with_capacity(picks.len());
        for &(listing_id, quantity) in picks {
            require_positive("quantity", quantity)?;
            let index = state.listing_index(listing_id)?;
            let listing = &state.listings[index];
            if !listing.is_listed() {
                return Err(LedgerError::ListingNotAvailable(listing_id));
            }
            if listing.crop != crop {
                return Err(LedgerError::Validation {
                    message: format!("listing {listing_id} is {}, not {crop}", listing.crop),
                });
            }

            // The same listing may be picked more than once
            let already: Quantity = plan
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, q)| *q)
                .sum();
            if already + quantity > listing.quantity {
                return Err(LedgerError::InsufficientQuantity {
                    crop: crop.to_string(),
                    requested: already + quantity,
                    available: listing.quantity,
                });
            }
            plan.push((index, quantity));
        }

        Self::open_order(&mut state, crop, plan)
    }

    fn complete_order(&self, id: OrderId) -> LedgerResult<Order> {
        let mut state = self.state.write();
        let index = state.order_index(id)?;
        let order = &mut state.orders[index];

        if order.status == OrderStatus::Completed {
            return Err(LedgerError::InvalidOrderState {
                order_id: id,
                operation: "completed",
                current_state: order.status.to_string(),
            });
        }

        order.status = OrderStatus::Completed;
        order.completed_at = Some(Utc::now());
        info!(order_id = %id, total_amount = %order.total_amount, "Order completed");
        Ok(order.clone())
    }

    fn allocations_for(&self, order_id: OrderId) -> Vec<OrderAllocation> {
        self.state
            .read()
            .allocations
            .iter()
            .filter(|a| a.order_id == order_id)
            .cloned()
            .collect()
    }

    fn log_collection(
        &self,
        farmer_id: FarmerId,
        quantity: Quantity,
    ) -> LedgerResult<CollectionRecord> {
        require_positive("collected quantity", quantity)?;

        let mut state = self.state.write();
        let farmer = state
            .farmers
            .iter()
            .find(|f| f.id == farmer_id)
            .ok_or(LedgerError::FarmerNotFound(farmer_id))?;

        let record = CollectionRecord {
            farmer_id,
            farmer_name: farmer.name.clone(),
            quantity,
            logged_at: Utc::now(),
        };

        match state.collections.iter_mut().find(|c| c.farmer_id == farmer_id) {
            Some(existing) => *existing = record.clone(),
            None => state.collections.push(record.clone()),
        }

        info!(%farmer_id, farmer = %record.farmer_name, %quantity, "Collection logged");
        Ok(record)
    }

    fn collections(&self) -> Vec<CollectionRecord> {
        self.state.read().collections.clone()
    }

    fn total_available(&self, crop: &str) -> Quantity {
        self.state.read().available(crop)
    }

    fn available_crops(&self) -> Vec<Crop> {
        let state = self.state.read();
        let mut crops: Vec<Crop> = Vec::new();
        for listing in state.listings.iter().filter(|l| l.is_listed()) {
            if !crops.contains(&listing.crop) {
                crops.push(listing.crop.clone());
            }
        }
        crops
    }

    fn farmer_listed_quantity(&self, farmer_id: FarmerId) -> Quantity {
        self.state
            .read()
            .listings
            .iter()
            .filter(|l| l.farmer_id == farmer_id && l.is_listed())
            .map(|l| l.quantity)
            .sum()
    }
}
