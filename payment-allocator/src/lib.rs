use core_types::{Amount, Listing, ListingId, Order, OrderAllocation, Quantity};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
/**
 * - split a completed order's total across the farmers that supplied it
 * - shares proportional to quantity, truncated to whole minor units
 * - rounding leftover goes to the first contributor so the split sums to the order total
 */
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

/// Paisa / cents
pub const DEFAULT_CURRENCY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    // Number of decimal places in the smallest currency unit
    pub currency_scale: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            currency_scale: DEFAULT_CURRENCY_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmerPayment {
    pub farmer_name: String,
    pub amount: Amount,
}

/// Per-farmer payments for one order, in first-contribution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PaymentSplit {
    payments: Vec<FarmerPayment>,
}

impl PaymentSplit {
    pub fn get(&self, farmer_name: &str) -> Option<Amount> {
        self.payments
            .iter()
            .find(|p| p.farmer_name == farmer_name)
            .map(|p| p.amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FarmerPayment> {
        self.payments.iter()
    }

    /// The farmer that absorbed the rounding remainder, if any.
    pub fn first(&self) -> Option<&FarmerPayment> {
        self.payments.first()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    pub fn total(&self) -> Amount {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn into_map(self) -> BTreeMap<String, Amount> {
        self.payments
            .into_iter()
            .map(|p| (p.farmer_name, p.amount))
            .collect()
    }
}

impl IntoIterator for PaymentSplit {
    type Item = FarmerPayment;
    type IntoIter = std::vec::IntoIter<FarmerPayment>;

    fn into_iter(self) -> Self::IntoIter {
        self.payments.into_iter()
    }
}

// A quantity some farmer supplied towards the order being split
struct Contribution<'a> {
    farmer_name: &'a str,
    quantity: Quantity,
}

#[derive(Debug, Clone, Default)]
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Allocator { config }
    }

    pub fn config(&self) -> AllocatorConfig {
        self.config
    }

    /// Splits using each listing's `sold_in_this_order` attribution.
    ///
    /// Listings for other crops, or with nothing attributed, are skipped.
    /// That field only remembers the last order to touch a listing, so
    /// this is only right for listings consumed by a single order.
    /// Prefer [`Allocator::allocate_order`] where join rows exist.
    pub fn allocate(&self, order: &Order, listings: &[Listing]) -> PaymentSplit {
        let contributions = listings.iter().filter_map(|listing| {
            if listing.crop != order.crop {
                trace!(listing_id = %listing.id, crop = %listing.crop, "Skipping listing for other crop");
                return None;
            }
            if listing.sold_in_this_order <= Decimal::ZERO {
                return None;
            }
            Some(Contribution {
                farmer_name: &listing.farmer_name,
                quantity: listing.sold_in_this_order,
            })
        });

        self.split(order, contributions)
    }

    /// Splits using the order's explicit allocation rows.
    ///
    /// Rows belonging to other orders, rows whose listing is missing from
    /// `listings`, and rows pointing at a different crop are ignored.
    pub fn allocate_order(
        &self,
        order: &Order,
        allocations: &[OrderAllocation],
        listings: &[Listing],
    ) -> PaymentSplit {
        let by_id: HashMap<ListingId, &Listing> = listings.iter().map(|l| (l.id, l)).collect();

        let contributions = allocations
            .iter()
            .filter(|row| row.order_id == order.id)
            .filter_map(|row| {
                let Some(&listing) = by_id.get(&row.listing_id) else {
                    warn!(order_id = %order.id, listing_id = %row.listing_id, "Allocation row references unknown listing");
                    return None;
                };
                if listing.crop != order.crop {
                    warn!(order_id = %order.id, listing_id = %row.listing_id, "Allocation row crop does not match order");
                    return None;
                }
                if row.quantity_consumed <= Decimal::ZERO {
                    return None;
                }
                Some(Contribution {
                    farmer_name: &listing.farmer_name,
                    quantity: row.quantity_consumed,
                })
            });

        self.split(order, contributions)
    }

    fn split<'a>(
        &self,
        order: &Order,
        contributions: impl Iterator<Item = Contribution<'a>>,
    ) -> PaymentSplit {
        if order.total_quantity <= Decimal::ZERO {
            debug!(order_id = %order.id, "Order has no quantity, nothing to split");
            return PaymentSplit::default();
        }
        if order.total_amount < Decimal::ZERO {
            warn!(order_id = %order.id, total_amount = %order.total_amount, "Negative order total, refusing to split");
            return PaymentSplit::default();
        }

        // Exact shares, summed per farmer in first-seen order
        let mut shares: Vec<(&str, Decimal)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for contribution in contributions {
            let Some(share) = share_of(contribution.quantity, order) else {
                warn!(order_id = %order.id, farmer = %contribution.farmer_name, quantity = %contribution.quantity, "Share out of range, skipping");
                continue;
            };
            match index.get(contribution.farmer_name) {
                Some(&i) => match shares[i].1.checked_add(share) {
                    Some(sum) => shares[i].1 = sum,
                    None => {
                        warn!(order_id = %order.id, farmer = %contribution.farmer_name, "Farmer total out of range, skipping");
                    }
                },
                None => {
                    index.insert(contribution.farmer_name, shares.len());
                    shares.push((contribution.farmer_name, share));
                }
            }
        }

        if shares.is_empty() {
            debug!(order_id = %order.id, crop = %order.crop, "No attributed listings for order");
            return PaymentSplit::default();
        }

        let mut payments: Vec<FarmerPayment> = shares
            .into_iter()
            .map(|(farmer_name, share)| FarmerPayment {
                farmer_name: farmer_name.to_string(),
                amount: share
                    .round_dp_with_strategy(self.config.currency_scale, RoundingStrategy::ToZero),
            })
            .collect();

        let Some(distributed) = payments
            .iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount))
        else {
            warn!(order_id = %order.id, "Attributed shares exceed representable total, refusing to split");
            return PaymentSplit::default();
        };
        let remainder = order.total_amount - distributed;
        if !remainder.is_zero() {
            // Non-empty, checked above
            let first = &mut payments[0];
            trace!(farmer = %first.farmer_name, %remainder, "Assigning rounding remainder");
            first.amount += remainder;
        }

        debug!(
            order_id = %order.id,
            farmers = payments.len(),
            total = %order.total_amount,
            "Split order payment"
        );

        PaymentSplit { payments }
    }
}

// quantity * total / total_quantity, dividing first when the product overflows
fn share_of(quantity: Quantity, order: &Order) -> Option<Amount> {
    quantity
        .checked_mul(order.total_amount)
        .and_then(|scaled| scaled.checked_div(order.total_quantity))
        .or_else(|| {
            quantity
                .checked_div(order.total_quantity)
                .and_then(|fraction| fraction.checked_mul(order.total_amount))
        })
}

/// [`Allocator::allocate`] with the default currency scale.
pub fn allocate(order: &Order, listings: &[Listing]) -> PaymentSplit {
    Allocator::default().allocate(order, listings)
}

/// [`Allocator::allocate_order`] with the default currency scale.
pub fn allocate_order(
    order: &Order,
    allocations: &[OrderAllocation],
    listings: &[Listing],
) -> PaymentSplit {
    Allocator::default().allocate_order(order, allocations, listings)
}
