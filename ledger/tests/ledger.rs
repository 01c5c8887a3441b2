//! Integration tests for the in-memory listing and order ledger

use core_types::{ListingStatus, OrderStatus};
use ledger::{InMemoryLedger, Ledger, LedgerError, NewListing};
use rstest::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn kg(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn submit(ledger: &InMemoryLedger, name: &str, phone: &str, crop: &str, qty: i64, price: i64) {
    ledger
        .add_listing(NewListing {
            name: name.to_string(),
            phone: phone.to_string(),
            crop: crop.to_string(),
            quantity: kg(qty),
            price: Decimal::new(price, 0),
        })
        .unwrap();
}

/// Two wheat farmers (60 kg + 40 kg at ₹20) and one rice farmer
#[fixture]
fn stocked() -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    submit(&ledger, "FarmerA", "9000000001", "Wheat", 60, 20);
    submit(&ledger, "FarmerB", "9000000002", "Wheat", 40, 20);
    submit(&ledger, "FarmerC", "9000000003", "Rice", 25, 35);
    ledger
}

#[rstest]
fn availability_queries(stocked: InMemoryLedger) {
    assert_eq!(stocked.total_available("Wheat"), kg(100));
    assert_eq!(stocked.total_available("Rice"), kg(25));
    assert_eq!(stocked.total_available("wheat"), Decimal::ZERO);
    assert_eq!(stocked.available_crops(), vec!["Wheat".to_string(), "Rice".to_string()]);

    let farmer_a = stocked.farmers()[0].id;
    assert_eq!(stocked.farmer_listed_quantity(farmer_a), kg(60));
}

#[rstest]
fn order_consumes_oldest_listing_first(stocked: InMemoryLedger) {
    let order = stocked.create_order("Wheat", kg(70)).unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_quantity, kg(70));
    assert_eq!(order.price, kg(20));
    assert_eq!(order.total_amount, kg(1400));

    let listings = stocked.listings();
    assert_eq!(listings[0].quantity, Decimal::ZERO);
    assert_eq!(listings[0].status, ListingStatus::Sold);
    assert_eq!(listings[0].sold_in_this_order, kg(60));
    assert_eq!(listings[1].quantity, kg(30));
    assert_eq!(listings[1].status, ListingStatus::Listed);
    assert_eq!(listings[1].sold_in_this_order, kg(10));

    let rows = stocked.allocations_for(order.id);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].listing_id, listings[0].id);
    assert_eq!(rows[0].quantity_consumed, kg(60));
    assert_eq!(rows[1].quantity_consumed, kg(10));

    assert_eq!(stocked.total_available("Wheat"), kg(30));
    assert_eq!(stocked.available_crops(), vec!["Wheat".to_string(), "Rice".to_string()]);
}

#[rstest]
fn oversized_order_changes_nothing(stocked: InMemoryLedger) {
    let before = stocked.listings();

    let err = stocked.create_order("Wheat", kg(101)).unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientQuantity {
            crop: "Wheat".to_string(),
            requested: kg(101),
            available: kg(100),
        }
    );
    assert_eq!(stocked.listings(), before);
    assert!(stocked.orders().is_empty());
}

#[rstest]
#[case("Wheat", 0)]
#[case("Wheat", -3)]
fn non_positive_order_quantity_is_rejected(stocked: InMemoryLedger, #[case] crop: &str, #[case] qty: i64) {
    let err = stocked.create_order(crop, kg(qty)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidQuantity { .. }));
}

#[rstest]
fn unknown_crop_is_insufficient(stocked: InMemoryLedger) {
    let err = stocked.create_order("Barley", kg(1)).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientQuantity { available, .. } if available.is_zero()));
}

#[rstest]
fn completing_twice_is_an_error(stocked: InMemoryLedger) {
    let order = stocked.create_order("Rice", kg(5)).unwrap();

    let done = stocked.complete_order(order.id).unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert!(done.completed_at.is_some());

    let err = stocked.complete_order(order.id).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderState { operation: "completed", .. }));

    let missing = Uuid::new_v4();
    assert_eq!(stocked.complete_order(missing).unwrap_err(), LedgerError::OrderNotFound(missing));
}

#[rstest]
fn consume_extends_pending_order(stocked: InMemoryLedger) {
    let order = stocked.create_order("Wheat", kg(50)).unwrap();
    let second = stocked.listings()[1].id;

    let extended = stocked.consume(order.id, second, kg(15)).unwrap();

    assert_eq!(extended.total_quantity, kg(65));
    assert_eq!(extended.total_amount, kg(1300));
    assert_eq!(stocked.get_listing(second).unwrap().quantity, kg(25));
    let consumed: Decimal = stocked.allocations_for(order.id).iter().map(|r| r.quantity_consumed).sum();
    assert_eq!(consumed, extended.total_quantity);
}

#[rstest]
fn consume_guards(stocked: InMemoryLedger) {
    let order = stocked.create_order("Wheat", kg(60)).unwrap();
    let listings = stocked.listings();
    let (sold_out, wheat_b, rice) = (listings[0].id, listings[1].id, listings[2].id);

    assert_eq!(
        stocked.consume(order.id, sold_out, kg(1)).unwrap_err(),
        LedgerError::ListingNotAvailable(sold_out)
    );
    assert!(matches!(
        stocked.consume(order.id, rice, kg(1)).unwrap_err(),
        LedgerError::Validation { .. }
    ));
    assert!(matches!(
        stocked.consume(order.id, wheat_b, kg(41)).unwrap_err(),
        LedgerError::InsufficientQuantity { .. }
    ));

    stocked.complete_order(order.id).unwrap();
    assert!(matches!(
        stocked.consume(order.id, wheat_b, kg(1)).unwrap_err(),
        LedgerError::InvalidOrderState { .. }
    ));
    assert_eq!(stocked.get_listing(wheat_b).unwrap().quantity, kg(40));
}

#[rstest]
fn buyer_picked_listings(stocked: InMemoryLedger) {
    let listings = stocked.listings();
    let picks = [(listings[1].id, kg(10)), (listings[0].id, kg(5)), (listings[1].id, kg(5))];

    let order = stocked.create_order_from("Wheat", &picks).unwrap();

    assert_eq!(order.total_quantity, kg(20));
    let rows = stocked.allocations_for(order.id);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].listing_id, listings[1].id);
    assert_eq!(rows[0].quantity_consumed, kg(15));

    let too_much = [(listings[1].id, kg(20)), (listings[1].id, kg(6))];
    assert!(matches!(
        stocked.create_order_from("Wheat", &too_much).unwrap_err(),
        LedgerError::InsufficientQuantity { .. }
    ));
    assert_eq!(stocked.get_listing(listings[1].id).unwrap().quantity, kg(25));
}

#[rstest]
fn repeated_picks_accumulate_legacy_attribution(stocked: InMemoryLedger) {
    let listings = stocked.listings();
    let (a, b) = (listings[0].id, listings[1].id);

    let order = stocked
        .create_order_from("Wheat", &[(b, kg(10)), (a, kg(60)), (b, kg(30))])
        .unwrap();

    assert_eq!(stocked.get_listing(a).unwrap().sold_in_this_order, kg(60));
    assert_eq!(stocked.get_listing(b).unwrap().sold_in_this_order, kg(40));
    assert_eq!(order.total_quantity, kg(100));
}

#[rstest]
fn consume_into_same_order_accumulates_but_new_order_resets(stocked: InMemoryLedger) {
    let b = stocked.listings()[1].id;
    let first = stocked.create_order_from("Wheat", &[(b, kg(5))]).unwrap();
    stocked.consume(first.id, b, kg(7)).unwrap();
    assert_eq!(stocked.get_listing(b).unwrap().sold_in_this_order, kg(12));

    stocked.create_order_from("Wheat", &[(b, kg(3))]).unwrap();
    assert_eq!(stocked.get_listing(b).unwrap().sold_in_this_order, kg(3));
}

#[rstest]
fn put_listing_is_compare_and_set(stocked: InMemoryLedger) {
    let mut listing = stocked.listings()[2].clone();
    listing.price = kg(40);
    let stored = stocked.put_listing(listing.clone()).unwrap();
    assert_eq!(stored.version, listing.version + 1);

    // Same stale copy again
    let err = stocked.put_listing(listing.clone()).unwrap_err();
    assert!(matches!(err, LedgerError::VersionConflict { expected: 0, actual: 1, .. }));

    let mut raised = stored.clone();
    raised.quantity = kg(30);
    assert!(matches!(
        stocked.put_listing(raised).unwrap_err(),
        LedgerError::InvalidQuantity { .. }
    ));

    let mut withdrawn = stored;
    withdrawn.quantity = Decimal::ZERO;
    let withdrawn = stocked.put_listing(withdrawn).unwrap();
    assert_eq!(withdrawn.status, ListingStatus::Sold);
    assert_eq!(stocked.total_available("Rice"), Decimal::ZERO);
}

#[rstest]
fn collection_keeps_latest_per_farmer(stocked: InMemoryLedger) {
    let farmer = stocked.farmers()[0].clone();

    stocked.log_collection(farmer.id, kg(55)).unwrap();
    let latest = stocked.log_collection(farmer.id, kg(58)).unwrap();

    assert_eq!(latest.farmer_name, "FarmerA");
    let collections = stocked.collections();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].quantity, kg(58));

    assert!(matches!(
        stocked.log_collection(farmer.id, Decimal::ZERO).unwrap_err(),
        LedgerError::InvalidQuantity { .. }
    ));
    let stranger = Uuid::new_v4();
    assert_eq!(
        stocked.log_collection(stranger, kg(1)).unwrap_err(),
        LedgerError::FarmerNotFound(stranger)
    );
}

#[test]
fn concurrent_orders_never_oversell() {
    let ledger = Arc::new(InMemoryLedger::new());
    submit(&ledger, "FarmerA", "9000000001", "Maize", 50, 18);
    submit(&ledger, "FarmerB", "9000000002", "Maize", 50, 18);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.create_order("Maize", kg(7)).is_ok())
        })
        .collect();
    let placed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // 14 * 7 = 98 fits in 100, a fifteenth would not
    assert_eq!(placed, 14);
    assert_eq!(ledger.total_available("Maize"), kg(2));
    for listing in ledger.listings() {
        let attributed: Decimal = ledger
            .orders()
            .iter()
            .flat_map(|o| ledger.allocations_for(o.id))
            .filter(|row| row.listing_id == listing.id)
            .map(|row| row.quantity_consumed)
            .sum();
        assert_eq!(attributed, listing.consumed());
        assert!(attributed <= listing.original_quantity);
    }
}
