//! Farm aggregator: listings in, orders out, and per-farmer payouts for
//! every completed order.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use config::Config;
pub use error::{AggregatorError, Result};
pub use service::{AggregatorService, PaymentSummary};
