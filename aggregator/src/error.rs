use core_types::OrderId;
use ledger::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Payouts are only final once the order is completed
    #[error("Order {0} is not completed")]
    OrderNotCompleted(OrderId),
}
