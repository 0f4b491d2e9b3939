pub mod actions;
pub mod asset;
pub mod disposal;
pub mod error;
pub mod events;
pub mod financial_year;
pub mod ledger;
pub mod portfolio;
pub mod report;
pub mod transaction;

// Flat public surface for domain types and functions.
pub use events::TaxEvent;
pub use financial_year::FinancialYear;
pub use portfolio::Portfolio;
pub use report::{
    consolidate, filter_and_aggregate, summarise, AggregatedEvent, DateRange, GroupLevel, Holding,
    Summary, TaxEventView, Totals,
};
pub use transaction::{
    read_transactions_csv, read_transactions_json, Transaction, TransactionInput, TransactionKind,
};
