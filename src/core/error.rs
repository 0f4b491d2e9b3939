use super::asset::AssetKind;
use super::transaction::TransactionKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CgtError {
    #[error(
        "insufficient units of {asset}: requested {requested}, held {available} (short {})",
        .requested - .available
    )]
    InsufficientUnits {
        asset: String,
        requested: usize,
        available: usize,
    },
    #[error("{asset}: operation requires {expected} but was given {found}")]
    AssetKindMismatch {
        asset: String,
        expected: AssetKind,
        found: AssetKind,
    },
    #[error("share leg of exercise has no pending option leg for option id '{option_id}'")]
    UnmatchedExercise { option_id: String },
    #[error("option id '{option_id}' already has a pending exercise")]
    DuplicatePendingExercise { option_id: String },
    #[error("unknown transaction kind: {0}")]
    UnknownTransactionKind(String),
    #[error("quantity must be a positive whole number of units: {0}")]
    FractionalQuantity(Decimal),
    #[error("ratio {ratio} does not turn {units} units of {asset} into a whole number of units")]
    InvalidRatio {
        asset: String,
        ratio: Decimal,
        units: usize,
    },
    #[error("{asset}: option transaction is missing an option id")]
    MissingOptionId { asset: String },
    #[error("no open lots of {asset}")]
    NoOpenLots { asset: String },
}

/// A transaction in a replayed stream failed; earlier transactions remain applied.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("transaction #{index} ({kind} on {date}) failed: {source}")]
pub struct ReplayError {
    pub index: usize,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    #[source]
    pub source: CgtError,
}
