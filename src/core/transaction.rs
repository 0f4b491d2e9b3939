use super::asset::AssetKind;
use super::error::CgtError;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Kind of a normalized transaction, which selects the rule applied to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransactionKind {
    Purchase,
    FifoSale,
    LifoSale,
    OptionSale,
    Split,
    Merge,
    Exercise,
    Expire,
    HighestCostSale,
    LowestGainSale,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 10] = [
        TransactionKind::Purchase,
        TransactionKind::FifoSale,
        TransactionKind::LifoSale,
        TransactionKind::OptionSale,
        TransactionKind::Split,
        TransactionKind::Merge,
        TransactionKind::Exercise,
        TransactionKind::Expire,
        TransactionKind::HighestCostSale,
        TransactionKind::LowestGainSale,
    ];

    /// Canonical spelling used on input and output
    pub fn display(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "Purchase",
            TransactionKind::FifoSale => "FIFO_Sale",
            TransactionKind::LifoSale => "LIFO_Sale",
            TransactionKind::OptionSale => "Option_Sale",
            TransactionKind::Split => "Split",
            TransactionKind::Merge => "Merge",
            TransactionKind::Exercise => "Exercise",
            TransactionKind::Expire => "Expire",
            TransactionKind::HighestCostSale => "HighestCost_Sale",
            TransactionKind::LowestGainSale => "LowestGain_Sale",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for TransactionKind {
    type Err = CgtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.display() == s)
            .ok_or_else(|| CgtError::UnknownTransactionKind(s.to_string()))
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = CgtError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        kind.display().to_string()
    }
}

/// Input root for transaction JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionInput {
    pub transactions: Vec<Transaction>,
}

/// A normalized transaction, already type-coerced and in replay order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    /// Trade or effective date (YYYY-MM-DD)
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Share or Option
    pub asset_kind: AssetKind,
    /// Ticker or symbol
    pub asset_identifier: String,
    /// One of the canonical transaction kinds, e.g. Purchase or FIFO_Sale
    #[schemars(with = "String")]
    pub transaction_kind: TransactionKind,
    /// Units traded; the ratio for Split and Merge
    #[schemars(with = "f64")]
    pub quantity: Decimal,
    /// Total value of the transaction (cost, proceeds or exercise price)
    #[schemars(with = "f64")]
    pub value: Decimal,
    /// Option series identifier
    #[serde(default, deserialize_with = "empty_as_none")]
    pub option_id: Option<String>,
    /// Option series created by a Split or Merge
    #[serde(default, deserialize_with = "empty_as_none")]
    pub split_option_id: Option<String>,
}

impl Transaction {
    /// The quantity as a whole, positive unit count.
    pub fn units(&self) -> Result<usize, CgtError> {
        whole_units(self.quantity)
    }
}

pub(crate) fn whole_units(quantity: Decimal) -> Result<usize, CgtError> {
    if quantity <= Decimal::ZERO || !quantity.fract().is_zero() {
        return Err(CgtError::FractionalQuantity(quantity));
    }
    quantity
        .to_usize()
        .ok_or(CgtError::FractionalQuantity(quantity))
}

/// Read transactions from JSON, preserving input order
pub fn read_transactions_json<R: Read>(reader: R) -> anyhow::Result<Vec<Transaction>> {
    let input: TransactionInput = serde_json::from_reader(reader)?;
    Ok(input.transactions)
}

/// Read transactions from CSV with a header row, preserving input order
pub fn read_transactions_csv<R: Read>(reader: R) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut transactions = Vec::new();
    for result in rdr.deserialize() {
        let tx: Transaction = result?;
        transactions.push(tx);
    }
    Ok(transactions)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
