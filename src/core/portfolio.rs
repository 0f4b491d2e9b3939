use super::actions::{self, PendingExercises, Reorganisation, Reorganise};
use super::asset::AssetKind;
use super::disposal::{self, Sale, Strategy};
use super::error::{CgtError, ReplayError};
use super::events::TaxEvent;
use super::ledger::Ledger;
use super::transaction::{Transaction, TransactionKind};

/// Lot ledger, tax-event log and in-flight exercises for one portfolio.
///
/// Transactions are applied one at a time in the order given. A failed
/// transaction leaves no trace, but earlier ones stay applied.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    ledger: Ledger,
    tax_events: Vec<TaxEvent>,
    pending_exercises: PendingExercises,
}

impl Portfolio {
    pub fn new() -> Self {
        Portfolio {
            ledger: Ledger::new(),
            tax_events: Vec::new(),
            pending_exercises: PendingExercises::default(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tax_events(&self) -> &[TaxEvent] {
        &self.tax_events
    }

    pub fn pending_exercises(&self) -> &PendingExercises {
        &self.pending_exercises
    }

    /// Apply every transaction in order, stopping at the first failure.
    pub fn replay(&mut self, transactions: &[Transaction]) -> Result<&[TaxEvent], ReplayError> {
        for (index, tx) in transactions.iter().enumerate() {
            self.apply(tx).map_err(|source| ReplayError {
                index,
                date: tx.date,
                kind: tx.transaction_kind,
                source,
            })?;
        }
        let pending = self.pending_exercises();
        if !pending.is_empty() {
            log::warn!(
                "{} exercise(s) still waiting for a share leg: {}",
                pending.len(),
                pending.option_ids().collect::<Vec<_>>().join(", ")
            );
        }
        Ok(&self.tax_events)
    }

    /// Apply a single transaction, returning the tax events it produced.
    pub fn apply(&mut self, tx: &Transaction) -> Result<&[TaxEvent], CgtError> {
        log::info!(
            "{} {} {} {} x {} for {}",
            tx.date,
            tx.transaction_kind,
            tx.asset_kind,
            tx.asset_identifier,
            tx.quantity,
            tx.value
        );
        let before = self.tax_events.len();
        let asset = tx.asset_identifier.as_str();
        let option_id = tx.option_id.as_deref();

        match tx.transaction_kind {
            TransactionKind::Purchase => {
                let units = tx.units()?;
                // option lots need a series to be reachable; shares never carry one
                let series = match tx.asset_kind {
                    AssetKind::Option => Some(option_id.ok_or_else(|| {
                        CgtError::MissingOptionId {
                            asset: asset.to_string(),
                        }
                    })?),
                    AssetKind::Share => None,
                };
                self.ledger.add(actions::open_lots(
                    tx.asset_kind,
                    asset,
                    tx.date,
                    tx.value,
                    units,
                    series,
                ));
            }
            TransactionKind::FifoSale => self.dispose(Strategy::Fifo, tx)?,
            TransactionKind::LifoSale => self.dispose(Strategy::Lifo, tx)?,
            TransactionKind::OptionSale => self.dispose(Strategy::SpecificOption, tx)?,
            TransactionKind::HighestCostSale => self.dispose(Strategy::HighestCost, tx)?,
            TransactionKind::LowestGainSale => self.dispose(Strategy::LowestGain, tx)?,
            TransactionKind::Split => self.reorganise(Reorganisation::Split, tx)?,
            TransactionKind::Merge => self.reorganise(Reorganisation::Merge, tx)?,
            TransactionKind::Exercise => {
                let option_id = option_id.ok_or_else(|| CgtError::MissingOptionId {
                    asset: asset.to_string(),
                })?;
                let units = tx.units()?;
                match tx.asset_kind {
                    AssetKind::Option => actions::exercise_options(
                        &mut self.ledger,
                        &mut self.pending_exercises,
                        asset,
                        option_id,
                        units,
                    )?,
                    AssetKind::Share => actions::issue_exercised_shares(
                        &mut self.ledger,
                        &mut self.pending_exercises,
                        asset,
                        option_id,
                        units,
                        tx.value,
                    )?,
                }
            }
            TransactionKind::Expire => {
                if tx.asset_kind != AssetKind::Option {
                    return Err(CgtError::AssetKindMismatch {
                        asset: asset.to_string(),
                        expected: AssetKind::Option,
                        found: tx.asset_kind,
                    });
                }
                let option_id = option_id.ok_or_else(|| CgtError::MissingOptionId {
                    asset: asset.to_string(),
                })?;
                let event = actions::expire(
                    &mut self.ledger,
                    asset,
                    option_id,
                    tx.date,
                    tx.units()?,
                    tx.value,
                )?;
                self.tax_events.push(event);
            }
        }

        Ok(&self.tax_events[before..])
    }

    fn dispose(&mut self, strategy: Strategy, tx: &Transaction) -> Result<(), CgtError> {
        let sale = Sale {
            asset_kind: tx.asset_kind,
            asset_identifier: &tx.asset_identifier,
            option_id: tx.option_id.as_deref(),
            date: tx.date,
            total_proceeds: tx.value,
            quantity: tx.units()?,
        };
        let events = disposal::dispose(&mut self.ledger, strategy, &sale)?;
        self.tax_events.extend(events);
        Ok(())
    }

    fn reorganise(&mut self, action: Reorganisation, tx: &Transaction) -> Result<(), CgtError> {
        let params = Reorganise {
            asset_kind: tx.asset_kind,
            asset_identifier: &tx.asset_identifier,
            option_id: tx.option_id.as_deref(),
            new_option_id: tx.split_option_id.as_deref(),
            ratio: tx.quantity,
        };
        actions::reorganise(&mut self.ledger, action, &params)
    }
}
