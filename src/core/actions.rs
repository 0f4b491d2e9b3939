//! Corporate actions: transforms that close a group of lots and open
//! replacements while keeping the acquisition date the discount clock runs from.

use super::asset::{AssetKind, Lot};
use super::error::CgtError;
use super::events::{Discountability, TaxEvent};
use super::ledger::{Ledger, SelectionOrder, Take};
use super::transaction::TransactionKind;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Fan a purchase of `quantity` units costing `total_cost` out into unit lots.
pub fn open_lots(
    asset_kind: AssetKind,
    asset_identifier: &str,
    acquisition_date: NaiveDate,
    total_cost: Decimal,
    quantity: usize,
    option_id: Option<&str>,
) -> Vec<Lot> {
    let unit_cost = total_cost / Decimal::from(quantity);
    (0..quantity)
        .map(|_| Lot {
            asset_kind,
            asset_identifier: asset_identifier.to_string(),
            acquisition_date,
            unit_cost,
            option_id: option_id.map(str::to_string),
        })
        .collect()
}

/// Direction of a unit-count change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorganisation {
    /// Each unit becomes `ratio` units
    Split,
    /// Every `ratio` units become one
    Merge,
}

impl Reorganisation {
    fn resulting_units(self, asset: &str, units: usize, ratio: Decimal) -> Result<usize, CgtError> {
        let invalid = || CgtError::InvalidRatio {
            asset: asset.to_string(),
            ratio,
            units,
        };
        if ratio <= Decimal::ZERO {
            return Err(invalid());
        }
        let held = Decimal::from(units);
        let result = match self {
            Reorganisation::Split => held.checked_mul(ratio),
            Reorganisation::Merge => held.checked_div(ratio),
        }
        .ok_or_else(invalid)?;
        if !result.fract().is_zero() || result.is_zero() {
            return Err(invalid());
        }
        result.to_usize().ok_or_else(invalid)
    }
}

/// Parameters of a split or merge.
#[derive(Debug, Clone)]
pub struct Reorganise<'a> {
    pub asset_kind: AssetKind,
    pub asset_identifier: &'a str,
    /// Series to reorganise (options only)
    pub option_id: Option<&'a str>,
    /// Series the new option lots belong to; defaults to `option_id`
    pub new_option_id: Option<&'a str>,
    pub ratio: Decimal,
}

/// Split or merge a position.
///
/// Shares are reorganised cohort by cohort, each keeping its own acquisition
/// date and total cost. An option series is reorganised as a single cohort
/// dated at its latest acquisition. Replacement lots are appended to the
/// ledger. Nothing is changed if any cohort would end up with a fractional
/// unit count.
pub fn reorganise(
    ledger: &mut Ledger,
    action: Reorganisation,
    params: &Reorganise<'_>,
) -> Result<(), CgtError> {
    let asset = params.asset_identifier;
    if params.asset_kind == AssetKind::Option && params.option_id.is_none() {
        return Err(CgtError::MissingOptionId {
            asset: asset.to_string(),
        });
    }
    let in_position = |lot: &Lot| lot.is_position(params.asset_kind, asset, params.option_id);

    // (acquisition date, unit count, total cost) per cohort being replaced
    let cohorts: Vec<(NaiveDate, usize, Decimal)> = match params.asset_kind {
        AssetKind::Share => ledger
            .group_by_cohort(in_position)
            .values()
            .map(|lots| {
                let cost: Decimal = lots.iter().map(|l| l.unit_cost).sum();
                (lots[0].acquisition_date, lots.len(), cost)
            })
            .collect(),
        AssetKind::Option => {
            let lots: Vec<&Lot> = ledger.lots().iter().filter(|l| in_position(l)).collect();
            match lots.iter().map(|l| l.acquisition_date).max() {
                Some(latest) => {
                    let cost: Decimal = lots.iter().map(|l| l.unit_cost).sum();
                    vec![(latest, lots.len(), cost)]
                }
                None => Vec::new(),
            }
        }
    };
    if cohorts.is_empty() {
        return Err(CgtError::NoOpenLots {
            asset: asset.to_string(),
        });
    }

    let replacements = cohorts
        .iter()
        .map(|&(date, units, cost)| {
            action
                .resulting_units(asset, units, params.ratio)
                .map(|new_units| (date, units, new_units, cost))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ledger.select_and_remove(asset, in_position, Take::All, SelectionOrder::Oldest)?;

    let new_option_id = match params.asset_kind {
        AssetKind::Share => None,
        AssetKind::Option => params.new_option_id.or(params.option_id),
    };
    for (date, units, new_units, cost) in replacements {
        log::debug!(
            "{:?} {} {} acquired {}: {} -> {} units, cost {}",
            action,
            params.asset_kind,
            asset,
            date,
            units,
            new_units,
            cost
        );
        ledger.add(open_lots(
            params.asset_kind,
            asset,
            date,
            cost,
            new_units,
            new_option_id,
        ));
    }
    Ok(())
}

/// Option legs of exercises waiting for their share legs, keyed by option id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingExercises {
    entries: HashMap<String, PendingExercise>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExercise {
    pub cost_base: Decimal,
    pub acquisition_date: NaiveDate,
}

impl PendingExercises {
    pub fn get(&self, option_id: &str) -> Option<&PendingExercise> {
        self.entries.get(option_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Option ids still waiting on a share leg
    pub fn option_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Option leg of an exercise: consume `quantity` units of the series and
/// park their cost and earliest acquisition date until the share leg arrives.
pub fn exercise_options(
    ledger: &mut Ledger,
    pending: &mut PendingExercises,
    asset_identifier: &str,
    option_id: &str,
    quantity: usize,
) -> Result<(), CgtError> {
    if pending.get(option_id).is_some() {
        return Err(CgtError::DuplicatePendingExercise {
            option_id: option_id.to_string(),
        });
    }

    let removed = ledger.select_and_remove(
        asset_identifier,
        |lot| lot.is_position(AssetKind::Option, asset_identifier, Some(option_id)),
        Take::Exactly(quantity),
        SelectionOrder::Oldest,
    )?;

    let cost_base: Decimal = removed.iter().map(|l| l.unit_cost).sum();
    let acquisition_date = removed
        .iter()
        .map(|l| l.acquisition_date)
        .min()
        .ok_or_else(|| CgtError::NoOpenLots {
            asset: asset_identifier.to_string(),
        })?;

    log::debug!(
        "Exercise {} {} x {}: pending cost {} from {}",
        asset_identifier,
        option_id,
        quantity,
        cost_base,
        acquisition_date
    );
    pending.entries.insert(
        option_id.to_string(),
        PendingExercise {
            cost_base,
            acquisition_date,
        },
    );
    Ok(())
}

/// Share leg of an exercise: issue `quantity` shares costing the option cost
/// plus `exercise_price`, dated from the options' earliest acquisition.
pub fn issue_exercised_shares(
    ledger: &mut Ledger,
    pending: &mut PendingExercises,
    asset_identifier: &str,
    option_id: &str,
    quantity: usize,
    exercise_price: Decimal,
) -> Result<(), CgtError> {
    let entry = pending
        .entries
        .remove(option_id)
        .ok_or_else(|| CgtError::UnmatchedExercise {
            option_id: option_id.to_string(),
        })?;

    let total_cost = entry.cost_base + exercise_price;
    log::debug!(
        "Exercise {} {}: issuing {} shares at cost {} dated {}",
        asset_identifier,
        option_id,
        quantity,
        total_cost,
        entry.acquisition_date
    );
    ledger.add(open_lots(
        AssetKind::Share,
        asset_identifier,
        entry.acquisition_date,
        total_cost,
        quantity,
        None,
    ));
    Ok(())
}

/// Expire an option series. The whole series is removed and reported as a
/// loss, whatever the sign of the result.
pub fn expire(
    ledger: &mut Ledger,
    asset_identifier: &str,
    option_id: &str,
    date: NaiveDate,
    quantity: usize,
    proceeds: Decimal,
) -> Result<TaxEvent, CgtError> {
    let in_series =
        |lot: &Lot| lot.is_position(AssetKind::Option, asset_identifier, Some(option_id));
    let held = ledger.count(in_series);
    if held == 0 || held < quantity {
        return Err(CgtError::InsufficientUnits {
            asset: asset_identifier.to_string(),
            requested: quantity.max(1),
            available: held,
        });
    }

    let removed = ledger.select_and_remove(
        asset_identifier,
        in_series,
        Take::All,
        SelectionOrder::Oldest,
    )?;
    let cost_base: Decimal = removed.iter().map(|l| l.unit_cost).sum();
    let acquisition_date = removed
        .iter()
        .map(|l| l.acquisition_date)
        .max()
        .unwrap_or(date);
    let gross_value = proceeds - cost_base;
    if gross_value >= Decimal::ZERO {
        log::warn!(
            "Expiry of {} {} has non-negative result {}; reporting as a loss",
            asset_identifier,
            option_id,
            gross_value
        );
    }

    Ok(TaxEvent {
        event_date: date,
        asset_identifier: asset_identifier.to_string(),
        asset_kind: AssetKind::Option,
        event_kind: TransactionKind::Expire,
        quantity: removed.len() as u64,
        acquisition_date,
        proceeds,
        cost_base,
        gross_value,
        discountability: Discountability::Loss,
    })
}
