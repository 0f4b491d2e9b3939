//! Lot selection strategies for disposals.
//!
//! Every strategy removes exactly the requested number of units and reports
//! one [`TaxEvent`] per acquisition-date cohort among the removed units.

use super::asset::{AssetKind, Lot};
use super::error::CgtError;
use super::events::{Disposal, TaxEvent};
use super::ledger::{Ledger, SelectionOrder, Take};
use super::transaction::TransactionKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Holding periods longer than this many days halve the projected gain
/// when ranking units for a lowest-gain sale.
const DISCOUNT_RANKING_DAYS: i64 = 365;

/// Which units a disposal removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Earliest inserted units first
    Fifo,
    /// Latest inserted units first
    Lifo,
    /// Units of one option series
    SpecificOption,
    /// Highest unit cost first
    HighestCost,
    /// Lowest projected after-discount gain first
    LowestGain,
}

impl Strategy {
    pub fn event_kind(self) -> TransactionKind {
        match self {
            Strategy::Fifo => TransactionKind::FifoSale,
            Strategy::Lifo => TransactionKind::LifoSale,
            Strategy::SpecificOption => TransactionKind::OptionSale,
            Strategy::HighestCost => TransactionKind::HighestCostSale,
            Strategy::LowestGain => TransactionKind::LowestGainSale,
        }
    }

    fn required_kind(self) -> AssetKind {
        match self {
            Strategy::SpecificOption => AssetKind::Option,
            _ => AssetKind::Share,
        }
    }
}

/// A disposal of `quantity` units for `total_proceeds`.
#[derive(Debug, Clone)]
pub struct Sale<'a> {
    pub asset_kind: AssetKind,
    pub asset_identifier: &'a str,
    pub option_id: Option<&'a str>,
    pub date: NaiveDate,
    pub total_proceeds: Decimal,
    pub quantity: usize,
}

impl Sale<'_> {
    fn unit_proceeds(&self) -> Decimal {
        self.total_proceeds / Decimal::from(self.quantity)
    }
}

/// Remove the units chosen by `strategy` and compute the per-cohort tax events.
pub fn dispose(
    ledger: &mut Ledger,
    strategy: Strategy,
    sale: &Sale<'_>,
) -> Result<Vec<TaxEvent>, CgtError> {
    let expected = strategy.required_kind();
    if sale.asset_kind != expected {
        return Err(CgtError::AssetKindMismatch {
            asset: sale.asset_identifier.to_string(),
            expected,
            found: sale.asset_kind,
        });
    }
    if sale.quantity == 0 {
        return Err(CgtError::FractionalQuantity(Decimal::ZERO));
    }
    if strategy == Strategy::SpecificOption && sale.option_id.is_none() {
        return Err(CgtError::MissingOptionId {
            asset: sale.asset_identifier.to_string(),
        });
    }

    let unit_proceeds = sale.unit_proceeds();
    let in_position =
        |lot: &Lot| lot.is_position(sale.asset_kind, sale.asset_identifier, sale.option_id);
    let take = Take::Exactly(sale.quantity);

    let by_cost_desc = |a: &Lot, b: &Lot| b.unit_cost.cmp(&a.unit_cost);
    let by_ranked_gain = |a: &Lot, b: &Lot| {
        ranked_gain(a, sale.date, unit_proceeds).cmp(&ranked_gain(b, sale.date, unit_proceeds))
    };
    let order = match strategy {
        Strategy::Fifo | Strategy::SpecificOption => SelectionOrder::Oldest,
        Strategy::Lifo => SelectionOrder::Newest,
        Strategy::HighestCost => SelectionOrder::By(&by_cost_desc),
        Strategy::LowestGain => SelectionOrder::By(&by_ranked_gain),
    };

    let removed = ledger.select_and_remove(sale.asset_identifier, in_position, take, order)?;

    let disposal = Disposal {
        date: sale.date,
        asset_kind: sale.asset_kind,
        asset_identifier: sale.asset_identifier,
        event_kind: strategy.event_kind(),
        unit_proceeds,
    };
    let events = disposal.cohort_events(&removed);
    log::debug!(
        "{} {} x {} on {}: {} cohort event(s)",
        strategy.event_kind(),
        sale.quantity,
        sale.asset_identifier,
        sale.date,
        events.len()
    );
    Ok(events)
}

/// Projected gain of disposing one unit, halved when the unit has been held
/// long enough to attract the discount. Only used as a sort key.
fn ranked_gain(lot: &Lot, sale_date: NaiveDate, unit_proceeds: Decimal) -> Decimal {
    let gain = unit_proceeds - lot.unit_cost;
    if (sale_date - lot.acquisition_date).num_days() > DISCOUNT_RANKING_DAYS {
        gain / Decimal::TWO
    } else {
        gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::Discountability;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn buy(
        ledger: &mut Ledger,
        kind: AssetKind,
        acquired: &str,
        qty: usize,
        total: Decimal,
        option_id: Option<&str>,
    ) {
        let unit_cost = total / Decimal::from(qty);
        ledger.add(
            (0..qty)
                .map(|_| Lot {
                    asset_kind: kind,
                    asset_identifier: "TEST".to_string(),
                    acquisition_date: date(acquired),
                    unit_cost,
                    option_id: option_id.map(str::to_string),
                })
                .collect(),
        );
    }

    fn share_sale(sold: &str, qty: usize, proceeds: Decimal) -> Sale<'static> {
        Sale {
            asset_kind: AssetKind::Share,
            asset_identifier: "TEST",
            option_id: None,
            date: date(sold),
            total_proceeds: proceeds,
            quantity: qty,
        }
    }

    fn two_parcels() -> Ledger {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Share, "2022-03-30", 10, dec!(10000), None);
        buy(&mut ledger, AssetKind::Share, "2022-04-30", 10, dec!(10000), None);
        ledger
    }

    #[test]
    fn fifo_sale_single_parcel() {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Share, "2022-03-30", 10, dec!(10000), None);

        let events = dispose(
            &mut ledger,
            Strategy::Fifo,
            &share_sale("2023-04-01", 5, dec!(10000)),
        )
        .unwrap();

        assert_eq!(ledger.len(), 5);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.quantity, 5);
        assert_eq!(event.cost_base, dec!(5000));
        assert_eq!(event.proceeds, dec!(10000));
        assert_eq!(event.gross_value, dec!(5000));
        assert_eq!(event.acquisition_date, date("2022-03-30"));
        assert_eq!(event.event_kind, TransactionKind::FifoSale);
        assert_eq!(event.discountability, Discountability::Eligible);
    }

    #[test]
    fn fifo_takes_oldest_parcel_lifo_takes_newest() {
        let mut fifo_ledger = two_parcels();
        let fifo = dispose(
            &mut fifo_ledger,
            Strategy::Fifo,
            &share_sale("2023-05-01", 5, dec!(6000)),
        )
        .unwrap();
        assert_eq!(fifo.len(), 1);
        assert_eq!(fifo[0].acquisition_date, date("2022-03-30"));

        let mut lifo_ledger = two_parcels();
        let lifo = dispose(
            &mut lifo_ledger,
            Strategy::Lifo,
            &share_sale("2023-05-01", 5, dec!(6000)),
        )
        .unwrap();
        assert_eq!(lifo.len(), 1);
        assert_eq!(lifo[0].acquisition_date, date("2022-04-30"));
    }

    #[test]
    fn sale_across_parcels_emits_event_per_cohort() {
        let mut ledger = two_parcels();

        let events = dispose(
            &mut ledger,
            Strategy::Fifo,
            &share_sale("2023-04-15", 15, dec!(30000)),
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].quantity, 10);
        assert_eq!(events[0].proceeds, dec!(20000));
        assert_eq!(events[0].discountability, Discountability::Eligible);
        assert_eq!(events[1].quantity, 5);
        assert_eq!(events[1].proceeds, dec!(10000));
        // 2022-04-30 parcel held less than a year
        assert_eq!(events[1].discountability, Discountability::Ineligible);
        assert_eq!(ledger.len(), 5);
    }

    #[test]
    fn lifo_with_partial_second_parcel() {
        let mut ledger = two_parcels();

        let events = dispose(
            &mut ledger,
            Strategy::Lifo,
            &share_sale("2023-05-01", 12, dec!(12000)),
        )
        .unwrap();

        let quantities: Vec<_> = events.iter().map(|e| (e.acquisition_date, e.quantity)).collect();
        assert_eq!(
            quantities,
            vec![(date("2022-03-30"), 2), (date("2022-04-30"), 10)]
        );
        assert_eq!(ledger.count(|l| l.acquisition_date == date("2022-03-30")), 8);
    }

    #[test]
    fn share_strategies_reject_options() {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Option, "2022-03-30", 10, dec!(100), Some("OPT1"));
        let sale = Sale {
            asset_kind: AssetKind::Option,
            option_id: Some("OPT1"),
            ..share_sale("2023-01-01", 1, dec!(10))
        };

        for strategy in [
            Strategy::Fifo,
            Strategy::Lifo,
            Strategy::HighestCost,
            Strategy::LowestGain,
        ] {
            let err = dispose(&mut ledger, strategy, &sale).unwrap_err();
            assert!(matches!(err, CgtError::AssetKindMismatch { expected: AssetKind::Share, .. }));
        }
        assert_eq!(ledger.len(), 10);
    }

    #[test]
    fn option_sale_rejects_shares() {
        let mut ledger = two_parcels();
        let err = dispose(
            &mut ledger,
            Strategy::SpecificOption,
            &share_sale("2023-01-01", 1, dec!(10)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CgtError::AssetKindMismatch {
                asset: "TEST".to_string(),
                expected: AssetKind::Option,
                found: AssetKind::Share,
            }
        );
    }

    #[test]
    fn option_sale_selects_by_series() {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Option, "2022-03-30", 10, dec!(1000), Some("OPT1"));
        buy(&mut ledger, AssetKind::Option, "2022-03-30", 10, dec!(5000), Some("OPT2"));
        let sale = Sale {
            asset_kind: AssetKind::Option,
            asset_identifier: "TEST",
            option_id: Some("OPT2"),
            date: date("2022-09-01"),
            total_proceeds: dec!(2000),
            quantity: 4,
        };

        let events = dispose(&mut ledger, Strategy::SpecificOption, &sale).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cost_base, dec!(2000));
        assert_eq!(events[0].gross_value, Decimal::ZERO);
        assert_eq!(events[0].discountability, Discountability::Ineligible);
        assert_eq!(events[0].event_kind, TransactionKind::OptionSale);
        assert_eq!(ledger.count(|l| l.option_id.as_deref() == Some("OPT2")), 6);
        assert_eq!(ledger.count(|l| l.option_id.as_deref() == Some("OPT1")), 10);
    }

    #[test]
    fn option_sale_beyond_holding_fails_without_mutation() {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Option, "2022-03-30", 3, dec!(300), Some("OPT1"));
        let sale = Sale {
            asset_kind: AssetKind::Option,
            asset_identifier: "TEST",
            option_id: Some("OPT1"),
            date: date("2022-09-01"),
            total_proceeds: dec!(2000),
            quantity: 4,
        };

        let err = dispose(&mut ledger, Strategy::SpecificOption, &sale).unwrap_err();

        assert!(matches!(err, CgtError::InsufficientUnits { requested: 4, available: 3, .. }));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn highest_cost_sale_consumes_dearest_units() {
        let mut ledger = Ledger::new();
        buy(&mut ledger, AssetKind::Share, "2021-01-01", 5, dec!(500), None);
        buy(&mut ledger, AssetKind::Share, "2022-01-01", 5, dec!(1500), None);
        buy(&mut ledger, AssetKind::Share, "2022-06-01", 5, dec!(1000), None);

        let events = dispose(
            &mut ledger,
            Strategy::HighestCost,
            &share_sale("2023-03-01", 7, dec!(1400)),
        )
        .unwrap();

        let cohorts: Vec<_> = events
            .iter()
            .map(|e| (e.acquisition_date, e.quantity, e.cost_base))
            .collect();
        assert_eq!(
            cohorts,
            vec![
                (date("2022-01-01"), 5, dec!(1500)),
                (date("2022-06-01"), 2, dec!(400)),
            ]
        );
        assert_eq!(events[0].gross_value, dec!(-500));
        assert_eq!(events[0].discountability, Discountability::Loss);
        assert_eq!(ledger.count(|l| l.unit_cost == dec!(100)), 5);
    }

    #[test]
    fn lowest_gain_sale_halves_long_held_gains_for_ranking() {
        let mut ledger = Ledger::new();
        // held > 365 days at sale: gain 60 per unit, ranked as 30
        buy(&mut ledger, AssetKind::Share, "2021-01-01", 2, dec!(80), None);
        // held < 365 days: gain 50 per unit, ranked as 50
        buy(&mut ledger, AssetKind::Share, "2022-10-01", 2, dec!(100), None);
        // held < 365 days: gain 40 per unit, ranked as 40
        buy(&mut ledger, AssetKind::Share, "2022-11-01", 2, dec!(120), None);

        let events = dispose(
            &mut ledger,
            Strategy::LowestGain,
            &share_sale("2023-03-01", 3, dec!(300)),
        )
        .unwrap();

        let cohorts: Vec<_> = events.iter().map(|e| (e.acquisition_date, e.quantity)).collect();
        assert_eq!(cohorts, vec![(date("2021-01-01"), 2), (date("2022-11-01"), 1)]);
        // reported gain is the undiscounted figure
        assert_eq!(events[0].gross_value, dec!(120));
        assert_eq!(events[0].cost_base, dec!(80));
        assert_eq!(events[0].discountability, Discountability::Eligible);
        // unit costs of remaining lots are untouched
        assert_eq!(ledger.count(|l| l.unit_cost == dec!(50)), 2);
        assert_eq!(ledger.count(|l| l.unit_cost == dec!(60)), 1);
    }

    #[test]
    fn ranked_gain_boundary_is_strictly_more_than_365_days() {
        let lot = Lot {
            asset_kind: AssetKind::Share,
            asset_identifier: "TEST".to_string(),
            acquisition_date: date("2022-01-01"),
            unit_cost: dec!(10),
            option_id: None,
        };
        assert_eq!(ranked_gain(&lot, date("2023-01-01"), dec!(30)), dec!(20));
        assert_eq!(ranked_gain(&lot, date("2023-01-02"), dec!(30)), dec!(10));
    }

    #[test]
    fn fifo_sale_of_more_than_held_fails() {
        let mut ledger = two_parcels();
        let before = ledger.clone();

        let err = dispose(
            &mut ledger,
            Strategy::Fifo,
            &share_sale("2023-01-01", 21, dec!(1)),
        )
        .unwrap_err();

        assert!(matches!(err, CgtError::InsufficientUnits { requested: 21, available: 20, .. }));
        assert_eq!(ledger, before);
    }
}
