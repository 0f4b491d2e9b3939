use super::asset::{AssetKind, Lot};
use super::transaction::TransactionKind;
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Tri-state classification of a realised gain or loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Discountability {
    /// Gain held too briefly for the CGT discount (or exactly zero)
    Ineligible,
    /// Gain on an asset held for more than twelve months
    Eligible,
    Loss,
}

impl Discountability {
    /// Classify a disposal of a cohort acquired on `acquired` and sold on `sold`.
    ///
    /// The holding period must strictly exceed twelve calendar months; a zero
    /// gain is `Ineligible`, never `Loss`.
    pub fn classify(sold: NaiveDate, acquired: NaiveDate, gross_value: Decimal) -> Self {
        if gross_value < Decimal::ZERO {
            return Discountability::Loss;
        }
        let held_over_a_year = sold
            .checked_sub_months(Months::new(12))
            .is_some_and(|year_before| year_before > acquired);
        if held_over_a_year && gross_value > Decimal::ZERO {
            Discountability::Eligible
        } else {
            Discountability::Ineligible
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Discountability::Ineligible => "No",
            Discountability::Eligible => "Yes",
            Discountability::Loss => "Loss",
        }
    }
}

impl fmt::Display for Discountability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One realised gain or loss row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxEvent {
    pub event_date: NaiveDate,
    pub asset_identifier: String,
    pub asset_kind: AssetKind,
    pub event_kind: TransactionKind,
    pub quantity: u64,
    pub acquisition_date: NaiveDate,
    pub proceeds: Decimal,
    pub cost_base: Decimal,
    pub gross_value: Decimal,
    pub discountability: Discountability,
}

/// Details of the disposal being split into per-cohort events.
pub struct Disposal<'a> {
    pub date: NaiveDate,
    pub asset_kind: AssetKind,
    pub asset_identifier: &'a str,
    pub event_kind: TransactionKind,
    pub unit_proceeds: Decimal,
}

impl Disposal<'_> {
    /// Emit one event per acquisition-date cohort of `lots`, oldest cohort first.
    pub fn cohort_events(&self, lots: &[Lot]) -> Vec<TaxEvent> {
        let mut cohorts: BTreeMap<NaiveDate, (u64, Decimal)> = BTreeMap::new();
        for lot in lots {
            let entry = cohorts
                .entry(lot.acquisition_date)
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += lot.unit_cost;
        }

        cohorts
            .into_iter()
            .map(|(acquisition_date, (quantity, cost_base))| {
                let proceeds = self.unit_proceeds * Decimal::from(quantity);
                let gross_value = proceeds - cost_base;
                let discountability =
                    Discountability::classify(self.date, acquisition_date, gross_value);
                log::debug!(
                    "Cohort {} {} acquired {}: qty={}, proceeds={}, cost={}, gross={} ({:?})",
                    self.asset_kind,
                    self.asset_identifier,
                    acquisition_date,
                    quantity,
                    proceeds,
                    cost_base,
                    gross_value,
                    discountability
                );
                TaxEvent {
                    event_date: self.date,
                    asset_identifier: self.asset_identifier.to_string(),
                    asset_kind: self.asset_kind,
                    event_kind: self.event_kind,
                    quantity,
                    acquisition_date,
                    proceeds,
                    cost_base,
                    gross_value,
                    discountability,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn share(acquired: &str, unit_cost: Decimal) -> Lot {
        Lot {
            asset_kind: AssetKind::Share,
            asset_identifier: "TEST".to_string(),
            acquisition_date: date(acquired),
            unit_cost,
            option_id: None,
        }
    }

    #[test]
    fn exactly_one_year_is_not_discountable() {
        let d = Discountability::classify(date("2023-03-30"), date("2022-03-30"), dec!(100));
        assert_eq!(d, Discountability::Ineligible);
    }

    #[test]
    fn one_day_over_a_year_is_discountable() {
        let d = Discountability::classify(date("2023-03-31"), date("2022-03-30"), dec!(100));
        assert_eq!(d, Discountability::Eligible);
    }

    #[test]
    fn leap_day_acquisition_boundary() {
        // 2025-02-28 minus twelve months clamps to 2024-02-28
        let held = date("2024-02-29");
        assert_eq!(
            Discountability::classify(date("2025-03-01"), held, dec!(1)),
            Discountability::Eligible
        );
        assert_eq!(
            Discountability::classify(date("2025-02-28"), held, dec!(1)),
            Discountability::Ineligible
        );
    }

    #[test]
    fn loss_overrides_holding_period() {
        let d = Discountability::classify(date("2030-01-01"), date("2020-01-01"), dec!(-0.01));
        assert_eq!(d, Discountability::Loss);
    }

    #[test]
    fn zero_gain_is_ineligible() {
        let d = Discountability::classify(date("2030-01-01"), date("2020-01-01"), Decimal::ZERO);
        assert_eq!(d, Discountability::Ineligible);
    }

    #[test]
    fn events_split_by_cohort_in_date_order() {
        let lots = vec![
            share("2022-04-30", dec!(1000)),
            share("2022-03-30", dec!(1000)),
            share("2022-04-30", dec!(1000)),
        ];
        let disposal = Disposal {
            date: date("2023-04-15"),
            asset_kind: AssetKind::Share,
            asset_identifier: "TEST",
            event_kind: TransactionKind::FifoSale,
            unit_proceeds: dec!(900),
        };

        let events = disposal.cohort_events(&lots);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].acquisition_date, date("2022-03-30"));
        assert_eq!(events[0].quantity, 1);
        assert_eq!(events[0].gross_value, dec!(-100));
        assert_eq!(events[0].discountability, Discountability::Loss);
        assert_eq!(events[1].quantity, 2);
        assert_eq!(events[1].proceeds, dec!(1800));
        assert_eq!(events[1].cost_base, dec!(2000));
    }
}
