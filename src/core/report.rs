//! Read-only views over the ledger and the tax-event log.

use super::asset::AssetKind;
use super::events::{Discountability, TaxEvent};
use super::ledger::Ledger;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One parcel of open lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub asset_identifier: String,
    pub asset_kind: AssetKind,
    pub option_id: Option<String>,
    pub acquisition_date: NaiveDate,
    pub quantity: u64,
    pub cost_base: Decimal,
    /// Held for more than twelve whole months at the report date
    pub discountable: bool,
}

/// Group open lots into parcels, sorted by identifier, kind, option id and date.
///
/// The discount flag counts calendar months only, so a lot bought on the 31st
/// counts a full month by the 1st of the next month. This is a holding-period
/// indicator and ignores whether the parcel is in gain.
pub fn consolidate(ledger: &Ledger, as_of: NaiveDate) -> Vec<Holding> {
    ledger
        .group_by_cohort(|_| true)
        .into_iter()
        .map(|(key, lots)| Holding {
            discountable: months_between(key.acquisition_date, as_of) > 12,
            asset_identifier: key.asset_identifier,
            asset_kind: key.asset_kind,
            option_id: key.option_id,
            acquisition_date: key.acquisition_date,
            quantity: lots.len() as u64,
            cost_base: lots.iter().map(|lot| lot.unit_cost).sum(),
        })
        .collect()
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// Keys to aggregate tax events by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLevel {
    /// Event date, asset and discountability
    DateAssetDiscount,
    /// Asset and discountability across all dates
    AssetDiscount,
}

/// Sum of tax events sharing a group key. Acquisition dates are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedEvent {
    pub date: Option<NaiveDate>,
    pub asset_identifier: String,
    pub asset_kind: AssetKind,
    pub discountability: Discountability,
    pub quantity: u64,
    pub proceeds: Decimal,
    pub cost_base: Decimal,
    pub gross_value: Decimal,
}

/// Filtered tax events, either as recorded or aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxEventView {
    Events(Vec<TaxEvent>),
    Grouped(Vec<AggregatedEvent>),
}

impl TaxEventView {
    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        match self {
            TaxEventView::Events(events) => {
                for e in events {
                    totals.add(e.quantity, e.proceeds, e.cost_base, e.gross_value);
                }
            }
            TaxEventView::Grouped(rows) => {
                for r in rows {
                    totals.add(r.quantity, r.proceeds, r.cost_base, r.gross_value);
                }
            }
        }
        totals
    }

    pub fn len(&self) -> usize {
        match self {
            TaxEventView::Events(events) => events.len(),
            TaxEventView::Grouped(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column sums shown in the totals row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub quantity: u64,
    pub proceeds: Decimal,
    pub cost_base: Decimal,
    pub gross_value: Decimal,
}

impl Totals {
    fn add(&mut self, quantity: u64, proceeds: Decimal, cost_base: Decimal, gross_value: Decimal) {
        self.quantity += quantity;
        self.proceeds += proceeds;
        self.cost_base += cost_base;
        self.gross_value += gross_value;
    }
}

/// Events whose event date falls inside `range`, in log order.
pub fn filter_events(events: &[TaxEvent], range: Option<DateRange>) -> Vec<TaxEvent> {
    events
        .iter()
        .filter(|e| range.map_or(true, |r| r.contains(e.event_date)))
        .cloned()
        .collect()
}

/// Restrict to `range`, then optionally aggregate at `level`.
pub fn filter_and_aggregate(
    events: &[TaxEvent],
    range: Option<DateRange>,
    level: Option<GroupLevel>,
) -> TaxEventView {
    let filtered = filter_events(events, range);
    match level {
        None => TaxEventView::Events(filtered),
        Some(level) => TaxEventView::Grouped(aggregate(&filtered, level)),
    }
}

fn aggregate(events: &[TaxEvent], level: GroupLevel) -> Vec<AggregatedEvent> {
    type Key = (Option<NaiveDate>, String, AssetKind, Discountability);
    let mut groups: BTreeMap<Key, Totals> = BTreeMap::new();

    for e in events {
        let date = match level {
            GroupLevel::DateAssetDiscount => Some(e.event_date),
            GroupLevel::AssetDiscount => None,
        };
        groups
            .entry((date, e.asset_identifier.clone(), e.asset_kind, e.discountability))
            .or_default()
            .add(e.quantity, e.proceeds, e.cost_base, e.gross_value);
    }

    groups
        .into_iter()
        .map(|((date, asset_identifier, asset_kind, discountability), t)| AggregatedEvent {
            date,
            asset_identifier,
            asset_kind,
            discountability,
            quantity: t.quantity,
            proceeds: t.proceeds,
            cost_base: t.cost_base,
            gross_value: t.gross_value,
        })
        .collect()
}

/// Totals per discountability bucket and the resulting net capital gain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub events: usize,
    pub ineligible: Totals,
    pub eligible: Totals,
    pub losses: Totals,
    /// Ineligible gains, plus half of eligible gains, plus losses
    pub net_capital_gain: Decimal,
}

pub fn summarise(events: &[TaxEvent]) -> Summary {
    let mut ineligible = Totals::default();
    let mut eligible = Totals::default();
    let mut losses = Totals::default();

    for e in events {
        let bucket = match e.discountability {
            Discountability::Ineligible => &mut ineligible,
            Discountability::Eligible => &mut eligible,
            Discountability::Loss => &mut losses,
        };
        bucket.add(e.quantity, e.proceeds, e.cost_base, e.gross_value);
    }

    let net_capital_gain =
        ineligible.gross_value + eligible.gross_value / Decimal::TWO + losses.gross_value;

    Summary {
        events: events.len(),
        ineligible,
        eligible,
        losses,
        net_capital_gain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::open_lots;
    use crate::core::transaction::TransactionKind;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(
        on: &str,
        asset: &str,
        acquired: &str,
        quantity: u64,
        proceeds: Decimal,
        cost_base: Decimal,
    ) -> TaxEvent {
        let gross_value = proceeds - cost_base;
        TaxEvent {
            event_date: date(on),
            asset_identifier: asset.to_string(),
            asset_kind: AssetKind::Share,
            event_kind: TransactionKind::FifoSale,
            quantity,
            acquisition_date: date(acquired),
            proceeds,
            cost_base,
            gross_value,
            discountability: Discountability::classify(date(on), date(acquired), gross_value),
        }
    }

    fn sample_events() -> Vec<TaxEvent> {
        vec![
            event("2023-05-01", "BHP", "2021-01-01", 5, dec!(600), dec!(500)),
            event("2023-05-01", "BHP", "2021-02-01", 3, dec!(360), dec!(300)),
            event("2023-05-01", "CBA", "2023-01-01", 2, dec!(100), dec!(150)),
            event("2023-08-01", "BHP", "2023-07-01", 4, dec!(500), dec!(400)),
            event("2024-07-01", "BHP", "2021-01-01", 1, dec!(200), dec!(100)),
        ]
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.add(open_lots(AssetKind::Share, "BHP", date("2022-01-31"), dec!(300), 3, None));
        ledger.add(open_lots(
            AssetKind::Option,
            "BHP",
            date("2023-03-15"),
            dec!(50),
            5,
            Some("BHPO"),
        ));
        ledger.add(open_lots(AssetKind::Share, "BHP", date("2022-02-01"), dec!(200), 2, None));
        ledger.add(open_lots(AssetKind::Share, "AAA", date("2020-06-30"), dec!(10), 1, None));
        ledger
    }

    #[test]
    fn consolidate_groups_by_parcel_in_key_order() {
        let holdings = consolidate(&ledger(), date("2023-02-15"));

        let keys: Vec<_> = holdings
            .iter()
            .map(|h| (h.asset_identifier.as_str(), h.asset_kind, h.acquisition_date))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("AAA", AssetKind::Share, date("2020-06-30")),
                ("BHP", AssetKind::Option, date("2023-03-15")),
                ("BHP", AssetKind::Share, date("2022-01-31")),
                ("BHP", AssetKind::Share, date("2022-02-01")),
            ]
        );
        assert_eq!(holdings[3].quantity, 2);
        assert_eq!(holdings[3].cost_base, dec!(200));
    }

    #[test]
    fn consolidate_counts_whole_months() {
        let holdings = consolidate(&ledger(), date("2023-02-01"));
        let by_date = |d: &str| holdings.iter().find(|h| h.acquisition_date == date(d)).unwrap();

        // Jan 2022 -> Feb 2023 is 13 months even though fewer days have passed
        assert!(by_date("2022-01-31").discountable);
        assert!(!by_date("2022-02-01").discountable);
        assert!(by_date("2020-06-30").discountable);
        assert!(!by_date("2023-03-15").discountable);
    }

    #[test]
    fn consolidate_preserves_ledger_totals() {
        let ledger = ledger();
        let holdings = consolidate(&ledger, date("2024-01-01"));

        let quantity: u64 = holdings.iter().map(|h| h.quantity).sum();
        let cost: Decimal = holdings.iter().map(|h| h.cost_base).sum();
        assert_eq!(quantity as usize, ledger.len());
        assert_eq!(cost, ledger.lots().iter().map(|l| l.unit_cost).sum::<Decimal>());
    }

    #[test]
    fn filter_is_inclusive_and_keeps_log_order() {
        let range = DateRange::new(date("2023-05-01"), date("2023-08-01"));

        let view = filter_and_aggregate(&sample_events(), Some(range), None);

        let TaxEventView::Events(events) = view else {
            panic!("expected ungrouped events");
        };
        assert_eq!(events.len(), 4);
        assert_eq!(events[2].asset_identifier, "CBA");
        assert_eq!(events[3].event_date, date("2023-08-01"));
    }

    #[test]
    fn group_by_date_asset_and_discountability() {
        let view = filter_and_aggregate(
            &sample_events(),
            None,
            Some(GroupLevel::DateAssetDiscount),
        );

        let TaxEventView::Grouped(rows) = view else {
            panic!("expected grouped rows");
        };
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, Some(date("2023-05-01")));
        assert_eq!(rows[0].asset_identifier, "BHP");
        assert_eq!(rows[0].discountability, Discountability::Eligible);
        assert_eq!(rows[0].quantity, 8);
        assert_eq!(rows[0].proceeds, dec!(960));
        assert_eq!(rows[0].gross_value, dec!(160));
        assert_eq!(rows[1].asset_identifier, "CBA");
        assert_eq!(rows[1].discountability, Discountability::Loss);
    }

    #[test]
    fn group_by_asset_drops_dates() {
        let view = filter_and_aggregate(&sample_events(), None, Some(GroupLevel::AssetDiscount));

        let TaxEventView::Grouped(rows) = view else {
            panic!("expected grouped rows");
        };
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.date, r.asset_identifier.as_str(), r.discountability, r.quantity))
            .collect();
        assert_eq!(
            keys,
            vec![
                (None, "BHP", Discountability::Ineligible, 4),
                (None, "BHP", Discountability::Eligible, 9),
                (None, "CBA", Discountability::Loss, 2),
            ]
        );
    }

    #[test]
    fn totals_match_between_views() {
        let events = sample_events();
        let raw = filter_and_aggregate(&events, None, None).totals();
        let grouped = filter_and_aggregate(&events, None, Some(GroupLevel::AssetDiscount)).totals();

        assert_eq!(raw, grouped);
        assert_eq!(raw.quantity, 15);
        assert_eq!(raw.proceeds, dec!(1760));
        assert_eq!(raw.cost_base, dec!(1450));
        assert_eq!(raw.gross_value, dec!(310));
    }

    #[test]
    fn summary_halves_eligible_gains() {
        let summary = summarise(&sample_events());

        assert_eq!(summary.events, 5);
        assert_eq!(summary.eligible.gross_value, dec!(260));
        assert_eq!(summary.ineligible.gross_value, dec!(100));
        assert_eq!(summary.losses.gross_value, dec!(-50));
        assert_eq!(summary.net_capital_gain, dec!(180));
    }
}
