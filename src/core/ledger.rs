//! Insertion-ordered collection of open lots.

use super::asset::{CohortKey, Lot};
use super::error::CgtError;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// How many matching units a selection takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    All,
    Exactly(usize),
}

/// Order in which matching units are considered for selection.
pub enum SelectionOrder<'a> {
    /// Earliest inserted first
    Oldest,
    /// Latest inserted first
    Newest,
    /// Custom comparison; ties fall back to earliest inserted first
    By(&'a dyn Fn(&Lot, &Lot) -> Ordering),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    lots: Vec<Lot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, lots: Vec<Lot>) {
        if let Some(first) = lots.first() {
            log::debug!(
                "Ledger ADD: {} x {} {} acquired {}",
                lots.len(),
                first.asset_kind,
                first.asset_identifier,
                first.acquisition_date
            );
        }
        self.lots.extend(lots);
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Lot) -> bool,
    {
        self.lots.iter().filter(|lot| predicate(lot)).count()
    }

    /// Select matching lots in the given order and remove them.
    ///
    /// Either every selected lot is removed and returned (in selection
    /// order), or the ledger is left untouched and an error is returned.
    pub fn select_and_remove<P>(
        &mut self,
        asset: &str,
        predicate: P,
        take: Take,
        order: SelectionOrder<'_>,
    ) -> Result<Vec<Lot>, CgtError>
    where
        P: Fn(&Lot) -> bool,
    {
        let mut candidates: Vec<usize> = self
            .lots
            .iter()
            .enumerate()
            .filter(|(_, lot)| predicate(lot))
            .map(|(idx, _)| idx)
            .collect();

        let wanted = match take {
            Take::All => candidates.len(),
            Take::Exactly(n) => n,
        };
        if wanted > candidates.len() {
            return Err(CgtError::InsufficientUnits {
                asset: asset.to_string(),
                requested: wanted,
                available: candidates.len(),
            });
        }

        match order {
            SelectionOrder::Oldest => {}
            SelectionOrder::Newest => candidates.reverse(),
            // stable, so equal keys keep insertion order
            SelectionOrder::By(cmp) => {
                candidates.sort_by(|&a, &b| cmp(&self.lots[a], &self.lots[b]))
            }
        }
        candidates.truncate(wanted);

        let chosen: HashSet<usize> = candidates.iter().copied().collect();
        let mut selected: Vec<Option<Lot>> = vec![None; self.lots.len()];
        let mut kept = Vec::with_capacity(self.lots.len() - chosen.len());
        for (idx, lot) in std::mem::take(&mut self.lots).into_iter().enumerate() {
            if chosen.contains(&idx) {
                selected[idx] = Some(lot);
            } else {
                kept.push(lot);
            }
        }
        self.lots = kept;

        let removed: Vec<Lot> = candidates
            .into_iter()
            .filter_map(|idx| selected[idx].take())
            .collect();
        log::debug!(
            "Ledger REMOVE: {} x {} ({} lots remain)",
            removed.len(),
            asset,
            self.lots.len()
        );
        Ok(removed)
    }

    /// Group matching open lots into cohorts, keyed and sorted by cohort.
    pub fn group_by_cohort<P>(&self, predicate: P) -> BTreeMap<CohortKey, Vec<&Lot>>
    where
        P: Fn(&Lot) -> bool,
    {
        let mut cohorts: BTreeMap<CohortKey, Vec<&Lot>> = BTreeMap::new();
        for lot in self.lots.iter().filter(|lot| predicate(lot)) {
            cohorts.entry(lot.cohort_key()).or_default().push(lot);
        }
        cohorts
    }
}
