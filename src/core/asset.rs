use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of held asset.
///
/// The ordering (Option < Share) is only used for stable multi-key sorting
/// in reports, it carries no tax meaning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum AssetKind {
    Option,
    Share,
}

impl AssetKind {
    pub fn display(&self) -> &'static str {
        match self {
            AssetKind::Option => "Option",
            AssetKind::Share => "Share",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Option" => Ok(AssetKind::Option),
            "Share" => Ok(AssetKind::Share),
            other => Err(format!("unknown asset kind: {other}")),
        }
    }
}

/// One unit of a held asset.
///
/// A purchase of N units becomes N lots, each carrying `total / N` as its
/// unit cost. Disposals therefore always select whole lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub asset_kind: AssetKind,
    pub asset_identifier: String,
    pub acquisition_date: NaiveDate,
    pub unit_cost: Decimal,
    /// Option series; only present on option lots
    pub option_id: Option<String>,
}

impl Lot {
    pub fn cohort_key(&self) -> CohortKey {
        CohortKey {
            asset_identifier: self.asset_identifier.clone(),
            asset_kind: self.asset_kind,
            option_id: self.option_id.clone(),
            acquisition_date: self.acquisition_date,
        }
    }

    /// True if the lot belongs to the given asset and, when `option_id` is
    /// given, to that option series.
    pub fn is_position(&self, kind: AssetKind, identifier: &str, option_id: Option<&str>) -> bool {
        self.asset_kind == kind
            && self.asset_identifier == identifier
            && (kind == AssetKind::Share || self.option_id.as_deref() == option_id)
    }
}

/// Lots sharing identifier, kind, option series and acquisition date.
///
/// Field order gives the sort order used for holdings reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CohortKey {
    pub asset_identifier: String,
    pub asset_kind: AssetKind,
    pub option_id: Option<String>,
    pub acquisition_date: NaiveDate,
}
