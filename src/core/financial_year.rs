use super::report::DateRange;
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

/// Australian financial year (runs 1 July to 30 June)
/// The year value represents the end year (e.g., 2024 = 2023/24 financial year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// Financial year containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        if date.month() >= 7 {
            FinancialYear(date.year() + 1)
        } else {
            FinancialYear(date.year())
        }
    }

    /// 1 July of the previous year
    pub fn start_date(&self) -> NaiveDate {
        // years outside chrono's range clamp to its limits
        NaiveDate::from_ymd_opt(self.0 - 1, 7, 1).unwrap_or(NaiveDate::MIN)
    }

    /// 30 June
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 6, 30).unwrap_or(NaiveDate::MAX)
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start_date(), self.end_date())
    }

    /// Display as "2023/24" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0.rem_euclid(100))
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Accepts the end year ("2024") or the display form ("2023/24").
impl FromStr for FinancialYear {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid financial year '{s}', expected e.g. 2024 or 2023/24");
        let year = match s.split_once('/') {
            None => s.trim().parse::<i32>().map_err(|_| invalid())?,
            Some((start, end)) => {
                let start = start.trim().parse::<i32>().map_err(|_| invalid())?;
                let end = end.trim().parse::<i32>().map_err(|_| invalid())?;
                if (start + 1).rem_euclid(100) != end.rem_euclid(100) {
                    return Err(invalid());
                }
                start + 1
            }
        };
        if !(1..=9999).contains(&year) {
            return Err(invalid());
        }
        Ok(FinancialYear(year))
    }
}
