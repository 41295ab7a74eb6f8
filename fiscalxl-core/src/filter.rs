//! Record selection for the dashboard views.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::record::LineItem;

/// The KPI card a view is narrowed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KpiFilter {
    #[default]
    All,
    /// Items with a non-zero vIBS.
    Ibs,
    /// Items with a non-zero vCBS.
    Cbs,
    /// Items where either amount is negative.
    Credits,
    /// Items with any non-zero amount.
    Total,
}

impl KpiFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            KpiFilter::All => "all",
            KpiFilter::Ibs => "ibs",
            KpiFilter::Cbs => "cbs",
            KpiFilter::Credits => "cred",
            KpiFilter::Total => "total",
        }
    }

    /// Absent amounts count as zero.
    pub fn matches(self, item: &LineItem) -> bool {
        let ibs = item.ibs_value.unwrap_or(Decimal::ZERO);
        let cbs = item.cbs_value.unwrap_or(Decimal::ZERO);
        match self {
            KpiFilter::All => true,
            KpiFilter::Ibs => !ibs.is_zero(),
            KpiFilter::Cbs => !cbs.is_zero(),
            KpiFilter::Credits => ibs < Decimal::ZERO || cbs < Decimal::ZERO,
            KpiFilter::Total => !ibs.is_zero() || !cbs.is_zero(),
        }
    }
}

/// Unknown names select [`KpiFilter::All`].
impl FromStr for KpiFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "ibs" => KpiFilter::Ibs,
            "cbs" => KpiFilter::Cbs,
            "cred" | "credits" => KpiFilter::Credits,
            "total" => KpiFilter::Total,
            _ => KpiFilter::All,
        })
    }
}

/// Filters applied to a record set, all of which must hold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordFilter {
    /// Inclusive date range. Undated records fail it.
    pub period: Option<(NaiveDate, NaiveDate)>,
    /// Case-insensitive substring of the description.
    pub query: Option<String>,
    /// Exact `cClassTrib`.
    pub class_code: Option<String>,
    pub kpi: KpiFilter,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period = Some((start, end));
        self
    }

    /// Blank queries are ignored.
    pub fn with_query(mut self, query: &str) -> Self {
        let query = query.trim().to_lowercase();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    pub fn with_class_code(mut self, code: impl Into<String>) -> Self {
        self.class_code = Some(code.into());
        self
    }

    pub fn with_kpi(mut self, kpi: KpiFilter) -> Self {
        self.kpi = kpi;
        self
    }

    pub fn matches(&self, item: &LineItem) -> bool {
        if let Some((start, end)) = self.period {
            match item.emission_date {
                Some(date) if date >= start && date <= end => {}
                _ => return false,
            }
        }
        if let Some(query) = &self.query {
            if !item.description.to_lowercase().contains(query.as_str()) {
                return false;
            }
        }
        if let Some(code) = &self.class_code {
            if item.tax_class_code != *code {
                return false;
            }
        }
        self.kpi.matches(item)
    }

    pub fn apply(&self, records: &[LineItem]) -> Vec<LineItem> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Distinct non-empty tax class codes, sorted.
pub fn class_codes(records: &[LineItem]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.tax_class_code.trim())
        .filter(|code| !code.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Earliest and latest emission date; `None` when no record is dated.
pub fn date_bounds(records: &[LineItem]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().filter_map(|r| r.emission_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}
