use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Australian Financial Year (runs 1 July to 30 June).
/// The year value is the calendar year in which the FY starts
/// (e.g., 2023 = FY2023-24, ending 30 June 2024).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// Financial year containing a date
    pub fn from_date(date: NaiveDate) -> Self {
        // FY starts 1 July: July onwards belongs to the FY starting this
        // calendar year, January-June to the FY started the year before
        if date.month() >= 7 {
            FinancialYear(date.year())
        } else {
            FinancialYear(date.year() - 1)
        }
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self::from_date(datetime.date())
    }

    /// Start date of the financial year (1 July)
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 7, 1).unwrap()
    }

    /// End date of the financial year (30 June of the following year)
    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + 1, 6, 30).unwrap()
    }

    /// Full datetime span of the financial year, midnight to 23:59:59
    pub fn date_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start().and_hms_opt(0, 0, 0).unwrap(),
            self.end().and_hms_opt(23, 59, 59).unwrap(),
        )
    }

    /// Display as "FY2023-24" format
    pub fn label(&self) -> String {
        format!("FY{}-{:02}", self.0, (self.0 + 1) % 100)
    }

    /// Parse a label back to a financial year.
    ///
    /// Accepts the full "FY2023-24" form or a bare start year "2023".
    pub fn parse(s: &str) -> Option<FinancialYear> {
        let s = s.trim();
        if let Ok(year) = s.parse::<i32>() {
            return Some(FinancialYear(year));
        }
        let rest = s.strip_prefix("FY").or_else(|| s.strip_prefix("fy"))?;
        let start = rest.split('-').next()?;
        start.parse::<i32>().ok().map(FinancialYear)
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
