use std::mem;

use chrono::{Datelike, Days, Months, NaiveDate};

/// The dates of one month padded with neighbouring days to whole
/// Monday-first weeks.
#[derive(Debug, Clone)]
pub struct MonthView(NaiveDate, NaiveDate);

impl MonthView {
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = first.checked_add_months(Months::new(1))?.pred_opt()?;

        let start = first.checked_sub_days(Days::new(first.weekday().num_days_from_monday().into()))?;
        let end = last.checked_add_days(Days::new(
            (6 - last.weekday().num_days_from_monday()).into(),
        ))?;

        Some(Self(start, end))
    }
}

impl Iterator for MonthView {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0.succ_opt()?;
            Some(mem::replace(&mut self.0, next))
        } else {
            None
        }
    }
}
