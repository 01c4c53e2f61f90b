use crate::error::BusinessDayError;
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Advance `start` by `n` business days (Monday to Friday).
///
/// No holiday calendar: only weekends are skipped. `n = 0` returns `start`
/// unchanged even when it falls on a weekend.
pub fn add_business_days(start: NaiveDate, n: i64) -> Result<NaiveDate, BusinessDayError> {
    if n < 0 {
        return Err(BusinessDayError::NegativeOffset(n));
    }
    if n == 0 {
        return Ok(start);
    }

    let out_of_range = || BusinessDayError::OutOfRange(n);

    // First step lands on a business day; from there five business days are one week.
    let mut current = next_business_day(start).ok_or_else(out_of_range)?;
    let remaining = n - 1;

    let week_days = u64::try_from(remaining / 5)
        .ok()
        .and_then(|weeks| weeks.checked_mul(7))
        .ok_or_else(out_of_range)?;
    current = current
        .checked_add_days(Days::new(week_days))
        .ok_or_else(out_of_range)?;

    for _ in 0..remaining % 5 {
        current = next_business_day(current).ok_or_else(out_of_range)?;
    }
    Ok(current)
}

fn next_business_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut next = date.succ_opt()?;
    while !is_business_day(next) {
        next = next.succ_opt()?;
    }
    Some(next)
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
