use anyhow::{anyhow, Result};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Serialize, Serializer};

/// Fractional number of months since the month the group was created in.
/// Whole numbers fall on the first day of a calendar month.
#[derive(Debug, PartialEq, PartialOrd, Clone)]
pub struct Cycle(BigDecimal);

impl Cycle {
    pub fn zero() -> Self {
        Self(BigDecimal::zero())
    }

    pub fn whole(n: i64) -> Self {
        Self(BigDecimal::from(n))
    }

    /// Integer cycle number, rounded toward negative infinity.
    pub fn number(&self) -> i64 {
        let truncated = self.0.with_scale(0);
        let number = truncated.to_i64().unwrap_or_default();
        if truncated > self.0 {
            number - 1
        } else {
            number
        }
    }

    /// Position within the month, in [0, 1).
    pub fn fraction(&self) -> BigDecimal {
        &self.0 - BigDecimal::from(self.number())
    }

    pub fn next_boundary(&self) -> Cycle {
        Cycle::whole(self.number() + 1)
    }
}

impl From<BigDecimal> for Cycle {
    fn from(value: BigDecimal) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("{}", self.0.round(4).normalized()))
    }
}

impl Serialize for Cycle {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}", self))
    }
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn first_day_of_next_month(date: NaiveDate) -> Result<NaiveDate> {
    first_day_of_month(date)
        .checked_add_months(Months::new(1))
        .ok_or_else(|| anyhow!("Date out of range: {}", date))
}

pub fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate> {
    first_day_of_next_month(date)?
        .pred_opt()
        .ok_or_else(|| anyhow!("Date out of range: {}", date))
}

pub fn days_in_month(date: NaiveDate) -> Result<u32> {
    Ok(last_day_of_month(date)?.day())
}

fn months_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later.year() as i64 - earlier.year() as i64) * 12 + later.month() as i64
        - earlier.month() as i64
}

/// Cycle position of `date` for a group created on `created`.
pub fn cycle_at(created: NaiveDate, date: NaiveDate) -> Result<Cycle> {
    let whole = BigDecimal::from(months_between(created, date));
    let into_month = BigDecimal::from(date.day() - 1) / BigDecimal::from(days_in_month(date)?);

    Ok(Cycle(whole + into_month))
}
