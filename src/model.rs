use serde::{ser::SerializeStruct, Serialize};

pub use anyhow::Result;
pub use bigdecimal::{BigDecimal, Zero};
pub use chrono::NaiveDate;
pub use itertools::Itertools;

pub use crate::distribution::{Distribution, Money, Payment};
pub use crate::time::Cycle;

#[derive(Debug, PartialEq, Clone)]
pub struct CycleStart {
    pub cycle: Cycle,
    pub when: NaiveDate,
    pub late_payments: Distribution,
    /// What each pair owed over the cycle before payments made during it.
    pub totals: Distribution,
}

impl CycleStart {
    pub fn new(cycle: Cycle, when: NaiveDate) -> Self {
        Self {
            cycle,
            when,
            late_payments: Distribution::empty(),
            totals: Distribution::empty(),
        }
    }

    pub fn with_late_payments(self, late_payments: Distribution) -> Self {
        Self {
            late_payments,
            ..self
        }
    }

    pub fn with_totals(self, totals: Distribution) -> Self {
        Self { totals, ..self }
    }

    pub fn obligations(&self) -> impl Iterator<Item = Obligation<'_>> {
        self.late_payments.iter().map(|payment| Obligation {
            payment,
            total: self
                .totals
                .flow_between(&payment.from, &payment.to)
                .unwrap_or_else(|| payment.amount.clone()),
        })
    }
}

impl Serialize for CycleStart {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CycleStart", 3)?;
        state.serialize_field("cycle", &self.cycle)?;
        state.serialize_field("when", &self.when.format("%Y-%m-%d").to_string())?;
        state.serialize_field("latePayments", &self.obligations().collect_vec())?;
        state.end()
    }
}

/// A late payment next to the amount it started the cycle at.
#[derive(Debug, PartialEq, Clone)]
pub struct Obligation<'a> {
    pub payment: &'a Payment,
    pub total: Money,
}

impl Obligation<'_> {
    /// Some, but not all, of it was paid.
    pub fn is_partial(&self) -> bool {
        self.payment.amount > Money::zero() && self.payment.amount < self.total
    }
}

impl Serialize for Obligation<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Obligation", 5)?;
        state.serialize_field("from", &self.payment.from)?;
        state.serialize_field("to", &self.payment.to)?;
        state.serialize_field("amount", &format!("{}", self.payment.amount.with_scale(2)))?;
        state.serialize_field("total", &format!("{}", self.total.with_scale(2)))?;
        state.serialize_field("partial", &self.is_partial())?;
        state.end()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Event {
    CycleStart(CycleStart),
    HaveNeed {
        name: String,
        have_need: Money,
        cycle: Cycle,
    },
    Payment {
        from: String,
        to: String,
        amount: Money,
        cycle: Cycle,
    },
    UserExitsGroup {
        name: String,
        cycle: Cycle,
    },
}

impl Event {
    pub fn cycle(&self) -> &Cycle {
        match self {
            Event::CycleStart(start) => &start.cycle,
            Event::HaveNeed { cycle, .. }
            | Event::Payment { cycle, .. }
            | Event::UserExitsGroup { cycle, .. } => cycle,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::CycleStart(_) => "start",
            Event::HaveNeed { .. } => "have-need",
            Event::Payment { .. } => "payment",
            Event::UserExitsGroup { .. } => "exit",
        }
    }

    pub fn as_cycle_start(&self) -> Option<&CycleStart> {
        match self {
            Event::CycleStart(start) => Some(start),
            _ => None,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::CycleStart(start) => f.pad(&format!(
                "{:>8} start {}",
                start.cycle,
                start.when.format("%Y/%m/%d")
            )),
            Event::HaveNeed {
                name,
                have_need,
                cycle,
            } => f.pad(&format!("{:>8} have-need {} {}", cycle, name, have_need)),
            Event::Payment {
                from,
                to,
                amount,
                cycle,
            } => f.pad(&format!("{:>8} payment {} {} {}", cycle, from, to, amount)),
            Event::UserExitsGroup { name, cycle } => {
                f.pad(&format!("{:>8} exit {}", cycle, name))
            }
        }
    }
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Event::CycleStart(start) => {
                let mut state = serializer.serialize_struct("Event", 4)?;
                state.serialize_field("type", self.kind())?;
                state.serialize_field("cycle", &start.cycle)?;
                state.serialize_field("when", &start.when.format("%Y-%m-%d").to_string())?;
                state.serialize_field("latePayments", &start.late_payments)?;
                state.end()
            }
            Event::HaveNeed {
                name,
                have_need,
                cycle,
            } => {
                let mut state = serializer.serialize_struct("Event", 4)?;
                state.serialize_field("type", self.kind())?;
                state.serialize_field("cycle", cycle)?;
                state.serialize_field("name", name)?;
                state.serialize_field("haveNeed", &format!("{}", have_need))?;
                state.end()
            }
            Event::Payment {
                from,
                to,
                amount,
                cycle,
            } => {
                let mut state = serializer.serialize_struct("Event", 5)?;
                state.serialize_field("type", self.kind())?;
                state.serialize_field("cycle", cycle)?;
                state.serialize_field("from", from)?;
                state.serialize_field("to", to)?;
                state.serialize_field("amount", &format!("{}", amount.with_scale(2)))?;
                state.end()
            }
            Event::UserExitsGroup { name, cycle } => {
                let mut state = serializer.serialize_struct("Event", 3)?;
                state.serialize_field("type", self.kind())?;
                state.serialize_field("cycle", cycle)?;
                state.serialize_field("name", name)?;
                state.end()
            }
        }
    }
}
