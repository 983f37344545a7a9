use bigdecimal::{BigDecimal, Signed, Zero};
use itertools::Itertools;
use thiserror::Error;

use crate::distribution::{Distribution, Money, Payment};

/// A member's absolute monthly income, `minimum + position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    pub name: String,
    pub amount: Money,
}

impl Income {
    pub fn new(name: impl Into<String>, amount: impl Into<Money>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("income declared twice for '{0}'")]
    DuplicateMember(String),
    #[error("minimum must not be negative: {0}")]
    NegativeMinimum(Money),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Turns one month's incomes into the payments that bring everyone below the
/// minimum back up to it. Implementations must not depend on input order.
pub trait ProportionalSplit {
    fn split(&self, incomes: &[Income], minimum: &Money) -> Result<Distribution, SplitError>;
}

impl<F> ProportionalSplit for F
where
    F: Fn(&[Income], &Money) -> Result<Distribution, SplitError>,
{
    fn split(&self, incomes: &[Income], minimum: &Money) -> Result<Distribution, SplitError> {
        self(incomes, minimum)
    }
}

/// Every have pays every needer `surplus * need / max(total surplus, total need)`.
///
/// When the haves can cover all need, needers land exactly on the minimum and
/// haves share the cost in proportion to their surplus. Otherwise haves give
/// their entire surplus, divided in proportion to need.
#[derive(Debug, Default, Clone, Copy)]
pub struct MincomeProportional;

impl ProportionalSplit for MincomeProportional {
    fn split(&self, incomes: &[Income], minimum: &Money) -> Result<Distribution, SplitError> {
        if minimum.is_negative() {
            return Err(SplitError::NegativeMinimum(minimum.clone()));
        }

        let sorted = incomes
            .iter()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect_vec();

        if let Some((a, _)) = sorted
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.name == b.name)
        {
            return Err(SplitError::DuplicateMember(a.name.clone()));
        }

        let haves = sorted
            .iter()
            .map(|i| (i.name.as_str(), &i.amount - minimum))
            .filter(|(_, surplus)| surplus.is_positive())
            .collect_vec();
        let needers = sorted
            .iter()
            .map(|i| (i.name.as_str(), minimum - &i.amount))
            .filter(|(_, need)| need.is_positive())
            .collect_vec();

        let total_surplus: BigDecimal = haves.iter().map(|(_, s)| s.clone()).sum();
        let total_need: BigDecimal = needers.iter().map(|(_, n)| n.clone()).sum();

        if total_surplus.is_zero() || total_need.is_zero() {
            return Ok(Distribution::empty());
        }

        let scale = std::cmp::max(total_surplus, total_need);

        Ok(haves
            .iter()
            .cartesian_product(needers.iter())
            .map(|((have, surplus), (needer, need))| {
                Payment::new(*have, *needer, surplus * need / scale.clone())
            })
            .collect())
    }
}
