use bigdecimal::{BigDecimal, Signed, Zero};
use itertools::Itertools;
use serde::{ser::SerializeStruct, Serialize};

pub type Money = BigDecimal;

/// An obligation of `from` toward `to`. Only netting ever flips the sign of
/// `amount`, a negative amount means `to` is the one holding the excess.
#[derive(Debug, PartialEq, Clone)]
pub struct Payment {
    pub from: String,
    pub to: String,
    pub amount: Money,
}

impl Payment {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: impl Into<Money>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
        }
    }

    pub fn is_self_payment(&self) -> bool {
        self.from == self.to
    }

    pub fn negate(&self) -> Payment {
        Payment {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: -self.amount.clone(),
        }
    }

    /// Some(true) when both payments flow the same way between the same two
    /// parties, Some(false) when they flow in opposite directions.
    fn direction_relative_to(&self, other: &Payment) -> Option<bool> {
        if self.from == other.from && self.to == other.to {
            Some(true)
        } else if self.from == other.to && self.to == other.from {
            Some(false)
        } else {
            None
        }
    }

    pub fn involves(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }
}

impl Serialize for Payment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Payment", 3)?;
        state.serialize_field("from", &self.from)?;
        state.serialize_field("to", &self.to)?;
        state.serialize_field("amount", &format!("{}", self.amount.with_scale(2)))?;
        state.end()
    }
}

impl std::fmt::Display for Payment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(
            "{} -> {} ${}",
            self.from,
            self.to,
            self.amount.with_scale(2)
        ))
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Distribution {
    payments: Vec<Payment>,
}

impl Distribution {
    pub fn new(payments: Vec<Payment>) -> Self {
        Self { payments }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Payment> {
        self.payments.iter()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Merges every payment between the same unordered pair of parties into the
    /// first payment seen for that pair. Same direction amounts add, opposite
    /// direction amounts subtract. Order follows first occurrence.
    pub fn reduce(&self) -> Distribution {
        let mut reduced: Vec<Payment> = Vec::with_capacity(self.payments.len());

        for payment in self.payments.iter() {
            let existing = reduced
                .iter_mut()
                .find_map(|p| p.direction_relative_to(payment).map(|same| (p, same)));

            match existing {
                Some((p, true)) => p.amount += &payment.amount,
                Some((p, false)) => p.amount -= &payment.amount,
                None => reduced.push(payment.clone()),
            }
        }

        Distribution { payments: reduced }
    }

    pub fn add(&self, other: &Distribution) -> Distribution {
        Distribution {
            payments: self
                .payments
                .iter()
                .chain(other.payments.iter())
                .cloned()
                .collect_vec(),
        }
        .reduce()
    }

    pub fn subtract(&self, other: &Distribution) -> Distribution {
        self.add(&other.negate())
    }

    pub fn negate(&self) -> Distribution {
        Distribution {
            payments: self.payments.iter().map(|p| p.negate()).collect_vec(),
        }
    }

    /// Drops zero amounts and payments from a party to itself.
    pub fn without_degenerate(&self) -> Distribution {
        Distribution {
            payments: self
                .payments
                .iter()
                .filter(|p| !p.amount.is_zero() && !p.is_self_payment())
                .cloned()
                .collect_vec(),
        }
    }

    /// Splits into (overpayments, still owed). Overpayment amounts are returned
    /// as magnitudes, zero amounts are dropped.
    pub fn partition_overpayments(&self) -> (Distribution, Distribution) {
        let (overpaid, owed): (Vec<_>, Vec<_>) = self
            .payments
            .iter()
            .filter(|p| !p.amount.is_zero())
            .partition(|p| p.amount.is_negative());

        (
            Distribution::new(
                overpaid
                    .into_iter()
                    .map(|p| Payment {
                        from: p.from.clone(),
                        to: p.to.clone(),
                        amount: p.amount.abs(),
                    })
                    .collect(),
            ),
            Distribution::new(owed.into_iter().cloned().collect()),
        )
    }

    /// Sum of every amount, signed.
    pub fn total(&self) -> Money {
        self.payments.iter().map(|p| p.amount.clone()).sum()
    }

    /// Signed flow from `from` to `to`, counting payments in the other
    /// direction as negative. None when the two never appear together.
    pub fn flow_between(&self, from: &str, to: &str) -> Option<Money> {
        let probe = Payment::new(from, to, 0);
        self.payments
            .iter()
            .filter_map(|p| match probe.direction_relative_to(p) {
                Some(true) => Some(p.amount.clone()),
                Some(false) => Some(-p.amount.clone()),
                None => None,
            })
            .reduce(|a, b| a + b)
    }

    #[cfg(test)]
    pub fn net_flow(&self, from: &str, to: &str) -> Money {
        self.flow_between(from, to).unwrap_or_default()
    }

    /// Only the payments `name` is a party to.
    pub fn involving(&self, name: &str) -> Distribution {
        self.payments
            .iter()
            .filter(|p| p.involves(name))
            .cloned()
            .collect()
    }
}

impl FromIterator<Payment> for Distribution {
    fn from_iter<T: IntoIterator<Item = Payment>>(iter: T) -> Self {
        Self {
            payments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Distribution {
    type Item = Payment;
    type IntoIter = std::vec::IntoIter<Payment>;

    fn into_iter(self) -> Self::IntoIter {
        self.payments.into_iter()
    }
}

impl Serialize for Distribution {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.payments.serialize(serializer)
    }
}
