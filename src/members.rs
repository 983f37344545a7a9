use bigdecimal::{BigDecimal, Signed, Zero};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{distribution::Money, split::Income, time::Cycle};

/// How a declared position is weighted across the month it was declared in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProrationPolicy {
    /// The latest declaration counts for the whole month.
    #[default]
    MonthlyRated,
    TimeWeighted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub have_need: Money,
    pub cyclical_income_variable: BigDecimal,
    pub cyclical_income_integral: BigDecimal,
}

impl Member {
    fn new(name: &str, have_need: Money, cycle: &Cycle) -> Self {
        Self {
            name: name.to_owned(),
            have_need,
            cyclical_income_variable: cycle.fraction(),
            cyclical_income_integral: BigDecimal::zero(),
        }
    }

    fn declare(&mut self, have_need: Money, cycle: &Cycle, policy: ProrationPolicy) {
        self.have_need = have_need;

        let position = cycle.fraction();
        let delta = &position - &self.cyclical_income_variable;

        self.cyclical_income_integral = match policy {
            ProrationPolicy::MonthlyRated => self.have_need.clone(),
            ProrationPolicy::TimeWeighted => {
                &self.cyclical_income_integral + delta * &self.have_need
            }
        };
        self.cyclical_income_variable = position;
    }

    /// Position relative to the minimum for the month ending now.
    pub fn position(&self, policy: ProrationPolicy) -> Money {
        match policy {
            ProrationPolicy::MonthlyRated => self.have_need.clone(),
            ProrationPolicy::TimeWeighted => {
                let remaining = BigDecimal::from(1) - &self.cyclical_income_variable;
                &self.cyclical_income_integral + remaining * &self.have_need
            }
        }
    }

    pub fn is_needer(&self) -> bool {
        self.have_need.is_negative()
    }

    fn reset(&mut self) {
        self.cyclical_income_variable = BigDecimal::zero();
        self.cyclical_income_integral = BigDecimal::zero();
    }
}

/// The live member set of one replay, in order of first declaration.
#[derive(Debug, Default)]
pub struct Members {
    policy: ProrationPolicy,
    members: Vec<Member>,
}

impl Members {
    pub fn new(policy: ProrationPolicy) -> Self {
        Self {
            policy,
            members: Vec::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn declare(&mut self, name: &str, have_need: &Money, cycle: &Cycle) {
        match self.members.iter_mut().find(|m| m.name == name) {
            Some(member) => member.declare(have_need.clone(), cycle, self.policy),
            None => {
                debug!(%name, %have_need, "joined");
                self.members.push(Member::new(name, have_need.clone(), cycle))
            }
        }
    }

    pub fn exit(&mut self, name: &str) {
        if self.get(name).is_none() {
            warn!(%name, "exit for unknown member");
        }
        self.members.retain(|m| m.name != name);
    }

    pub fn reset(&mut self) {
        for member in self.members.iter_mut() {
            member.reset();
        }
    }

    /// Absolute incomes for the split, `minimum + position` per member.
    pub fn incomes(&self, minimum: &Money) -> Vec<Income> {
        self.members
            .iter()
            .map(|m| Income {
                name: m.name.clone(),
                amount: minimum + m.position(self.policy),
            })
            .collect()
    }

    /// Needers other than the named members, with the magnitude of their need.
    pub fn needers_excluding<'a>(
        &'a self,
        excluded: &'a [&str],
    ) -> impl Iterator<Item = (&'a str, Money)> + 'a {
        self.members
            .iter()
            .filter(|m| m.is_needer() && !excluded.iter().any(|e| *e == m.name))
            .map(|m| (m.name.as_str(), m.have_need.abs()))
    }
}
