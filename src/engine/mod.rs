use std::time::Instant;

use thiserror::Error;
use tracing::{debug, span, Level};

use crate::{
    members::{Members, ProrationPolicy},
    model::*,
    normalize::{self, normalize},
    split::{ProportionalSplit, SplitError},
    time::last_day_of_month,
};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Stream(#[from] normalize::Error),
    #[error("'{0}' cannot pay themselves")]
    SelfPayment(String),
    #[error(transparent)]
    Split(#[from] SplitError),
}

#[derive(Debug, Clone)]
pub struct Options {
    pub minimum: Money,
    /// Net payments made during the still open final cycle.
    pub adjusted: bool,
    pub proration: ProrationPolicy,
}

impl Options {
    pub fn new(minimum: impl Into<Money>) -> Self {
        Self {
            minimum: minimum.into(),
            adjusted: false,
            proration: ProrationPolicy::default(),
        }
    }

    pub fn adjusted(self, adjusted: bool) -> Self {
        Self { adjusted, ..self }
    }

    pub fn proration(self, proration: ProrationPolicy) -> Self {
        Self { proration, ..self }
    }
}

#[derive(Debug)]
pub struct Outcome {
    boundaries: Vec<CycleStart>,
    trailing: CycleStart,
}

impl Outcome {
    /// Obligations still outstanding as of the trailing boundary.
    pub fn late_payments(&self) -> &Distribution {
        &self.trailing.late_payments
    }

    /// Every boundary of the normalized stream, oldest first, ending with the
    /// trailing one.
    pub fn boundaries(&self) -> &[CycleStart] {
        &self.boundaries
    }

    pub fn trailing(&self) -> &CycleStart {
        &self.trailing
    }

    /// Last day of the month the outstanding obligations belong to.
    pub fn due_on(&self) -> Result<NaiveDate> {
        let when = self.trailing.when;
        let previous = when
            .pred_opt()
            .ok_or_else(|| anyhow::anyhow!("Date out of range: {}", when))?;

        last_day_of_month(previous)
    }
}

struct Replay<'r, S: ?Sized> {
    split: &'r S,
    options: &'r Options,
    members: Members,
    completed: Vec<Payment>,
    last: CycleStart,
    boundaries: Vec<CycleStart>,
}

impl<'r, S: ProportionalSplit + ?Sized> Replay<'r, S> {
    fn new(split: &'r S, options: &'r Options, seed: CycleStart) -> Self {
        Self {
            split,
            options,
            members: Members::new(options.proration),
            completed: Vec::default(),
            last: seed.clone(),
            boundaries: vec![seed],
        }
    }

    fn apply(&mut self, event: &Event, is_final: bool) -> Result<(), Error> {
        match event {
            Event::CycleStart(start) => self.close_cycle(start, is_final),
            Event::HaveNeed {
                name,
                have_need,
                cycle,
            } => {
                self.members.declare(name, have_need, cycle);
                Ok(())
            }
            Event::Payment {
                from, to, amount, ..
            } => {
                if from == to {
                    return Err(Error::SelfPayment(from.clone()));
                }
                self.completed.push(Payment::new(from, to, amount.clone()));
                Ok(())
            }
            Event::UserExitsGroup { name, .. } => {
                self.members.exit(name);
                Ok(())
            }
        }
    }

    fn close_cycle(&mut self, start: &CycleStart, is_final: bool) -> Result<(), Error> {
        let minimum = &self.options.minimum;
        let raw = self.split.split(&self.members.incomes(minimum), minimum)?;

        let netted = if !is_final || self.options.adjusted {
            raw.subtract(&Distribution::new(self.completed.clone()))
                .add(&self.last.late_payments)
        } else {
            raw.add(&self.last.late_payments)
        };

        let (overpaid, owed) = netted.partition_overpayments();
        let redistributed = self.redistribute(&overpaid);
        let late = owed.add(&redistributed).without_degenerate();

        debug!(
            cycle = %start.cycle,
            overpaid = overpaid.len(),
            late = late.len(),
            "closed"
        );

        let boundary = start
            .clone()
            .with_late_payments(late)
            .with_totals(raw.add(&self.last.late_payments).add(&redistributed));
        self.boundaries.push(boundary.clone());
        self.last = boundary;

        self.members.reset();
        self.completed.clear();

        Ok(())
    }

    /// Money an overpaid recipient is holding goes to the other needers, in
    /// proportion to their need. With nobody else in need the overpayment stays
    /// with its recipient as a negative obligation.
    fn redistribute(&self, overpaid: &Distribution) -> Distribution {
        overpaid
            .iter()
            .flat_map(|p| {
                let excluded = [p.from.as_str(), p.to.as_str()];
                let needers = self.members.needers_excluding(&excluded).collect_vec();
                let total_need: Money = needers.iter().map(|(_, need)| need.clone()).sum();

                if total_need.is_zero() {
                    debug!(
                        from = %p.from,
                        to = %p.to,
                        amount = %p.amount,
                        "no other needers, keeping overpayment"
                    );
                    vec![p.negate()]
                } else {
                    // The last needer takes the remainder so shares add up exactly.
                    let last = needers.len() - 1;
                    let mut remaining = p.amount.clone();
                    needers
                        .into_iter()
                        .enumerate()
                        .map(|(i, (name, need))| {
                            let share = if i == last {
                                remaining.clone()
                            } else {
                                &p.amount * need / total_need.clone()
                            };
                            remaining -= &share;
                            Payment::new(&p.from, name, share)
                        })
                        .collect_vec()
                }
            })
            .collect()
    }
}

/// Replays `events` from scratch and returns every cycle boundary with the
/// obligations outstanding at it.
pub fn replay<S>(events: &[Event], options: &Options, split: &S) -> Result<Outcome, Error>
where
    S: ProportionalSplit + ?Sized,
{
    let _span = span!(Level::INFO, "replay").entered();
    let started = Instant::now();

    let normalized = normalize(events)?;
    let (seed, rest) = match normalized.split_first() {
        Some((Event::CycleStart(seed), rest)) => (seed.clone(), rest),
        Some((first, _)) => return Err(normalize::Error::MissingCycleStart(first.kind()).into()),
        None => return Err(normalize::Error::Empty.into()),
    };

    let mut replay = Replay::new(split, options, seed);
    for (i, event) in rest.iter().enumerate() {
        replay.apply(event, i + 1 == rest.len())?;
    }

    let elapsed = Instant::now() - started;
    debug!(
        events = normalized.len(),
        boundaries = replay.boundaries.len(),
        "replayed in {:?}",
        elapsed
    );

    Ok(Outcome {
        trailing: replay.last,
        boundaries: replay.boundaries,
    })
}

/// Who owes whom, and how much, right now. The commands go through `replay`
/// since they also report due dates and totals.
#[cfg(test)]
pub fn outstanding<S>(events: &[Event], options: &Options, split: &S) -> Result<Distribution, Error>
where
    S: ProportionalSplit + ?Sized,
{
    Ok(replay(events, options, split)?.late_payments().clone())
}
