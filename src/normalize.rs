use thiserror::Error;
use tracing::{debug, warn};

use crate::{model::*, time::first_day_of_next_month};

#[derive(Debug, Error)]
pub enum Error {
    #[error("event log is empty")]
    Empty,
    #[error("event log must begin with a cycle start, found '{0}'")]
    MissingCycleStart(&'static str),
    #[error("event log must begin at cycle 0, found a start at cycle {0}")]
    NotCreation(Cycle),
    #[error("'{kind}' at cycle {cycle} comes before cycle {previous}")]
    OutOfOrder {
        kind: &'static str,
        cycle: Cycle,
        previous: Cycle,
    },
    #[error("no calendar month follows {0}")]
    Calendar(NaiveDate),
}

fn following(last: &CycleStart) -> Result<CycleStart, Error> {
    let when = first_day_of_next_month(last.when).map_err(|_| Error::Calendar(last.when))?;

    Ok(CycleStart::new(last.cycle.next_boundary(), when))
}

/// Returns a copy of `events` with a cycle start for every month boundary the
/// stream crosses, followed by one trailing boundary after the last event.
pub fn normalize(events: &[Event]) -> Result<Vec<Event>, Error> {
    let (first, rest) = events.split_first().ok_or(Error::Empty)?;
    let mut last = first
        .as_cycle_start()
        .ok_or_else(|| Error::MissingCycleStart(first.kind()))?
        .clone();
    if last.cycle != Cycle::zero() {
        return Err(Error::NotCreation(last.cycle));
    }

    let mut normalized = vec![first.clone()];
    let mut previous = first.cycle();

    for event in rest {
        if event.cycle() < previous {
            return Err(Error::OutOfOrder {
                kind: event.kind(),
                cycle: event.cycle().clone(),
                previous: previous.clone(),
            });
        }
        previous = event.cycle();

        // An explicit boundary stands in for the synthetic one of its own month.
        let through = match event {
            Event::CycleStart(start) => start.cycle.number() - 1,
            _ => event.cycle().number(),
        };

        while last.cycle.number() < through {
            let synthesized = following(&last)?;
            debug!(cycle = %synthesized.cycle, when = %synthesized.when, "synthesized");
            normalized.push(Event::CycleStart(synthesized.clone()));
            last = synthesized;
        }

        match event {
            Event::CycleStart(start) if start.cycle.number() <= last.cycle.number() => {
                warn!(cycle = %start.cycle, "dropping duplicate cycle start");
            }
            Event::CycleStart(start) => {
                last = start.clone();
                normalized.push(event.clone());
            }
            _ => normalized.push(event.clone()),
        }
    }

    normalized.push(Event::CycleStart(following(&last)?));

    Ok(normalized)
}
