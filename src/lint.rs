use std::collections::HashSet;

use anyhow::anyhow;
use clap::Args;
use tracing::info;

use crate::parsing::{Directive, Entry, EventLog};

#[derive(Debug, Args)]
pub struct Command {}

trait LintCheck {
    fn check_entry(&mut self, entry: &Entry) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct RequireLeadingStartCheck {
    seen: bool,
}

impl LintCheck for RequireLeadingStartCheck {
    fn check_entry(&mut self, entry: &Entry) -> anyhow::Result<()> {
        if self.seen {
            return Ok(());
        }
        self.seen = true;

        match entry.directive {
            Directive::Start(_) => Ok(()),
            _ => Err(anyhow!(
                "{}: first entry must be 'start', found '{}'",
                entry.date,
                entry.directive.keyword()
            )),
        }
    }
}

#[derive(Debug, Default)]
struct NoSelfPaymentsCheck {}

impl LintCheck for NoSelfPaymentsCheck {
    fn check_entry(&mut self, entry: &Entry) -> anyhow::Result<()> {
        match &entry.directive {
            Directive::Payment { from, to, .. } if from == to => {
                Err(anyhow!("{}: '{}' pays themselves", entry.date, from))
            }
            Directive::Start(late) => match late.iter().find(|p| p.is_self_payment()) {
                Some(p) => Err(anyhow!("{}: '{}' owes themselves", entry.date, p.from)),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct RequireDeclaredMembersCheck {
    members: HashSet<String>,
}

impl RequireDeclaredMembersCheck {
    fn require(&self, entry: &Entry, name: &str) -> anyhow::Result<()> {
        if !self.members.contains(name) {
            return Err(anyhow!("{}: unknown member '{}'", entry.date, name));
        }

        Ok(())
    }
}

impl LintCheck for RequireDeclaredMembersCheck {
    fn check_entry(&mut self, entry: &Entry) -> anyhow::Result<()> {
        match &entry.directive {
            Directive::Start(late) => {
                // Seeded obligations introduce their parties.
                for p in late {
                    self.members.insert(p.from.clone());
                    self.members.insert(p.to.clone());
                }

                Ok(())
            }
            Directive::HaveNeed { name, .. } => {
                self.members.insert(name.clone());

                Ok(())
            }
            Directive::Payment { from, to, .. } => {
                self.require(entry, from)?;
                self.require(entry, to)
            }
            Directive::Exit(name) => self.require(entry, name),
        }
    }
}

pub fn check(log: &EventLog) -> anyhow::Result<()> {
    let mut checks: Vec<Box<dyn LintCheck>> = vec![
        Box::new(RequireLeadingStartCheck::default()),
        Box::new(NoSelfPaymentsCheck::default()),
        Box::new(RequireDeclaredMembersCheck::default()),
    ];

    for entry in log.iter_entries() {
        for check in checks.iter_mut() {
            check.check_entry(entry)?;
        }
    }

    // Catches ordering problems the entry checks cannot see.
    log.events()?;

    Ok(())
}

pub fn execute_command(log: &EventLog, _cmd: &Command) -> anyhow::Result<()> {
    check(log)?;

    info!("ok");

    Ok(())
}
