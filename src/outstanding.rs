use bigdecimal::Signed;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::{
    engine::{replay, Options},
    model::*,
    split::MincomeProportional,
};

#[derive(Debug, Args)]
pub struct Command {
    #[arg(short, long)]
    pub json: bool,
    /// Only obligations this member pays or receives.
    pub member: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Due<'a> {
    due_on: String,
    late_payments: Vec<Obligation<'a>>,
}

pub(crate) fn format_money(amount: &Money) -> String {
    format!("${}", amount.round(2).with_scale(2))
}

fn format_obligation(obligation: &Obligation<'_>, width: usize) -> String {
    let p = obligation.payment;
    let row = format!(
        "{:>14} {:width$} -> {}",
        format_money(&p.amount),
        p.from,
        p.to,
        width = width
    );

    if obligation.is_partial() {
        format!("{} (partial, of {})", row, format_money(&obligation.total))
    } else {
        row
    }
}

/// One line per obligation. Negative amounts are money the recipient is
/// holding on behalf of the payer.
pub(crate) fn print_obligations(obligations: &[Obligation<'_>], indent: &str) {
    let width = obligations
        .iter()
        .map(|o| o.payment.from.len())
        .max()
        .unwrap_or_default();

    for obligation in obligations {
        let row = format_obligation(obligation, width);
        let row = if obligation.payment.amount.is_negative() {
            row.red()
        } else if obligation.is_partial() {
            row.cyan()
        } else {
            row.normal()
        };

        println!("{}{}", indent, row);
    }
}

pub fn execute_command(events: &[Event], options: &Options, cmd: &Command) -> anyhow::Result<()> {
    let outcome = replay(events, options, &MincomeProportional)?;
    let due_on = outcome.due_on()?;
    let late = outcome
        .trailing()
        .obligations()
        .filter(|o| match &cmd.member {
            Some(name) => o.payment.involves(name),
            None => true,
        })
        .collect_vec();

    info!(
        payments = late.len(),
        group = outcome.late_payments().len(),
        %due_on,
        "outstanding"
    );

    if cmd.json {
        let due = Due {
            due_on: due_on.format("%Y-%m-%d").to_string(),
            late_payments: late,
        };
        println!("{}", serde_json::to_string(&due)?);

        return Ok(());
    }

    if late.is_empty() {
        println!("Nothing outstanding for {}", due_on);
    } else {
        let total: Money = late.iter().map(|o| o.payment.amount.clone()).sum();
        let header = format!("Due {}, {} in total", due_on, format_money(&total));
        println!("{}", header.bold());
        print_obligations(&late, "");
    }

    Ok(())
}
