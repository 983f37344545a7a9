use clap::Args;
use colored::Colorize;

use crate::{
    engine::{replay, Options},
    model::*,
    outstanding::print_obligations,
    split::MincomeProportional,
};

#[derive(Debug, Args)]
pub struct Command {
    #[arg(short, long)]
    pub json: bool,
    /// Hide boundaries with nothing outstanding.
    #[arg(short, long)]
    pub settled: bool,
}

pub fn execute_command(events: &[Event], options: &Options, cmd: &Command) -> anyhow::Result<()> {
    let outcome = replay(events, options, &MincomeProportional)?;

    let boundaries = outcome
        .boundaries()
        .iter()
        .filter(|b| !cmd.settled || !b.late_payments.is_empty())
        .collect_vec();

    if cmd.json {
        println!("{}", serde_json::to_string(&boundaries)?);

        return Ok(());
    }

    for boundary in boundaries {
        let header = format!(
            "{} cycle {}",
            boundary.when.format("%Y/%m/%d"),
            boundary.cycle
        );

        if boundary.late_payments.is_empty() {
            println!("{} {}", header, "settled".green());
        } else {
            println!("{}", header.yellow());
            print_obligations(&boundary.obligations().collect_vec(), "    ");
        }
    }

    Ok(())
}
