use clap::Args;

use crate::{model::*, normalize::normalize};

#[derive(Debug, Args)]
pub struct Command {
    #[arg(short, long)]
    pub json: bool,
}

pub fn execute_command(events: &[Event], cmd: &Command) -> anyhow::Result<()> {
    let normalized = normalize(events)?;

    if cmd.json {
        println!("{}", serde_json::to_string(&normalized)?);

        return Ok(());
    }

    for event in normalized.iter() {
        println!("{}", event);
        if let Event::CycleStart(start) = event {
            for p in start.late_payments.iter() {
                println!("    {}", p);
            }
        }
    }

    Ok(())
}
