//! Remove command

use super::{live_summary, Failure};
use crate::output::OutputFormat;
use colored::Colorize;
use peersync::{Provisioner, RemoveOutcome};

pub async fn handle(
    provisioner: &Provisioner,
    name: &str,
    format: OutputFormat,
) -> Result<(), Failure> {
    let outcome = provisioner.remove(name).await?;
    format.print(&outcome, print_text)?;
    Ok(())
}

fn print_text(outcome: &RemoveOutcome) {
    println!("{}", format!("Peer {} removed", outcome.record.name).green().bold());
    println!("  Public key: {}", outcome.record.public_key);
    println!("  Address:    {}", outcome.record.ip);
    if !outcome.block_removed {
        println!("  {}", "No configuration block was found for this peer".yellow());
    }
    println!("  Live:       {}", live_summary(&outcome.live));
}
