//! Add command

use super::{live_summary, Failure};
use crate::output::OutputFormat;
use colored::Colorize;
use peersync::{AddOutcome, Provisioner};

pub async fn handle(
    provisioner: &Provisioner,
    name: &str,
    format: OutputFormat,
) -> Result<(), Failure> {
    let outcome = provisioner.add(name).await?;
    format.print(&outcome, print_text)?;
    Ok(())
}

fn print_text(outcome: &AddOutcome) {
    println!("{}", format!("Peer {} added", outcome.record.name).green().bold());
    println!("  Public key: {}", outcome.record.public_key);
    println!("  Address:    {}, {}", outcome.record.ip, outcome.ipv6);
    println!("  Profile:    {}", outcome.profile.cyan());
    println!("  Live:       {}", live_summary(&outcome.live));
}
