//! Check command

use super::Failure;
use crate::output::OutputFormat;
use colored::Colorize;
use peersync::{ConsistencyReport, Provisioner};

pub fn handle(provisioner: &Provisioner, format: OutputFormat) -> Result<(), Failure> {
    let report = provisioner.check()?;
    format.print(&report, print_text)?;

    if report.is_consistent() {
        Ok(())
    } else {
        Err(Failure::Failed("peer registry and gateway configuration disagree".into()))
    }
}

fn print_text(report: &ConsistencyReport) {
    if report.is_consistent() {
        println!("{}", "Registry and configuration agree.".green().bold());
        return;
    }
    for name in &report.missing_blocks {
        println!("{} {}: registered but has no configuration block", "!".red(), name);
    }
    for name in &report.unregistered_blocks {
        println!("{} {}: configuration block but no registry row", "!".red(), name);
    }
    for name in &report.duplicate_blocks {
        println!("{} {}: more than one configuration block", "!".red(), name);
    }
}
