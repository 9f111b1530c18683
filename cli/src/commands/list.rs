//! List command

use super::Failure;
use crate::output::OutputFormat;
use colored::Colorize;
use peersync::{PeerRecord, Provisioner};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct PeerRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ADDRESS")]
    ip: String,
    #[tabled(rename = "PUBLIC KEY")]
    public_key: String,
}

pub fn handle(provisioner: &Provisioner, format: OutputFormat) -> Result<(), Failure> {
    let peers = provisioner.list()?;
    format.print(&peers, |peers| print_table(peers))?;
    Ok(())
}

fn print_table(peers: &[PeerRecord]) {
    if peers.is_empty() {
        println!("{}", "No peers registered.".yellow());
        return;
    }
    let rows = peers.iter().map(|p| PeerRow {
        name: p.name.clone(),
        ip: p.ip.to_string(),
        public_key: p.public_key.clone(),
    });
    println!("{}", Table::new(rows).with(Style::sharp()));
}
