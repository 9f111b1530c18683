//! Output formatting

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print `data` as JSON or YAML, or hand it to `text` for the human summary.
    pub fn print<T: Serialize>(&self, data: &T, text: impl FnOnce(&T)) -> Result<(), String> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(data).map_err(|e| e.to_string())?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(data).map_err(|e| e.to_string())?);
            }
            OutputFormat::Text => text(data),
        }
        Ok(())
    }
}
