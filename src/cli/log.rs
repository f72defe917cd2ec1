use std::path::PathBuf;

use memory_bank::MemoryBank;
use serde_json::Value;
use tracing::instrument;

use super::{into_map, parse_key_value};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// What changed
    description: String,

    /// Structured detail, as KEY=VALUE (repeatable)
    #[arg(long = "detail", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    details: Vec<(String, Value)>,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut bank = MemoryBank::open(root)?;
        let details = (!self.details.is_empty()).then(|| into_map(self.details));
        bank.log_change(&self.description, details)?;

        println!("Logged: {}", self.description);
        Ok(())
    }
}
