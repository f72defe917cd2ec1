use std::{path::PathBuf, process};

use clap::Parser;
use memory_bank::MemoryBank;
use tracing::instrument;

#[derive(Debug, Parser)]
#[command(about = "Print the raw value of a section as JSON")]
pub struct Command {
    /// The section key, for example `projectInfo`
    section: String,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let bank = MemoryBank::open(root)?;

        let Some(value) = bank.get(&self.section) else {
            eprintln!("Section '{}' not found", self.section);
            process::exit(1);
        };

        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
