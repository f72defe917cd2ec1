use std::path::PathBuf;

use memory_bank::MemoryBank;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The section to import into
    section: String,

    /// The markdown file to read (defaults to the section's exported file)
    #[arg(long)]
    path: Option<PathBuf>,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut bank = MemoryBank::open(root)?;

        if !bank.import_markdown(&self.section, self.path.as_deref())? {
            anyhow::bail!("Nothing imported into '{}'", self.section);
        }

        println!("Imported {}", self.section);
        Ok(())
    }
}
