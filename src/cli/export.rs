use std::path::PathBuf;

use memory_bank::MemoryBank;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Only export this section (all mapped sections by default)
    section: Option<String>,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let bank = MemoryBank::open(root)?;

        match bank.export_markdown(self.section.as_deref())? {
            Some(path) => println!("Exported to {}", path.display()),
            None => anyhow::bail!(
                "Section '{}' has no markdown file to export",
                self.section.unwrap_or_default()
            ),
        }

        Ok(())
    }
}
