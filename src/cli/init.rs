use std::path::{Path, PathBuf};

use memory_bank::{Config, MemoryBank, storage::STATE_FILE};
use tracing::instrument;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The memory bank directory, relative to the project root
    #[arg(long, value_name = "DIR", default_value = "memory-bank")]
    directory: PathBuf,
}

impl Command {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(Config::FILE_NAME);
        if config_path.exists() {
            anyhow::bail!(
                "Memory bank already initialized (found existing {})",
                Config::FILE_NAME
            );
        }

        let mut config = Config::default();
        config.set_directory(self.directory);
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", Config::FILE_NAME))?;

        MemoryBank::open_with_config(root, &config)?;
        let directory = config.directory().display();

        println!("Initialized memory bank in {}", root.display());
        println!("  Created: {}", Config::FILE_NAME);
        println!("  Created: {directory}/{STATE_FILE}");
        println!();
        println!("Next steps:");
        println!("  memory-bank update projectInfo --content \"# Project Brief\"");
        println!("  memory-bank plan");

        Ok(())
    }
}
