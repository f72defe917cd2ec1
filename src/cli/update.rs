use std::{fs, path::PathBuf};

use memory_bank::MemoryBank;
use serde_json::Value;
use tracing::instrument;

use super::{into_map, parse_key_value};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The section key, for example `productContext`
    section: String,

    /// New markdown content for the section
    #[arg(long, conflicts_with = "file")]
    content: Option<String>,

    /// Read the new content from a file
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Extra fields, as KEY=VALUE (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    fields: Vec<(String, Value)>,
}

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let content = match (self.content, &self.file) {
            (Some(content), _) => content,
            (None, Some(path)) => fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?,
            (None, None) => String::new(),
        };

        let mut bank = MemoryBank::open(root)?;
        if !bank.update(&self.section, &content, &into_map(self.fields))? {
            anyhow::bail!("Section '{}' not found", self.section);
        }

        println!("Updated {}", self.section);
        Ok(())
    }
}
