use std::path::PathBuf;

use clap::Parser;
use memory_bank::{Document, Field, MemoryBank, Section, SectionName, StatusView};
use serde_json::json;
use tracing::instrument;

use super::terminal::{Paint, Tone, is_narrow, paint_status};

#[derive(Debug, Parser, Default)]
#[command(about = "Show section statuses and ready sections")]
pub struct Command {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// The tracked sections, in document order.
const TRACKED: [SectionName; 6] = [
    SectionName::ProjectInfo,
    SectionName::ProductContext,
    SectionName::SystemPatterns,
    SectionName::Technologies,
    SectionName::Tasks,
    SectionName::Standards,
];

impl Command {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let bank = MemoryBank::open(root)?;

        match self.output {
            OutputFormat::Json => Self::output_json(&bank)?,
            OutputFormat::Table => Self::output_table(&bank),
        }

        Ok(())
    }

    fn output_json(bank: &MemoryBank) -> anyhow::Result<()> {
        let document = bank.document();
        let metadata = metadata(document);

        let sections: serde_json::Map<_, _> = TRACKED
            .into_iter()
            .map(|name| (name.key().to_owned(), json!(state(document, name))))
            .collect();

        let output = json!({
            "directory": bank.directory(),
            "version": metadata.and_then(|m| m.version.as_ref()).map(Field::to_text),
            "created": metadata.and_then(|m| m.created.as_ref()),
            "lastUpdated": metadata.and_then(|m| m.last_updated.as_ref()),
            "sections": sections,
            "ready": bank.ready_sections(),
            "changes": document.change_history().map_or(0, Vec::len),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(bank: &MemoryBank) {
        let document = bank.document();
        let narrow = is_narrow();

        println!("Memory bank: {}", bank.directory().display());
        if let Some(metadata) = metadata(document) {
            if let Some(version) = metadata.version.as_ref().map(Field::to_text) {
                println!("{}", format!("Version {version}").paint(Tone::Muted));
            }
            if let Some(updated) = metadata.last_updated.as_ref().and_then(last_updated) {
                println!("{}", format!("Last updated {updated}").paint(Tone::Muted));
            }
        }
        println!();

        println!("Sections");
        println!("{}", "────────".paint(Tone::Muted));
        for name in TRACKED {
            let shown = match document.status_view(name) {
                StatusView::Status(status) => paint_status(status),
                _ => state(document, name).paint(Tone::Muted),
            };
            if narrow {
                println!("{name}: {shown}");
            } else {
                println!("{:<16} {shown}", name.key());
            }
        }
        println!();

        let ready = bank.ready_sections();
        if ready.is_empty() {
            println!("Ready: {}", "nothing".paint(Tone::Muted));
        } else {
            let names: Vec<_> = ready.iter().map(|name| name.key()).collect();
            println!("Ready: {}", names.join(", ").paint(Tone::Active));
        }

        let changes = document.change_history().map_or(0, Vec::len);
        println!("Changes logged: {changes}");
    }
}

fn metadata(document: &Document) -> Option<&memory_bank::domain::Metadata> {
    document.metadata.as_ref().and_then(Section::well_formed)
}

/// A last-updated stamp for display: RFC 3339 when it parsed, raw text when
/// it did not, nothing when it is not text.
fn last_updated(stamp: &Field<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    match stamp {
        Section::WellFormed(updated) => Some(updated.to_rfc3339()),
        Section::Malformed(raw) => raw.as_str().map(str::to_owned),
    }
}

/// The display state of a section.
fn state(document: &Document, name: SectionName) -> String {
    match document.status_view(name) {
        StatusView::Status(status) => status.to_string(),
        StatusView::NoStatus => "no status".to_owned(),
        StatusView::NotMapping => "malformed".to_owned(),
        StatusView::Absent => "missing".to_owned(),
    }
}
