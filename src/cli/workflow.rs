use std::path::PathBuf;

use clap::Parser;
use memory_bank::{MemoryBank, SectionName};
use serde::Serialize;
use tracing::instrument;

use super::terminal::{Paint, Tone};

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

fn print_json<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn join(names: &[SectionName]) -> String {
    names
        .iter()
        .map(|name| name.key())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Parser)]
#[command(about = "Report which planning sections are incomplete")]
pub struct Plan {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

impl Plan {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let report = MemoryBank::open(root)?.plan();

        match self.output {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Pretty => {
                println!("Plan mode");
                if report.all_complete {
                    println!("Planning: {} ✅", "complete".paint(Tone::Done));
                } else {
                    println!(
                        "Incomplete: {}",
                        join(&report.incomplete_sections).paint(Tone::Attention)
                    );
                }
                if report.ready_sections.is_empty() {
                    println!("Ready: {}", "nothing".paint(Tone::Muted));
                } else {
                    println!("Ready: {}", join(&report.ready_sections).paint(Tone::Active));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Report whether the project is ready for work")]
pub struct Act {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

impl Act {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let report = MemoryBank::open(root)?.act();

        match self.output {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Pretty => {
                println!("Act mode");
                if report.all_ready {
                    println!("Context: {} ✅", "ready".paint(Tone::Done));
                } else {
                    println!("Context: {} ⚠️", "incomplete".paint(Tone::Attention));
                    println!("{}", "Run 'memory-bank plan' to see what is missing.".paint(Tone::Muted));
                }
                println!();

                if report.active_context.is_empty() {
                    println!("Active context: {}", "none".paint(Tone::Muted));
                } else {
                    println!("Active context:\n{}", report.active_context);
                }

                if !report.progress.is_empty() {
                    println!();
                    println!("Progress");
                    for entry in &report.progress {
                        println!("  - {entry}");
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Report the state of every section for review")]
pub struct Review {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

impl Review {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let report = MemoryBank::open(root)?.review();

        match self.output {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Pretty => {
                println!("Review all sections");
                for name in &report.sections {
                    let state = report
                        .current_state
                        .get(name)
                        .map_or("Unknown", String::as_str);
                    println!("  {:<16} {state}", name.key());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use test_case::test_case;

    use super::*;

    #[test_case(OutputFormat::Pretty; "pretty")]
    #[test_case(OutputFormat::Json; "json")]
    fn reports_run_on_a_fresh_root(output: OutputFormat) {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Plan { output }.run(root.clone()).unwrap();
        Act { output }.run(root.clone()).unwrap();
        Review { output }.run(root).unwrap();
    }

    #[test]
    fn join_uses_document_keys() {
        assert_eq!(
            join(&[SectionName::ProjectInfo, SectionName::Technologies]),
            "projectInfo, technologies"
        );
    }
}
