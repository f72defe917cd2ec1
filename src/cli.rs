use std::path::PathBuf;

mod export;
mod import;
mod init;
mod log;
mod show;
mod status;
mod terminal;
mod update;
mod workflow;

use clap::ArgAction;
use serde_json::{Map, Value};

/// Parse a `KEY=VALUE` pair.
///
/// The value keeps its JSON type when it parses as JSON (`3`, `true`,
/// `{"a":1}`); anything else is taken as a plain string.
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

fn into_map(pairs: Vec<(String, Value)>) -> Map<String, Value> {
    pairs.into_iter().collect()
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the project root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(status::Command::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show section statuses and what is ready to work on (default)
    Status(status::Command),

    /// Write a configuration file and create the memory bank
    Init(init::Command),

    /// Print the raw value of a section
    Show(show::Command),

    /// Update a section and mark it complete
    ///
    /// For `projectInfo`, `--set` fields are merged into the section. For
    /// `tasks`, `--set activeContext=...` replaces the active context and
    /// `--set progress=...` records a completed task.
    Update(update::Command),

    /// Append an entry to the change log
    Log(log::Command),

    /// Write sections out as markdown files
    Export(export::Command),

    /// Read an edited markdown file back into its section
    Import(import::Command),

    /// Report what still needs planning
    Plan(workflow::Plan),

    /// Report whether the project is ready for work
    Act(workflow::Act),

    /// Report the state of every section for review
    Review(workflow::Review),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init(command) => command.run(&root)?,
            Self::Show(command) => command.run(root)?,
            Self::Update(command) => command.run(root)?,
            Self::Log(command) => command.run(root)?,
            Self::Export(command) => command.run(root)?,
            Self::Import(command) => command.run(root)?,
            Self::Plan(command) => command.run(root)?,
            Self::Act(command) => command.run(root)?,
            Self::Review(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case("name=demo", "name", json!("demo"); "plain string")]
    #[test_case("count=3", "count", json!(3); "number")]
    #[test_case("done=true", "done", json!(true); "boolean")]
    #[test_case(r#"tags=["a","b"]"#, "tags", json!(["a", "b"]); "array")]
    #[test_case("note=a=b", "note", json!("a=b"); "value containing equals")]
    #[test_case("empty=", "empty", json!(""); "empty value")]
    fn parses_key_value(input: &str, key: &str, value: Value) {
        assert_eq!(parse_key_value(input).unwrap(), (key.to_owned(), value));
    }

    #[test_case("novalue"; "missing separator")]
    #[test_case("=value"; "empty key")]
    fn rejects_malformed_key_value(input: &str) {
        assert!(parse_key_value(input).is_err());
    }

    #[test]
    fn status_is_the_default_command() {
        let cli = Cli::try_parse_from(["memory-bank", "-r", "/tmp/project"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
    }

    #[test]
    fn update_collects_repeated_set_flags() {
        let cli = Cli::try_parse_from([
            "memory-bank",
            "update",
            "projectInfo",
            "--content",
            "brief",
            "--set",
            "name=demo",
            "--set",
            "priority=1",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Command::Update(_))));
    }

    #[test]
    fn update_rejects_content_and_file_together() {
        let result = Cli::try_parse_from([
            "memory-bank",
            "update",
            "productContext",
            "--content",
            "a",
            "--file",
            "b.md",
        ]);
        assert!(result.is_err());
    }
}
