//! `memory-bank`: inspect and edit a project's memory bank from the shell.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
