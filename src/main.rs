mod cli;
mod clipboard;
mod config;
mod error;
mod file_scanner;
mod gitignore;
mod logging;
mod persona;
mod prompt_builder;
mod tree_builder;
mod tui;
mod utils;
mod workflow;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // A clipboard helper process exits right after serving its text.
    if clipboard::run_helper_if_requested()? {
        return Ok(());
    }

    let cli_args = cli::Cli::parse();
    workflow::run_prompter(cli_args)
}
