use clap::Parser;
use std::path::PathBuf;

/// prompter – pick files from a project and turn them into an LLM prompt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory to browse
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}
