//! CLI argument parsing.
//!
//! The CLI is a thin frontend: `view` resolves one run and hands the result to
//! a renderer. No resolution logic lives here.
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default network timeout in seconds for API requests.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "gh-effective-workflow",
    version,
    about = "Display effective workflow",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub(crate) struct RootArgs {
    /// Emit debug logs to stderr
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    View(ViewArgs),
}

/// View command inputs for a single run.
#[derive(Parser, Debug)]
#[command(
    about = "View the effective workflow file for a workflow run",
    after_help = "Examples:\n  # View a specific run\n  $ gh effective-workflow view 12345\n\n  # View a run of another repository, fetching the workflow from a branch\n  $ gh effective-workflow view 12345 --repo octocat/Hello-World --ref main"
)]
pub(crate) struct ViewArgs {
    /// Workflow run ID
    #[arg(value_name = "RUN_ID")]
    pub(crate) run_id: Option<String>,

    /// Repository of the run, defaults to the current git checkout
    #[arg(short = 'R', long, value_name = "[HOST/]OWNER/REPO")]
    pub(crate) repo: Option<String>,

    /// Revision to fetch the top-level workflow at (default: the run's head branch)
    #[arg(long = "ref", value_name = "REF")]
    pub(crate) git_ref: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub(crate) json: bool,

    /// Prefix workflow content with line numbers
    #[arg(long)]
    pub(crate) line_numbers: bool,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub(crate) color: ColorChoice,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub(crate) timeout: u64,

    /// Serve API responses from captured JSON files instead of the network
    #[arg(long, value_name = "DIR", env = "GH_EFFECTIVE_WORKFLOW_REPLAY", hide = true)]
    pub(crate) replay: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Whether to style output written to a terminal (or not).
    pub(crate) fn enabled(self, is_terminal: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_terminal && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}
