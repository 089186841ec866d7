mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use promptline::styling::{eprintln, ERROR};

#[derive(Parser)]
#[command(name = "promptline")]
#[command(about = "Prompt rendering pipeline for interactive shells", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Which {
    Ps1,
    Ps2,
    Rprompt,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a prompt for the current directory and shell state
    Render {
        /// Which prompt to render
        #[arg(long, value_enum, default_value_t = Which::Ps1)]
        which: Which,
        /// Theme to activate instead of the configured one
        #[arg(long)]
        theme: Option<String>,
        /// Exit status to render as $? (default 0)
        #[arg(long, default_value_t = 0)]
        exit_status: i32,
        /// Background job count to render
        #[arg(long, default_value_t = 0)]
        jobs: usize,
    },
    /// Expand a format string through the two-pass pipeline
    Expand {
        /// Format string mixing ${segment}, bash \X, and zsh %X escapes
        format: String,
    },
    /// List registered themes
    Themes,
    /// Collect and print git status for a directory
    GitStatus {
        /// Directory to inspect (default: current directory)
        dir: Option<PathBuf>,
        /// Per-command timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            which,
            theme,
            exit_status,
            jobs,
        } => commands::render::run(which.into(), theme.as_deref(), exit_status, jobs),
        Commands::Expand { format } => commands::expand::run(&format),
        Commands::Themes => commands::themes::run(),
        Commands::GitStatus { dir, timeout_ms } => commands::git_status::run(dir, timeout_ms),
    };

    if let Err(e) = result {
        eprintln!("{ERROR}error:{ERROR:#} {e:#}");
        std::process::exit(1);
    }
}

impl From<Which> for promptline::PromptVar {
    fn from(which: Which) -> Self {
        match which {
            Which::Ps1 => promptline::PromptVar::Ps1,
            Which::Ps2 => promptline::PromptVar::Ps2,
            Which::Rprompt => promptline::PromptVar::Rprompt,
        }
    }
}
