mod commands;
mod diagnostics;
mod info;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use filever::Config;
use filever::config::{MatchMode, Placement};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "filever", version, about = "Content-addressed file versioning for static assets")]
struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log every per-file decision to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a path into its directory, name, extension, and token parts
    Decompose {
        /// Path or URL to decompose.
        path: String,
        /// Config selection and overrides.
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// List source files whose names carry a placeholder token
    Discover {
        /// Config selection and overrides.
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Naming conventions, configuration keys, and exit codes
    Info {
        /// Output as JSON instead of markdown.
        #[arg(long)]
        json: bool,
    },
    /// Version source files, then rewrite references in the distribution tree
    Run {
        /// Config selection and overrides.
        #[command(flatten)]
        config: ConfigArgs,
        /// Report options.
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Version source files without rewriting references
    Version {
        /// Config selection and overrides.
        #[command(flatten)]
        config: ConfigArgs,
        /// Report options.
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Where the config comes from and which values the command line overrides.
#[derive(Args)]
struct ConfigArgs {
    /// Config file (default: `.filever.toml` in the current directory, if present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Token delimiter.
    #[arg(long)]
    delimiter: Option<String>,
    /// Distribution root.
    #[arg(long)]
    dist: Option<PathBuf>,
    /// Match any versioned-looking reference, not only tracked files.
    #[arg(long)]
    generic: bool,
    /// Place the token before the extension (`app?fv=TOKEN.js`).
    #[arg(long)]
    mid: bool,
    /// Token length in characters.
    #[arg(long)]
    size: Option<usize>,
    /// Source root.
    #[arg(long)]
    src: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the config file, then apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns config loading errors.
    fn resolve(&self) -> Result<Config, filever::Error> {
        let mut config = match &self.config {
            Some(path) => Config::load_file(path)?,
            None => Config::load(Path::new("."))?,
        };

        if let Some(delimiter) = &self.delimiter {
            config.delimiter.clone_from(delimiter);
        }
        if let Some(dist) = &self.dist {
            config.dist.clone_from(dist);
        }
        if self.generic {
            config.match_mode = MatchMode::Generic;
        }
        if self.mid {
            config.placement = Placement::Mid;
        }
        if let Some(size) = self.size {
            config.version_size = size;
        }
        if let Some(src) = &self.src {
            config.src.clone_from(src);
        }

        return Ok(config);
    }
}

/// How the run report is emitted.
#[derive(Args)]
struct OutputArgs {
    /// Print the run report as JSON instead of a summary.
    #[arg(long)]
    json: bool,
    /// Also write the run report as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    // Fails only if a logger is already installed.
    let _ = TermLogger::init(level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto);

    let result = match cli.command {
        Commands::Decompose { path, config } => {
            config.resolve().and_then(|c| return commands::decompose(&c, &path))
        },
        Commands::Discover { config } => config.resolve().and_then(|c| return commands::discover(&c)),
        Commands::Info { json } => {
            info::run(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Run { config, output } => config
            .resolve()
            .and_then(|c| return commands::run(&c, output.json, output.report.as_deref())),
        Commands::Version { config, output } => config
            .resolve()
            .and_then(|c| return commands::version(&c, output.json, output.report.as_deref())),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}
