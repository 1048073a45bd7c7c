use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "pbcunwrap - Remove periodic boundary jumps from molecular dynamics trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Unwrap a DCD trajectory so particle paths are continuous across cell boundaries.
    Unwrap(UnwrapArgs),
    /// Print the header of a DCD trajectory.
    Inspect(InspectArgs),
}

/// Arguments for the `unwrap` subcommand.
#[derive(Args, Debug, Clone)]
pub struct UnwrapArgs {
    /// Path to the wrapped input trajectory (DCD).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the unwrapped output trajectory (DCD).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of worker threads used to unwrap each frame.
    #[arg(short, long, value_name = "NUM", conflicts_with = "sequential")]
    pub workers: Option<usize>,

    /// Unwrap each frame on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Title line stored in the output file header. Can be used multiple times.
    #[arg(short, long = "title", value_name = "TEXT")]
    pub titles: Vec<String>,

    /// Do not copy start step, save interval and timestep from the input header.
    #[arg(long)]
    pub no_carry_timing: bool,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S execution.workers=4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Path to the trajectory (DCD).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unwrap_arguments_are_parsed() {
        let cli = Cli::try_parse_from([
            "pbcunwrap", "-vv", "unwrap", "-i", "in.dcd", "-o", "out.dcd", "-w", "4", "-t",
            "run A", "-S", "output.carry-timing=false",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Unwrap(args) = cli.command else {
            panic!("expected unwrap command");
        };
        assert_eq!(args.input, PathBuf::from("in.dcd"));
        assert_eq!(args.output, PathBuf::from("out.dcd"));
        assert_eq!(args.workers, Some(4));
        assert!(!args.sequential);
        assert_eq!(args.titles, vec!["run A"]);
        assert_eq!(args.set_values, vec!["output.carry-timing=false"]);
    }

    #[test]
    fn workers_and_sequential_conflict() {
        let result = Cli::try_parse_from([
            "pbcunwrap",
            "unwrap",
            "-i",
            "in.dcd",
            "-o",
            "out.dcd",
            "-w",
            "2",
            "--sequential",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["pbcunwrap", "-q", "-v", "inspect", "-i", "a.dcd"]);
        assert!(result.is_err());
    }
}
