use crate::cli::UnwrapArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use pbcunwrap::{
    core::io::dcd::{DcdReader, DcdWriteOptions, DcdWriter},
    engine::progress::ProgressReporter,
    workflows,
};
use std::path::Path;
use tracing::info;

pub fn run(args: UnwrapArgs) -> Result<()> {
    ensure_distinct_paths(&args.input, &args.output)?;

    info!("Merging configuration from file and CLI arguments...");
    let settings = PartialRunConfig::load(&args)?.merge_with_cli(&args)?;

    info!("Opening input trajectory {:?}", &args.input);
    let reader = DcdReader::open(&args.input).map_err(|e| CliError::Trajectory {
        path: args.input.clone(),
        source: e,
    })?;
    let header = reader.header();
    info!(
        frames = header.n_frames,
        atoms = header.n_atoms,
        "Input trajectory opened."
    );

    let options = if settings.carry_timing {
        DcdWriteOptions::from_header(header)
    } else {
        DcdWriteOptions::default()
    }
    .with_titles(settings.titles.clone());

    let writer = DcdWriter::create(&args.output, reader.n_atoms(), &options).map_err(|e| {
        CliError::Trajectory {
            path: args.output.clone(),
            source: e,
        }
    })?;

    let progress_handler = if args.no_progress {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Unwrapping {} ...", args.input.display());
    let (_, summary) = workflows::unwrap::run(reader, writer, &settings.unwrap, &reporter)?;

    println!(
        "✓ {} frames of {} particles written to {} ({} boundary crossings corrected)",
        summary.frames,
        summary.particles,
        args.output.display(),
        summary.crossings
    );

    Ok(())
}

/// Refuses to overwrite the input while it is still being read.
fn ensure_distinct_paths(input: &Path, output: &Path) -> Result<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(CliError::Argument(format!(
            "Output path {} is the same as the input trajectory.",
            output.display()
        )));
    }
    Ok(())
}
