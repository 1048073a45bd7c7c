use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use pbcunwrap::core::io::dcd::{DcdHeader, DcdReader, UnitCell};
use std::fmt::Write;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let wrap_err = |e| CliError::Trajectory {
        path: args.input.clone(),
        source: e,
    };

    info!("Reading header of {:?}", &args.input);
    let mut reader = DcdReader::open(&args.input).map_err(wrap_err)?;
    let first_cell = match reader.read_frame().map_err(wrap_err)? {
        Some(frame) => frame.unit_cell,
        None => None,
    };

    print!("{}", render(reader.header(), first_cell.as_ref()));
    Ok(())
}

fn render(header: &DcdHeader, first_cell: Option<&UnitCell>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Frames:          {}", header.n_frames);
    let _ = writeln!(out, "Atoms:           {}", header.n_atoms);
    let _ = writeln!(out, "Start step:      {}", header.start_step);
    let _ = writeln!(out, "Save interval:   {}", header.save_interval);
    let _ = writeln!(out, "Timestep:        {}", header.timestep);
    let _ = writeln!(out, "Byte order:      {:?}", header.endian);
    let _ = writeln!(out, "CHARMM version:  {}", header.charmm_version);
    let _ = writeln!(
        out,
        "Unit cell:       {}",
        if header.has_unit_cell { "yes" } else { "no" }
    );
    if let Some(cell) = first_cell {
        let _ = writeln!(
            out,
            "First cell:      a={:.4} b={:.4} c={:.4} alpha={:.2} beta={:.2} gamma={:.2}{}",
            cell.a,
            cell.b,
            cell.c,
            cell.alpha,
            cell.beta,
            cell.gamma,
            if cell.is_rectangular() {
                ""
            } else {
                " (not rectangular)"
            }
        );
    }
    for title in &header.titles {
        let _ = writeln!(out, "Title:           {}", title);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbcunwrap::core::io::dcd::{DcdWriteOptions, DcdWriter};
    use pbcunwrap::core::io::traits::TrajectorySink;
    use pbcunwrap::core::models::cell::CellDimensions;
    use pbcunwrap::core::models::frame::Frame;
    use tempfile::tempdir;

    #[test]
    fn renders_header_and_first_cell() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.dcd");
        let options = DcdWriteOptions {
            start_step: 5,
            save_interval: 2,
            timestep: 1.0,
            titles: vec!["hello".to_string()],
        };
        let mut writer = DcdWriter::create(&path, 1, &options).unwrap();
        let cell = CellDimensions::new(10.0, 20.0, 30.0).unwrap();
        writer
            .write_frame(&Frame::new(cell, vec![[1.0, 2.0, 3.0].into()]))
            .unwrap();
        writer.finish().unwrap();

        let mut reader = DcdReader::open(&path).unwrap();
        let first = reader.read_frame().unwrap().and_then(|f| f.unit_cell);
        let text = render(reader.header(), first.as_ref());

        assert!(text.contains("Frames:          1"));
        assert!(text.contains("Atoms:           1"));
        assert!(text.contains("Start step:      5"));
        assert!(text.contains("Save interval:   2"));
        assert!(text.contains("Unit cell:       yes"));
        assert!(text.contains("a=10.0000 b=20.0000 c=30.0000"));
        assert!(!text.contains("not rectangular"));
        assert!(text.contains("Title:           hello"));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.dcd");

        let err = run(InspectArgs { input: path.clone() }).unwrap_err();

        assert!(matches!(err, CliError::Trajectory { path: p, .. } if p == path));
    }
}
