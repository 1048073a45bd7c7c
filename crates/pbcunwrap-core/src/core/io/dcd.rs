//! CHARMM/NAMD DCD trajectory reader and writer.
//!
//! A DCD file is a sequence of Fortran unformatted records, each framed by a 4-byte
//! length marker on both sides. The header is three records (control block, titles, atom
//! count), followed by one group of records per frame: an optional unit cell record of six
//! doubles and three coordinate records of `f32` values (x, y, z). Coordinates are kept in
//! the file's units (normally Angstrom).

use super::traits::{TrajectorySink, TrajectorySource};
use crate::core::models::cell::CellDimensions;
use crate::core::models::frame::Frame;
use crate::engine::error::UnwrapError;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const HEADER_RECORD_LEN: i32 = 84;
const TITLE_LEN: usize = 80;
const UNIT_CELL_RECORD_LEN: usize = 48;
const CHARMM_VERSION: i32 = 24;
const MAX_ATOMS: usize = 100_000_000;

/// Byte offsets of patched control words, counted from the start of the file.
const NSET_OFFSET: u64 = 8;
const NSTEP_OFFSET: u64 = 20;

const ANGLE_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum DcdError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid DCD header: {0}")]
    InvalidHeader(String),
    #[error("Unsupported DCD variant: {0}")]
    Unsupported(String),
    #[error("Corrupt record in frame {frame}: expected length {expected}, found {found}")]
    RecordLength {
        frame: usize,
        expected: usize,
        found: i64,
    },
    #[error("Frame {frame} has no unit cell; periodic unwrapping needs cell dimensions")]
    MissingUnitCell { frame: usize },
    #[error("Invalid unit cell in frame {frame}: {source}")]
    InvalidCell {
        frame: usize,
        #[source]
        source: UnwrapError,
    },
    #[error("Frame {frame} has {found} atoms but the trajectory has {expected}")]
    AtomCount {
        frame: usize,
        expected: usize,
        found: usize,
    },
    #[error("Frame {frame} is out of range (trajectory has {n_frames} frames)")]
    FrameOutOfRange { frame: usize, n_frames: usize },
    #[error("Value {value} for '{field}' does not fit in a DCD header")]
    Overflow { field: &'static str, value: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn i32(self, b: [u8; 4]) -> i32 {
        match self {
            Endian::Little => i32::from_le_bytes(b),
            Endian::Big => i32::from_be_bytes(b),
        }
    }

    fn f32(self, b: [u8; 4]) -> f32 {
        match self {
            Endian::Little => f32::from_le_bytes(b),
            Endian::Big => f32::from_be_bytes(b),
        }
    }

    fn f64(self, b: [u8; 8]) -> f64 {
        match self {
            Endian::Little => f64::from_le_bytes(b),
            Endian::Big => f64::from_be_bytes(b),
        }
    }
}

/// Header information of a DCD file.
#[derive(Debug, Clone, PartialEq)]
pub struct DcdHeader {
    /// Number of complete frames available in the file.
    pub n_frames: usize,
    pub n_atoms: usize,
    /// Integration step of the first frame (ISTART).
    pub start_step: i32,
    /// Integration steps between saved frames (NSAVC).
    pub save_interval: i32,
    /// Integration timestep in AKMA units.
    pub timestep: f64,
    pub has_unit_cell: bool,
    /// CHARMM version stamp; zero for X-PLOR files.
    pub charmm_version: i32,
    pub endian: Endian,
    pub titles: Vec<String>,
    /// Byte offset of the first frame.
    pub first_frame_offset: u64,
    /// Size in bytes of one frame, record markers included.
    pub frame_size: u64,
}

/// Unit cell as stored in a frame: three edge lengths and three angles.
///
/// Angles are in degrees, or as cosines for files written by NAMD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    /// Whether all three angles describe a right angle, either as 90 degrees or as a
    /// zero cosine.
    pub fn is_rectangular(&self) -> bool {
        [self.alpha, self.beta, self.gamma]
            .iter()
            .all(|&angle| (angle - 90.0).abs() < ANGLE_TOLERANCE || angle.abs() < ANGLE_TOLERANCE)
    }
}

/// Raw contents of one DCD frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DcdFrame {
    pub positions: Vec<Point3<f64>>,
    pub unit_cell: Option<UnitCell>,
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_i32<R: Read>(reader: &mut R, endian: Endian) -> io::Result<i32> {
    Ok(endian.i32(read_array(reader)?))
}

fn detect_endianness<R: Read + Seek>(reader: &mut R) -> Result<Endian, DcdError> {
    let marker: [u8; 4] = read_array(reader)?;
    reader.seek(SeekFrom::Current(-4))?;

    if i32::from_le_bytes(marker) == HEADER_RECORD_LEN {
        Ok(Endian::Little)
    } else if i32::from_be_bytes(marker) == HEADER_RECORD_LEN {
        Ok(Endian::Big)
    } else {
        Err(DcdError::InvalidHeader(format!(
            "first record length is {} (LE) or {} (BE), expected {}",
            i32::from_le_bytes(marker),
            i32::from_be_bytes(marker),
            HEADER_RECORD_LEN
        )))
    }
}

/// Reads one record of exactly `expected` bytes, validating both length markers.
fn read_record<R: Read>(
    reader: &mut R,
    endian: Endian,
    expected: usize,
    frame: usize,
) -> Result<Vec<u8>, DcdError> {
    let check = |found: i32| -> Result<(), DcdError> {
        if found < 0 || found as usize != expected {
            return Err(DcdError::RecordLength {
                frame,
                expected,
                found: found as i64,
            });
        }
        Ok(())
    };

    check(read_i32(reader, endian)?)?;
    let mut payload = vec![0u8; expected];
    reader.read_exact(&mut payload)?;
    check(read_i32(reader, endian)?)?;
    Ok(payload)
}

fn read_header<R: Read + Seek>(reader: &mut R) -> Result<DcdHeader, DcdError> {
    let endian = detect_endianness(reader)?;

    // Control record: "CORD" followed by twenty 4-byte control words.
    let _ = read_i32(reader, endian)?;
    let magic: [u8; 4] = read_array(reader)?;
    if &magic != b"CORD" {
        return Err(DcdError::InvalidHeader(format!(
            "magic is {:?}, expected \"CORD\"",
            String::from_utf8_lossy(&magic)
        )));
    }
    let control: [u8; 80] = read_array(reader)?;
    let word = |i: usize| -> i32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&control[i * 4..i * 4 + 4]);
        endian.i32(b)
    };
    let end = read_i32(reader, endian)?;
    if end != HEADER_RECORD_LEN {
        return Err(DcdError::InvalidHeader(format!(
            "control record closes with length {end}"
        )));
    }

    let declared_frames = word(0);
    let start_step = word(1);
    let save_interval = word(2);
    let n_fixed = word(8);
    let charmm_version = word(19);

    if declared_frames < 0 {
        return Err(DcdError::InvalidHeader(format!(
            "negative frame count {declared_frames}"
        )));
    }
    if n_fixed != 0 {
        return Err(DcdError::Unsupported(format!(
            "{n_fixed} fixed atoms (fixed-atom trajectories are not supported)"
        )));
    }

    let (timestep, has_unit_cell) = if charmm_version != 0 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&control[36..40]);
        if word(11) != 0 {
            return Err(DcdError::Unsupported(
                "four-dimensional coordinates".to_string(),
            ));
        }
        (endian.f32(b) as f64, word(10) != 0)
    } else {
        // X-PLOR files store the timestep as a double across words 9 and 10.
        let mut b = [0u8; 8];
        b.copy_from_slice(&control[36..44]);
        (endian.f64(b), false)
    };

    // Title record.
    let title_len = read_i32(reader, endian)?;
    if title_len < 4 || (title_len as usize - 4) % TITLE_LEN != 0 {
        return Err(DcdError::InvalidHeader(format!(
            "title record length {title_len} is not 4 + 80 * n"
        )));
    }
    let n_titles = read_i32(reader, endian)?;
    if n_titles < 0 || 4 + n_titles as usize * TITLE_LEN != title_len as usize {
        return Err(DcdError::InvalidHeader(format!(
            "{n_titles} titles do not fill a {title_len}-byte record"
        )));
    }
    let mut titles = Vec::new();
    for _ in 0..n_titles {
        let raw: [u8; TITLE_LEN] = read_array(reader)?;
        let title = String::from_utf8_lossy(&raw)
            .trim_end_matches(['\0', ' '])
            .to_string();
        titles.push(title);
    }
    let _ = read_i32(reader, endian)?;

    // Atom count record.
    let atoms_payload = read_record(reader, endian, 4, 0)?;
    let n_atoms_raw = endian.i32([
        atoms_payload[0],
        atoms_payload[1],
        atoms_payload[2],
        atoms_payload[3],
    ]);
    if n_atoms_raw <= 0 || n_atoms_raw as usize > MAX_ATOMS {
        return Err(DcdError::InvalidHeader(format!(
            "atom count {n_atoms_raw} outside 1..={MAX_ATOMS}"
        )));
    }
    let n_atoms = n_atoms_raw as usize;

    let first_frame_offset = reader.stream_position()?;
    let coord_record = 8 + 4 * n_atoms as u64;
    let cell_record = if has_unit_cell {
        8 + UNIT_CELL_RECORD_LEN as u64
    } else {
        0
    };
    let frame_size = cell_record + 3 * coord_record;

    let stream_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(first_frame_offset))?;
    let data_len = stream_len.saturating_sub(first_frame_offset);
    let available = (data_len / frame_size) as usize;
    if data_len % frame_size != 0 {
        warn!(
            trailing_bytes = data_len % frame_size,
            "DCD file ends with an incomplete frame; it will be ignored."
        );
    }

    let declared = declared_frames as usize;
    let n_frames = if declared == 0 || declared > available {
        if declared != available {
            warn!(
                declared,
                available, "DCD header frame count disagrees with file size; using file size."
            );
        }
        available
    } else {
        declared
    };

    Ok(DcdHeader {
        n_frames,
        n_atoms,
        start_step,
        save_interval,
        timestep,
        has_unit_cell,
        charmm_version,
        endian,
        titles,
        first_frame_offset,
        frame_size,
    })
}

/// Streaming DCD reader.
pub struct DcdReader<R> {
    reader: R,
    header: DcdHeader,
    current_frame: usize,
    warned_non_rectangular: bool,
}

impl DcdReader<BufReader<File>> {
    /// Opens a DCD file and parses its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DcdError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> DcdReader<R> {
    pub fn new(mut reader: R) -> Result<Self, DcdError> {
        let header = read_header(&mut reader)?;
        debug!(
            n_frames = header.n_frames,
            n_atoms = header.n_atoms,
            has_unit_cell = header.has_unit_cell,
            endian = ?header.endian,
            "Parsed DCD header."
        );
        Ok(Self {
            reader,
            header,
            current_frame: 0,
            warned_non_rectangular: false,
        })
    }

    pub fn header(&self) -> &DcdHeader {
        &self.header
    }

    pub fn n_frames(&self) -> usize {
        self.header.n_frames
    }

    pub fn n_atoms(&self) -> usize {
        self.header.n_atoms
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Positions the reader so the next read returns `frame`.
    pub fn seek_frame(&mut self, frame: usize) -> Result<(), DcdError> {
        if frame >= self.header.n_frames {
            return Err(DcdError::FrameOutOfRange {
                frame,
                n_frames: self.header.n_frames,
            });
        }
        let offset = self.header.first_frame_offset + frame as u64 * self.header.frame_size;
        self.reader.seek(SeekFrom::Start(offset))?;
        self.current_frame = frame;
        Ok(())
    }

    /// Reads the next frame, or `None` at the end of the trajectory.
    pub fn read_frame(&mut self) -> Result<Option<DcdFrame>, DcdError> {
        if self.current_frame >= self.header.n_frames {
            return Ok(None);
        }
        let frame = self.current_frame;
        let endian = self.header.endian;
        let n_atoms = self.header.n_atoms;

        let unit_cell = if self.header.has_unit_cell {
            let raw = read_record(&mut self.reader, endian, UNIT_CELL_RECORD_LEN, frame)?;
            let v: Vec<f64> = raw
                .chunks_exact(8)
                .map(|c| {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(c);
                    endian.f64(b)
                })
                .collect();
            // Stored order is A, gamma, B, beta, alpha, C.
            Some(UnitCell {
                a: v[0],
                gamma: v[1],
                b: v[2],
                beta: v[3],
                alpha: v[4],
                c: v[5],
            })
        } else {
            None
        };

        let mut axes: [Vec<f32>; 3] = Default::default();
        for axis in axes.iter_mut() {
            let raw = read_record(&mut self.reader, endian, 4 * n_atoms, frame)?;
            *axis = raw
                .chunks_exact(4)
                .map(|c| endian.f32([c[0], c[1], c[2], c[3]]))
                .collect();
        }

        let positions = (0..n_atoms)
            .map(|i| {
                Point3::new(
                    axes[0][i] as f64,
                    axes[1][i] as f64,
                    axes[2][i] as f64,
                )
            })
            .collect();

        self.current_frame += 1;
        Ok(Some(DcdFrame {
            positions,
            unit_cell,
        }))
    }
}

impl<R: Read + Seek> TrajectorySource for DcdReader<R> {
    type Error = DcdError;

    fn n_particles(&self) -> usize {
        self.header.n_atoms
    }

    fn n_frames_hint(&self) -> Option<usize> {
        Some(self.header.n_frames)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        let index = self.current_frame;
        let Some(raw) = self.read_frame()? else {
            return Ok(None);
        };
        let unit_cell = raw
            .unit_cell
            .ok_or(DcdError::MissingUnitCell { frame: index })?;

        if !unit_cell.is_rectangular() && !self.warned_non_rectangular {
            warn!(
                frame = index,
                alpha = unit_cell.alpha,
                beta = unit_cell.beta,
                gamma = unit_cell.gamma,
                "Unit cell is not rectangular; only the edge lengths are used."
            );
            self.warned_non_rectangular = true;
        }

        let cell = CellDimensions::new(unit_cell.a, unit_cell.b, unit_cell.c)
            .map_err(|source| DcdError::InvalidCell {
                frame: index,
                source,
            })?;
        Ok(Some(Frame::new(cell, raw.positions)))
    }
}

/// Header fields a [`DcdWriter`] records in a new file.
#[derive(Debug, Clone, PartialEq)]
pub struct DcdWriteOptions {
    pub start_step: i32,
    pub save_interval: i32,
    pub timestep: f32,
    pub titles: Vec<String>,
}

impl Default for DcdWriteOptions {
    fn default() -> Self {
        Self {
            start_step: 0,
            save_interval: 1,
            timestep: 0.0,
            titles: vec!["Unwrapped trajectory".to_string()],
        }
    }
}

impl DcdWriteOptions {
    /// Carries the timing metadata of an input file over to an output file.
    pub fn from_header(header: &DcdHeader) -> Self {
        Self {
            start_step: header.start_step,
            save_interval: header.save_interval,
            timestep: header.timestep as f32,
            ..Self::default()
        }
    }

    pub fn with_titles(mut self, titles: Vec<String>) -> Self {
        self.titles = titles;
        self
    }
}

/// DCD writer producing little-endian CHARMM-style files with a unit cell per frame.
///
/// The frame count in the header is written as zero and patched by
/// [`finish`](TrajectorySink::finish).
pub struct DcdWriter<W: Write + Seek> {
    writer: W,
    n_atoms: usize,
    save_interval: i32,
    frames_written: usize,
}

impl DcdWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(
        path: P,
        n_atoms: usize,
        options: &DcdWriteOptions,
    ) -> Result<Self, DcdError> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), n_atoms, options)
    }
}

impl<W: Write + Seek> DcdWriter<W> {
    pub fn new(mut writer: W, n_atoms: usize, options: &DcdWriteOptions) -> Result<Self, DcdError> {
        let n_atoms_i32 = i32::try_from(n_atoms)
            .ok()
            .filter(|&n| n > 0 && n as usize <= MAX_ATOMS)
            .ok_or(DcdError::Overflow {
                field: "n_atoms",
                value: n_atoms,
            })?;
        let n_titles = i32::try_from(options.titles.len()).map_err(|_| DcdError::Overflow {
            field: "titles",
            value: options.titles.len(),
        })?;

        let mut control = [0i32; 20];
        control[1] = options.start_step;
        control[2] = options.save_interval;
        control[9] = i32::from_le_bytes(options.timestep.to_le_bytes());
        control[10] = 1;
        control[19] = CHARMM_VERSION;

        writer.write_all(&HEADER_RECORD_LEN.to_le_bytes())?;
        writer.write_all(b"CORD")?;
        for value in control {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.write_all(&HEADER_RECORD_LEN.to_le_bytes())?;

        let title_len = 4 + n_titles * TITLE_LEN as i32;
        writer.write_all(&title_len.to_le_bytes())?;
        writer.write_all(&n_titles.to_le_bytes())?;
        for title in &options.titles {
            let mut raw = [b' '; TITLE_LEN];
            let mut len = title.len().min(TITLE_LEN);
            while !title.is_char_boundary(len) {
                len -= 1;
            }
            raw[..len].copy_from_slice(&title.as_bytes()[..len]);
            writer.write_all(&raw)?;
        }
        writer.write_all(&title_len.to_le_bytes())?;

        writer.write_all(&4i32.to_le_bytes())?;
        writer.write_all(&n_atoms_i32.to_le_bytes())?;
        writer.write_all(&4i32.to_le_bytes())?;

        Ok(Self {
            writer,
            n_atoms,
            save_interval: options.save_interval,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Returns the underlying writer. Call [`finish`](TrajectorySink::finish) first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = payload.len() as i32;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(payload)?;
        self.writer.write_all(&len.to_le_bytes())
    }
}

impl<W: Write + Seek> TrajectorySink for DcdWriter<W> {
    type Error = DcdError;

    fn write_frame(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        if frame.n_particles() != self.n_atoms {
            return Err(DcdError::AtomCount {
                frame: self.frames_written,
                expected: self.n_atoms,
                found: frame.n_particles(),
            });
        }

        let lengths = frame.cell.lengths();
        let mut cell = Vec::with_capacity(UNIT_CELL_RECORD_LEN);
        for value in [lengths.x, 90.0, lengths.y, 90.0, 90.0, lengths.z] {
            cell.extend_from_slice(&value.to_le_bytes());
        }
        self.write_record(&cell)?;

        let mut coords = Vec::with_capacity(4 * self.n_atoms);
        for k in 0..3 {
            coords.clear();
            for p in &frame.positions {
                coords.extend_from_slice(&(p[k] as f32).to_le_bytes());
            }
            self.write_record(&coords)?;
        }

        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        let n_frames = i32::try_from(self.frames_written).map_err(|_| DcdError::Overflow {
            field: "n_frames",
            value: self.frames_written,
        })?;
        let n_steps = n_frames.saturating_mul(self.save_interval);

        self.writer.seek(SeekFrom::Start(NSET_OFFSET))?;
        self.writer.write_all(&n_frames.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(NSTEP_OFFSET))?;
        self.writer.write_all(&n_steps.to_le_bytes())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(())
    }
}
