//! Structure input/output and trajectory export

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use nalgebra::Vector3;

use crate::atom::{Atom, Element};
use crate::configuration::AtomicConfiguration;
use crate::trajectory::{Snapshot, TrajectoryError, TrajectoryReader};

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),
}

/// Parse an XYZ file into a configuration.
///
/// Cell and periodicity are not part of plain XYZ; the result carries an
/// empty cell with no periodic axes.
pub fn read_xyz<P: AsRef<Path>>(path: P) -> Result<AtomicConfiguration, IoError> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    let (_, count_line) = lines.next().ok_or_else(|| IoError::InvalidFormat(
        "empty XYZ file".to_string(),
    ))?;
    let count_line = count_line?;
    let expected: usize = count_line.trim().parse().map_err(|_| IoError::Parse {
        line: 1,
        message: format!("Invalid atom count: {}", count_line.trim()),
    })?;

    // Comment line is ignored
    if lines.next().is_none() {
        return Err(IoError::InvalidFormat(
            "XYZ file ends before the comment line".to_string(),
        ));
    }

    let mut atoms = Vec::with_capacity(expected);
    for (index, line) in lines {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        if atoms.len() == expected {
            break;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(IoError::Parse {
                line: line_number,
                message: format!("Expected 'symbol x y z', got: {}", line),
            });
        }

        let element = Element::from_symbol(fields[0]);
        let mut coords = [0.0; 3];
        for (slot, field) in coords.iter_mut().zip(&fields[1..4]) {
            *slot = field.parse::<f64>().map_err(|_| IoError::Parse {
                line: line_number,
                message: format!("Invalid coordinate: {}", field),
            })?;
        }

        atoms.push(Atom::new(
            element,
            Vector3::new(coords[0], coords[1], coords[2]),
        ));
    }

    if atoms.len() != expected {
        return Err(IoError::InvalidFormat(format!(
            "XYZ header promises {} atoms, found {}",
            expected,
            atoms.len()
        )));
    }

    Ok(AtomicConfiguration::new(atoms))
}

/// Write a configuration to an XYZ file
pub fn write_xyz<P: AsRef<Path>>(
    configuration: &AtomicConfiguration,
    path: P,
) -> Result<(), IoError> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "{}", configuration.len())?;
    writeln!(file, "generated by rustrelax")?;
    for atom in &configuration.atoms {
        writeln!(
            file,
            "{:2} {:14.8} {:14.8} {:14.8}",
            atom.element.symbol(),
            atom.position.x,
            atom.position.y,
            atom.position.z
        )?;
    }
    file.flush()?;

    Ok(())
}

/// Write one trajectory snapshot as an XYZ frame
pub fn write_xyz_frame<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IoError> {
    writeln!(writer, "{}", snapshot.positions.len())?;
    writeln!(
        writer,
        "step={} energy={:.8} fmax={:.8}",
        snapshot.step, snapshot.energy, snapshot.fmax
    )?;
    for (element, position) in snapshot.species.iter().zip(&snapshot.positions) {
        writeln!(
            writer,
            "{:2} {:14.8} {:14.8} {:14.8}",
            element.symbol(),
            position.x,
            position.y,
            position.z
        )?;
    }
    Ok(())
}

/// Convert a stored trajectory to a multi-frame XYZ file.
///
/// Frames are streamed one at a time in append order; returns the number
/// of frames written.
pub fn export_trajectory<P: AsRef<Path>, Q: AsRef<Path>>(
    trajectory: P,
    out: Q,
) -> Result<usize, IoError> {
    let reader = TrajectoryReader::open(trajectory)?;
    let mut writer = BufWriter::new(File::create(out)?);

    let mut frames = 0;
    for snapshot in reader {
        let snapshot = snapshot?;
        write_xyz_frame(&mut writer, &snapshot)?;
        frames += 1;
    }
    writer.flush()?;

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_xyz_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("structure.xyz");

        let config = AtomicConfiguration::new(vec![
            Atom::new(Element::Copper, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::Oxygen, Vector3::new(1.25, -0.5, 3.0)),
        ]);

        write_xyz(&config, &path).unwrap();
        let back = read_xyz(&path).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back.atoms[0].element, Element::Copper);
        assert_eq!(back.atoms[1].element, Element::Oxygen);
        assert!((back.atoms[1].position - Vector3::new(1.25, -0.5, 3.0)).norm() < 1e-8);
    }

    #[test]
    fn test_read_xyz_rejects_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.xyz");
        std::fs::write(&path, "3\ncomment\nCu 0.0 0.0 0.0\n").unwrap();

        assert!(matches!(read_xyz(&path), Err(IoError::InvalidFormat(_))));
    }

    #[test]
    fn test_read_xyz_rejects_bad_coordinate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.xyz");
        std::fs::write(&path, "1\ncomment\nCu 0.0 oops 0.0\n").unwrap();

        assert!(matches!(read_xyz(&path), Err(IoError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_write_xyz_frame_format() {
        let config = AtomicConfiguration::new(vec![Atom::new(
            Element::Hydrogen,
            Vector3::new(0.0, 0.0, 1.0),
        )]);
        let snapshot = Snapshot::of(2, -0.75, 0.01, &config);

        let mut buffer = Vec::new();
        write_xyz_frame(&mut buffer, &snapshot).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("1\n"));
        assert!(text.contains("step=2"));
        assert!(text.contains("energy=-0.75000000"));
        assert!(text.lines().count() == 3);
    }
}
