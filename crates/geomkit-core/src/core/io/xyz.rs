use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::models::records::{AtomRecord, RecordError};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzMetadata {
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Header declares {expected} atoms but {found} were found")]
    CountMismatch { expected: usize, found: usize },
    #[error("Invalid XYZ geometry: {0}")]
    Records(#[from] RecordError),
}

/// Standard XYZ file: atom count, comment line, then `Sym x y z` per atom.
///
/// Only the first frame is read. Extra columns after the coordinates are ignored.
pub struct XyzFile;

impl MolecularFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let mut lines = reader.lines().enumerate();

        let expected = loop {
            match lines.next() {
                Some((index, line)) => {
                    let line = line?;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    break trimmed.parse::<usize>().map_err(|_| XyzError::Parse {
                        line: index + 1,
                        message: format!("expected an atom count, found '{}'", trimmed),
                    })?;
                }
                None => {
                    return Ok((Molecule::new(), XyzMetadata::default()));
                }
            }
        };

        let comment = match lines.next() {
            Some((_, line)) => line?.trim().to_string(),
            None => String::new(),
        };

        let mut records = Vec::with_capacity(expected);
        for (index, line) in lines {
            if records.len() == expected {
                break;
            }
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                break;
            }
            if tokens.len() < 4 {
                return Err(XyzError::Parse {
                    line: index + 1,
                    message: format!("expected 'symbol x y z', found '{}'", line.trim()),
                });
            }
            let mut position = [0.0; 3];
            for (slot, token) in position.iter_mut().zip(&tokens[1..4]) {
                *slot = token
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| XyzError::Parse {
                        line: index + 1,
                        message: format!("invalid coordinate '{}'", token),
                    })?;
            }
            records.push(AtomRecord::Cartesian {
                label: tokens[0].to_string(),
                position,
            });
        }

        if records.len() != expected {
            return Err(XyzError::CountMismatch {
                expected,
                found: records.len(),
            });
        }

        let molecule = Molecule::from_records(&records, &[])?;
        Ok((molecule, XyzMetadata { comment }))
    }

    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", molecule.len())?;
        writeln!(writer, "{}", metadata.comment)?;
        for atom in molecule.atoms() {
            let p = atom.position;
            writeln!(
                writer,
                "{:<4} {:>14.6} {:>14.6} {:>14.6}",
                atom.element.symbol(),
                p.x,
                p.y,
                p.z
            )?;
        }
        Ok(())
    }
}
