use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::{AtomCoord, AtomLabel, Param};
use crate::core::models::molecule::Molecule;
use crate::core::models::records::{AtomRecord, ParamSpec, RecordError, RefSpec, VariableRecord};
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZmatMetadata {
    /// `#` comment lines found before the first atom, without the marker.
    pub comments: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ZmatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ZmatParseErrorKind,
    },
    #[error("Invalid Z-matrix: {0}")]
    Records(#[from] RecordError),
    #[error("Cannot write atom {atom}: {reason}")]
    Unwritable { atom: AtomLabel, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ZmatParseErrorKind {
    #[error("Expected 1, 3, 4, 5 or 7 fields on an atom line, found {0}")]
    FieldCount(usize),
    #[error("Invalid coordinate '{0}'")]
    InvalidNumber(String),
    #[error("Unknown reference atom '{0}'")]
    InvalidReference(String),
    #[error("Malformed variable assignment '{0}'")]
    InvalidAssignment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Atoms,
    Variables,
    Constants,
}

/// Line-oriented Z-matrix block.
///
/// ```text
/// O
/// H  1 ROH
/// H  1 ROH  2 AHOH
///
/// Variables:
/// ROH = 0.96
/// Constants:
/// AHOH = 104.5
/// ```
///
/// Atom lines hold a label followed by nothing (first atom), `x y z`, or one to
/// three `reference parameter` pairs. References are 1-based indices or labels
/// of earlier atoms; parameters are numbers or variable names, optionally
/// negated with `-`. A blank line followed by bare assignments starts the
/// variable section.
pub struct ZmatFile;

impl MolecularFile for ZmatFile {
    type Metadata = ZmatMetadata;
    type Error = ZmatError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let mut metadata = ZmatMetadata::default();
        let mut atoms: Vec<AtomRecord> = Vec::new();
        let mut variables: Vec<VariableRecord> = Vec::new();
        let mut section = Section::Atoms;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = index + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if section == Section::Atoms && !atoms.is_empty() {
                    section = Section::Variables;
                }
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                if atoms.is_empty() {
                    metadata.comments.push(comment.trim().to_string());
                }
                continue;
            }
            match trimmed.trim_end_matches(':').to_ascii_lowercase().as_str() {
                "variables" => {
                    section = Section::Variables;
                    continue;
                }
                "constants" => {
                    section = Section::Constants;
                    continue;
                }
                _ => {}
            }

            match section {
                Section::Atoms => {
                    let record = parse_atom_line(trimmed, &atoms)
                        .map_err(|kind| ZmatError::Parse { line: line_num, kind })?;
                    atoms.push(record);
                }
                Section::Variables | Section::Constants => {
                    let (name, value) = parse_assignment(trimmed)
                        .map_err(|kind| ZmatError::Parse { line: line_num, kind })?;
                    variables.push(VariableRecord::new(
                        &name,
                        value,
                        section == Section::Constants,
                    ));
                }
            }
        }

        let molecule = Molecule::from_records(&atoms, &variables)?;
        Ok((molecule, metadata))
    }

    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for comment in &metadata.comments {
            writeln!(writer, "# {}", comment)?;
        }

        for (index, atom) in molecule.atoms().iter().enumerate() {
            let mut line = atom.name.clone();
            match &atom.coord {
                AtomCoord::Cartesian => {
                    let p = atom.position;
                    let _ = write!(line, "  {:.6}  {:.6}  {:.6}", p.x, p.y, p.z);
                }
                AtomCoord::Internal(ic) => {
                    for (_, link) in ic.links() {
                        let target =
                            link.target
                                .concrete()
                                .ok_or_else(|| ZmatError::Unwritable {
                                    atom: molecule.label(index),
                                    reason: format!("unresolved {}", link.target),
                                })?;
                        let param = format_param(molecule, index, &link.param)?;
                        let _ = write!(line, "  {} {}", target + 1, param);
                    }
                }
            }
            writeln!(writer, "{}", line)?;
        }

        let (constants, free): (Vec<_>, Vec<_>) = molecule
            .variables()
            .iter()
            .map(|(_, v)| v)
            .partition(|v| v.is_constant);
        if !free.is_empty() || !constants.is_empty() {
            writeln!(writer)?;
        }
        if !free.is_empty() {
            writeln!(writer, "Variables:")?;
            for variable in free {
                writeln!(writer, "{} = {:.6}", variable.name, variable.value)?;
            }
        }
        if !constants.is_empty() {
            writeln!(writer, "Constants:")?;
            for variable in constants {
                writeln!(writer, "{} = {:.6}", variable.name, variable.value)?;
            }
        }
        Ok(())
    }
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_atom_line(line: &str, previous: &[AtomRecord]) -> Result<AtomRecord, ZmatParseErrorKind> {
    let tokens = tokenize(line);
    let Some(first) = tokens.first() else {
        return Err(ZmatParseErrorKind::FieldCount(0));
    };
    let label = first.to_string();
    match tokens.len() {
        1 => Ok(AtomRecord::Internal {
            label,
            bond: None,
            angle: None,
            dihedral: None,
        }),
        4 => {
            let mut position = [0.0; 3];
            for (slot, token) in position.iter_mut().zip(&tokens[1..]) {
                *slot = token
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ZmatParseErrorKind::InvalidNumber(token.to_string()))?;
            }
            Ok(AtomRecord::Cartesian { label, position })
        }
        3 | 5 | 7 => {
            let mut specs = tokens[1..].chunks(2).map(|pair| {
                parse_ref(pair[0], previous).map(|atom| RefSpec::new(atom, parse_param(pair[1])))
            });
            let bond = specs.next().transpose()?;
            let angle = specs.next().transpose()?;
            let dihedral = specs.next().transpose()?;
            Ok(AtomRecord::Internal {
                label,
                bond,
                angle,
                dihedral,
            })
        }
        n => Err(ZmatParseErrorKind::FieldCount(n)),
    }
}

fn parse_ref(token: &str, previous: &[AtomRecord]) -> Result<usize, ZmatParseErrorKind> {
    if let Ok(index) = token.parse::<usize>() {
        return Ok(index);
    }
    previous
        .iter()
        .position(|record| record.label().eq_ignore_ascii_case(token))
        .map(|i| i + 1)
        .ok_or_else(|| ZmatParseErrorKind::InvalidReference(token.to_string()))
}

fn parse_param(token: &str) -> ParamSpec {
    match token.parse() {
        Ok(spec) => spec,
        Err(never) => match never {},
    }
}

fn parse_assignment(line: &str) -> Result<(String, f64), ZmatParseErrorKind> {
    let normalized = line.replace('=', " ");
    let tokens = tokenize(&normalized);
    match tokens.as_slice() {
        [name, value] => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| (name.to_string(), v))
            .ok_or_else(|| ZmatParseErrorKind::InvalidAssignment(line.to_string())),
        _ => Err(ZmatParseErrorKind::InvalidAssignment(line.to_string())),
    }
}

fn format_param(molecule: &Molecule, index: usize, param: &Param) -> Result<String, ZmatError> {
    match *param {
        Param::Literal(value) => Ok(format!("{:.6}", value)),
        Param::Linked { id, negated } => {
            let variable = molecule
                .variables()
                .get(id)
                .ok_or_else(|| ZmatError::Unwritable {
                    atom: molecule.label(index),
                    reason: "parameter linked to a missing variable".to_string(),
                })?;
            Ok(if negated {
                format!("-{}", variable.name)
            } else {
                variable.name.clone()
            })
        }
    }
}
