use crate::error::{CliError, Result};
use geomkit::core::io::traits::MolecularFile;
use geomkit::core::io::xyz::{XyzFile, XyzMetadata};
use geomkit::core::io::zmat::{ZmatFile, ZmatMetadata};
use geomkit::core::models::molecule::Molecule;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Zmat,
    Xyz,
}

impl StructureFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("zmat" | "gzmat" | "zmt") => Ok(Self::Zmat),
            Some("xyz") => Ok(Self::Xyz),
            _ => Err(CliError::Argument(format!(
                "Cannot tell the format of '{}'. Expected a .zmat, .gzmat, .zmt or .xyz file.",
                path.display()
            ))),
        }
    }
}

fn parsing_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

pub fn read_structure(path: &Path) -> Result<Molecule> {
    let format = StructureFormat::from_path(path)?;
    debug!(path = %path.display(), ?format, "Reading structure");
    let molecule = match format {
        StructureFormat::Zmat => ZmatFile::read_from_path(path)
            .map_err(|e| parsing_error(path, e))?
            .0,
        StructureFormat::Xyz => XyzFile::read_from_path(path)
            .map_err(|e| parsing_error(path, e))?
            .0,
    };
    Ok(molecule)
}

/// Destination for a command's structure output: a file whose extension picks
/// the format, or stdout in the command's default format.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    path: Option<PathBuf>,
    format: StructureFormat,
}

impl OutputTarget {
    pub fn new(path: Option<&Path>, default_format: StructureFormat) -> Result<Self> {
        let format = match path {
            Some(p) => StructureFormat::from_path(p)?,
            None => default_format,
        };
        Ok(Self {
            path: path.map(Path::to_path_buf),
            format,
        })
    }

    pub fn format(&self) -> StructureFormat {
        self.format
    }

    pub fn write(&self, molecule: &Molecule, title: &str) -> Result<()> {
        match &self.path {
            Some(path) => {
                self.write_to_path(molecule, title, path)?;
                println!("✓ Wrote {} atoms to {}", molecule.len(), path.display());
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                self.write_to(molecule, title, &mut handle)
                    .map_err(|e| parsing_error(Path::new("<stdout>"), e))?;
                handle.flush()?;
            }
        }
        Ok(())
    }

    fn write_to_path(&self, molecule: &Molecule, title: &str, path: &Path) -> Result<()> {
        match self.format {
            StructureFormat::Zmat => {
                ZmatFile::write_to_path(molecule, &zmat_metadata(title), path)
                    .map_err(|e| parsing_error(path, e))
            }
            StructureFormat::Xyz => XyzFile::write_to_path(molecule, &xyz_metadata(title), path)
                .map_err(|e| parsing_error(path, e)),
        }
    }

    fn write_to(&self, molecule: &Molecule, title: &str, writer: &mut impl Write) -> anyhow::Result<()> {
        match self.format {
            StructureFormat::Zmat => ZmatFile::write_to(molecule, &zmat_metadata(title), writer)?,
            StructureFormat::Xyz => XyzFile::write_to(molecule, &xyz_metadata(title), writer)?,
        }
        Ok(())
    }
}

fn zmat_metadata(title: &str) -> ZmatMetadata {
    ZmatMetadata {
        comments: vec![title.to_string()],
    }
}

fn xyz_metadata(title: &str) -> XyzMetadata {
    XyzMetadata {
        comment: title.to_string(),
    }
}
