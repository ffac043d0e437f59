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
    author = "Tony Kan",
    version,
    about = "geomkit CLI - Convert, build and reconcile molecular geometries given as Z-matrices or Cartesian coordinates.",
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

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S bonding.tolerance=0.4
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute Cartesian coordinates from a Z-matrix and write them as XYZ.
    Cartesian(CartesianArgs),
    /// Generate a Z-matrix from Cartesian coordinates or an existing Z-matrix.
    Zmatrix(ZmatrixArgs),
    /// List the bonds perceived from the geometry, and optionally close contacts.
    Bonds(BondsArgs),
    /// Replace an atom with a substituent fragment.
    Graft(GraftArgs),
    /// Fold an externally optimized Cartesian geometry back into a Z-matrix.
    Reconcile(ReconcileArgs),
    /// List the available substituent fragments.
    Fragments(FragmentsArgs),
}

/// Arguments for the `cartesian` subcommand.
#[derive(Args, Debug)]
pub struct CartesianArgs {
    /// Input structure (.zmat, .gzmat, .zmt or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output XYZ file. Written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep dummy atoms in the output.
    #[arg(long)]
    pub include_dummies: bool,
}

/// Arguments for the `zmatrix` subcommand.
#[derive(Args, Debug)]
pub struct ZmatrixArgs {
    /// Input structure (.zmat, .gzmat, .zmt or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output Z-matrix file. Written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Link every generated parameter to a named variable.
    #[arg(long)]
    pub create_variables: bool,

    /// Override the maximum deviation from 90 degrees accepted for reference angles.
    #[arg(long, value_name = "DEGREES")]
    pub angle_threshold: Option<f64>,
}

/// Arguments for the `bonds` subcommand.
#[derive(Args, Debug)]
pub struct BondsArgs {
    /// Input structure (.zmat, .gzmat, .zmt or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Also list non-bonded atom pairs closer than their van der Waals contact distance.
    #[arg(long)]
    pub contacts: bool,

    /// Override the covalent-radius scale factor used for bond perception.
    #[arg(long, value_name = "FLOAT")]
    pub bonding_scale: Option<f64>,

    /// Override the additive tolerance used for bond perception, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub bonding_tolerance: Option<f64>,
}

/// Arguments for the `graft` subcommand.
#[derive(Args, Debug)]
pub struct GraftArgs {
    /// Input structure (.zmat, .gzmat, .zmt or .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output file; the format follows its extension. Written to stdout as a Z-matrix when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// 1-based index of the atom to replace.
    #[arg(short, long, required = true, value_name = "INDEX")]
    pub atom: usize,

    /// Name of the fragment to graft (see `geomkit fragments`).
    #[arg(short, long, required = true, value_name = "NAME")]
    pub fragment: String,

    /// Additional fragment library in TOML format.
    #[arg(long, value_name = "PATH")]
    pub fragments: Option<PathBuf>,

    /// CSV table of bond lengths (element1,element2,length) overriding the built-in values.
    #[arg(long, value_name = "PATH")]
    pub bond_lengths: Option<PathBuf>,
}

/// Arguments for the `reconcile` subcommand.
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Z-matrix whose parameters are updated.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// XYZ file with the new geometry, in the same atom order.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub geometry: PathBuf,

    /// Output Z-matrix file. Written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Allow literal values and constant variables to take the measured values.
    #[arg(long)]
    pub allow_constant_update: bool,

    /// Keep the recomputed geometry in its own frame instead of superimposing it on the input.
    #[arg(long)]
    pub no_align: bool,
}

/// Arguments for the `fragments` subcommand.
#[derive(Args, Debug)]
pub struct FragmentsArgs {
    /// Additional fragment library in TOML format.
    #[arg(long, value_name = "PATH")]
    pub fragments: Option<PathBuf>,
}
