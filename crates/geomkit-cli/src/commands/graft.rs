use super::{atom_index, load_bond_lengths, load_registry, output_title};
use crate::cli::GraftArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::structure_io::{OutputTarget, StructureFormat, read_structure};
use geomkit::engine::progress::ProgressReporter;
use geomkit::workflows::substitute;
use tracing::info;

pub fn run(args: GraftArgs, config: &AppConfig, progress: &CliProgressHandler) -> Result<()> {
    let target_atom = atom_index(args.atom)?;
    let registry = load_registry(config)?;
    let table = load_bond_lengths(config)?;

    info!("Loading input structure from {:?}", &args.input);
    let molecule = read_structure(&args.input)?;
    let target = OutputTarget::new(args.output.as_deref(), StructureFormat::Zmat)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = substitute::run(
        &molecule,
        target_atom,
        &args.fragment,
        &registry,
        &table,
        &config.geometry,
        &reporter,
    )?;

    if let Some(length) = result.graft.rescaled_bond {
        info!("Bond to atom {} set to {:.4} A", args.atom, length);
    }
    eprintln!(
        "Grafted '{}' onto atom {} ({} atom(s) added)",
        args.fragment,
        args.atom,
        result.graft.appended.len()
    );
    target.write(&result.molecule, &output_title(&args.input))
}
