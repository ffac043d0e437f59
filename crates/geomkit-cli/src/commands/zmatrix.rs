use super::output_title;
use crate::cli::ZmatrixArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::structure_io::{OutputTarget, StructureFormat, read_structure};
use geomkit::engine::progress::ProgressReporter;
use geomkit::workflows::convert;
use tracing::{debug, info};

pub fn run(args: ZmatrixArgs, config: &AppConfig, progress: &CliProgressHandler) -> Result<()> {
    info!("Loading input structure from {:?}", &args.input);
    let molecule = read_structure(&args.input)?;
    let target = OutputTarget::new(args.output.as_deref(), StructureFormat::Zmat)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let outcome = convert::to_zmatrix(&molecule, &config.geometry, &reporter)?;

    let moved = outcome
        .order
        .iter()
        .enumerate()
        .filter(|&(new, &old)| new != old)
        .count();
    if moved > 0 {
        info!("{} atom(s) were re-sequenced so every reference precedes its user", moved);
        debug!(order = ?outcome.order, "New atom order (input indices)");
    }
    target.write(&outcome.molecule, &output_title(&args.input))
}
