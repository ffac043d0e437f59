use super::output_title;
use crate::cli::CartesianArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::structure_io::{OutputTarget, StructureFormat, read_structure};
use geomkit::engine::progress::ProgressReporter;
use geomkit::workflows::convert;
use tracing::info;

pub fn run(args: CartesianArgs, config: &AppConfig, progress: &CliProgressHandler) -> Result<()> {
    info!("Loading input structure from {:?}", &args.input);
    let molecule = read_structure(&args.input)?;
    let target = OutputTarget::new(args.output.as_deref(), StructureFormat::Xyz)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let cartesian = convert::to_cartesian(
        &molecule,
        args.include_dummies,
        &config.geometry,
        &reporter,
    )?;

    info!(
        atoms = cartesian.len(),
        bonds = cartesian.bonds().len(),
        "Cartesian coordinates computed"
    );
    target.write(&cartesian, &output_title(&args.input))
}
