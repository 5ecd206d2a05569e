use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gridstitch_core::io::DiskTileSource;
use gridstitch_core::pipeline::config::StitchConfig;
use gridstitch_core::pipeline::{prepare_stitch, NoOpReporter};

#[derive(Args)]
pub struct InfoArgs {
    /// Acquisition folder
    pub input: PathBuf,

    /// Channel used for overlap registration (defaults to the first)
    #[arg(long)]
    pub channel: Option<String>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let mut config = StitchConfig::new(&args.input);
    config.registration.channel = args.channel.clone();

    let prepared = prepare_stitch(&config, &DiskTileSource, &NoOpReporter)?;
    crate::summary::print_acquisition_info(&prepared);
    Ok(())
}
