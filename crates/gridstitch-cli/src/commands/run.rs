use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use gridstitch_core::canvas::MemoryStrategy;
use gridstitch_core::io::ExportFormat;
use gridstitch_core::pipeline::config::StitchConfig;
use gridstitch_core::pipeline::run_stitch_reported;

use crate::progress::BarReporter;

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    OmeTiff,
    Raw,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::OmeTiff => ExportFormat::OmeTiff,
            FormatArg::Raw => ExportFormat::Raw,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MemoryArg {
    Auto,
    InMemory,
    MemoryMapped,
}

impl From<MemoryArg> for MemoryStrategy {
    fn from(arg: MemoryArg) -> Self {
        match arg {
            MemoryArg::Auto => MemoryStrategy::Auto,
            MemoryArg::InMemory => MemoryStrategy::InMemory,
            MemoryArg::MemoryMapped => MemoryStrategy::MemoryMapped,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Acquisition folder (contains `0/`, parameters JSON and configurations XML)
    pub input: PathBuf,

    /// Stitch config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fit and apply a per-channel flatfield
    #[arg(long)]
    pub flatfield: bool,

    /// Seed for flatfield tile sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Canvas storage
    #[arg(long, value_enum)]
    pub memory: Option<MemoryArg>,

    /// Channel used for overlap registration (defaults to the first)
    #[arg(long)]
    pub channel: Option<String>,

    /// Z-level used for overlap registration
    #[arg(long)]
    pub z_level: Option<usize>,

    /// Output file name inside `<input>/stitched/`
    #[arg(short, long)]
    pub output: Option<String>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    crate::summary::print_run_summary(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let report = run_stitch_reported(&config, reporter.clone())?;
    reporter.finish();

    crate::summary::print_report(&report);
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<StitchConfig> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let mut config: StitchConfig = toml::from_str(&contents).context("Invalid stitch config")?;
        config.input = args.input.clone();
        config
    } else {
        StitchConfig::new(&args.input)
    };

    if args.flatfield {
        config.flatfield.enabled = true;
    }
    if args.seed.is_some() {
        config.flatfield.seed = args.seed;
    }
    if let Some(format) = args.format {
        config.format = format.into();
    }
    if let Some(memory) = args.memory {
        config.memory = memory.into();
    }
    if args.channel.is_some() {
        config.registration.channel = args.channel.clone();
    }
    if let Some(z_level) = args.z_level {
        config.registration.z_level = z_level;
    }
    if args.output.is_some() {
        config.output_name = args.output.clone();
    }
    Ok(config)
}
