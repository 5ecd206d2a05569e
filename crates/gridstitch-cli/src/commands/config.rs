use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gridstitch_core::pipeline::config::StitchConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default config to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = StitchConfig::new("path/to/acquisition");
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
