use anyhow::Result;
use log::info;
use std::env;
use std::path::PathBuf;

use synth_ehr::config::GeneratorConfig;
use synth_ehr::dataset::make_dataset;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args().nth(1) {
        Some(path) => GeneratorConfig::from_yaml_file(&PathBuf::from(path))?,
        None => GeneratorConfig::default(),
    };

    let dataset = make_dataset(&config)?;
    info!("generating from seed {}", dataset.seed);
    dataset.write(&config)?;

    Ok(())
}
