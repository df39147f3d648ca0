//! Generate a small seeded cohort, print it, and round-trip the
//! clinical events table through Parquet.

use synth_ehr::config::GeneratorConfig;
use synth_ehr::dataset::make_dataset;
use synth_ehr::events;
use synth_ehr::output::{load_record_batch, save_record_batch};

fn main() -> Result<(), anyhow::Error> {
    let mut config = GeneratorConfig::default();
    config.num_patients = 5;
    config.seed = Some(3);

    let dataset = make_dataset(&config)?;

    for patient in &dataset.patients {
        println!("{patient:?}");
    }
    for event in dataset.events.iter().take(10) {
        println!("{event:?}");
    }

    let path = std::path::Path::new("small_cohort_events.parquet");
    save_record_batch(path, &events::to_record_batch(&dataset.events)?)?;
    let batch = load_record_batch(path)?;
    println!(
        "reloaded {} clinical events with schema {}",
        batch.num_rows(),
        batch.schema()
    );

    Ok(())
}
