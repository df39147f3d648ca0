//! One-pass orchestration: generate the three tables, then export.

use anyhow::Result;
use log::info;
use std::path::PathBuf;

use crate::config::GeneratorConfig;
use crate::demographics::{self, Patient};
use crate::events::{self, ClinicalEvent};
use crate::output::{save_record_batch, write_csv};
use crate::procedures::{self, ProcedureRecord};
use crate::seeded_rng::make_rng;

pub const PATIENTS_TABLE: &str = "patient_demographics";
pub const EVENTS_TABLE: &str = "clinical_events";
pub const PROCEDURES_TABLE: &str = "medical_procedures";

/// The three generated tables, tied together by patient id.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub patients: Vec<Patient>,
    pub events: Vec<ClinicalEvent>,
    pub procedures: Vec<ProcedureRecord>,
    /// The seed the tables were generated from. Re-running with this
    /// seed in the configuration reproduces the dataset exactly.
    pub seed: u64,
}

/// Generate all three tables from the configuration.
///
/// Each table draws from its own seeded stream, so the patient table
/// is the only coupling between them: events and procedures see the
/// patient ids, not the demographics draws.
pub fn make_dataset(config: &GeneratorConfig) -> Result<SyntheticDataset> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(rand::random);

    let mut rng = make_rng(seed, PATIENTS_TABLE);
    let patients = demographics::make_patients(config, &mut rng);

    let mut rng = make_rng(seed, EVENTS_TABLE);
    let events = events::make_clinical_events(config, &patients, &mut rng);

    let mut rng = make_rng(seed, PROCEDURES_TABLE);
    let procedures = procedures::make_procedures(config, &patients, &mut rng);

    Ok(SyntheticDataset {
        patients,
        events,
        procedures,
        seed,
    })
}

impl SyntheticDataset {
    /// Export every table as CSV under the configured output directory,
    /// plus Parquet mirrors when enabled. Fails if the directory does
    /// not exist.
    pub fn write(&self, config: &GeneratorConfig) -> Result<()> {
        write_csv(&self.csv_path(config, PATIENTS_TABLE), &self.patients)?;
        write_csv(&self.csv_path(config, EVENTS_TABLE), &self.events)?;
        write_csv(&self.csv_path(config, PROCEDURES_TABLE), &self.procedures)?;

        if config.parquet_mirror {
            save_record_batch(
                &self.parquet_path(config, PATIENTS_TABLE),
                &demographics::to_record_batch(&self.patients)?,
            )?;
            save_record_batch(
                &self.parquet_path(config, EVENTS_TABLE),
                &events::to_record_batch(&self.events)?,
            )?;
            save_record_batch(
                &self.parquet_path(config, PROCEDURES_TABLE),
                &procedures::to_record_batch(&self.procedures)?,
            )?;
        }

        info!(
            "wrote {} patients, {} events, {} procedures to {}",
            self.patients.len(),
            self.events.len(),
            self.procedures.len(),
            config.output_dir.display()
        );
        Ok(())
    }

    fn csv_path(&self, config: &GeneratorConfig, table: &str) -> PathBuf {
        config.output_dir.join(format!("{table}.csv"))
    }

    fn parquet_path(&self, config: &GeneratorConfig, table: &str) -> PathBuf {
        config.output_dir.join(format!("{table}.parquet"))
    }
}
