//! The medical procedures table.
//!
//! Unlike clinical events, not every patient appears here: procedures
//! are generated for roughly 80% of patients, 1-3 records each, inside
//! a two-day window at a per-patient anchor date.

use arrow::array::{Int64Array, StringArray, TimestampSecondArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDateTime};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GeneratorConfig;
use crate::demographics::Patient;
use crate::output::timestamp_format;
use crate::seeded_rng::sample_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complication {
    None,
    Bleeding,
    Infection,
    AnesthesiaReaction,
}

impl Complication {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complication::None => "none",
            Complication::Bleeding => "bleeding",
            Complication::Infection => "infection",
            Complication::AnesthesiaReaction => "anesthesia_reaction",
        }
    }
}

/// One row of the medical procedures table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureRecord {
    pub record_id: u64,
    pub patient_id: u64,
    pub procedure_type: String,
    #[serde(with = "timestamp_format")]
    pub procedure_timestamp: NaiveDateTime,
    pub duration_minutes: i64,
    pub complication: Complication,
}

/// Generate the procedure records across all patients.
///
/// `record_id` is a single counter across the whole run, like the
/// event id counter.
pub fn make_procedures(
    config: &GeneratorConfig,
    patients: &[Patient],
    rng: &mut ChaCha8Rng,
) -> Vec<ProcedureRecord> {
    let procedures_config = &config.procedures;
    let anchor_start = config.start_datetime();
    let anchor_end =
        config.end_datetime() - Duration::days(procedures_config.anchor_margin_days);

    let mut records = Vec::new();
    let mut record_id = 1;
    for patient in patients {
        if !rng.gen_bool(procedures_config.prevalence) {
            continue;
        }

        let anchor = sample_datetime(rng, anchor_start, anchor_end);
        let window_end = anchor + Duration::days(procedures_config.window_days);
        let num_records = rng
            .gen_range(procedures_config.min_per_patient..=procedures_config.max_per_patient);

        for _ in 0..num_records {
            let procedure = procedures_config
                .types
                .choose(rng)
                .expect("procedure table was validated before generation");

            records.push(ProcedureRecord {
                record_id,
                patient_id: patient.patient_id,
                procedure_type: procedure.name.clone(),
                procedure_timestamp: sample_datetime(rng, anchor, window_end),
                duration_minutes: rng
                    .gen_range(procedure.min_minutes..=procedure.max_minutes),
                complication: *procedures_config.complications.choose(rng),
            });
            record_id += 1;
        }
    }
    records
}

pub fn to_record_batch(records: &[ProcedureRecord]) -> Result<RecordBatch, ArrowError> {
    let mut record_id = Vec::new();
    let mut patient_id = Vec::new();
    let mut procedure_type = Vec::new();
    let mut procedure_timestamp = Vec::new();
    let mut duration_minutes = Vec::new();
    let mut complication = Vec::new();

    for record in records {
        record_id.push(record.record_id);
        patient_id.push(record.patient_id);
        procedure_type.push(record.procedure_type.clone());
        procedure_timestamp.push(record.procedure_timestamp.and_utc().timestamp());
        duration_minutes.push(record.duration_minutes);
        complication.push(record.complication.as_str());
    }

    RecordBatch::try_from_iter([
        ("record_id", Arc::new(UInt64Array::from(record_id)) as _),
        ("patient_id", Arc::new(UInt64Array::from(patient_id)) as _),
        (
            "procedure_type",
            Arc::new(StringArray::from(procedure_type)) as _,
        ),
        (
            "procedure_timestamp",
            Arc::new(TimestampSecondArray::from(procedure_timestamp)) as _,
        ),
        (
            "duration_minutes",
            Arc::new(Int64Array::from(duration_minutes)) as _,
        ),
        (
            "complication",
            Arc::new(StringArray::from(complication)) as _,
        ),
    ])
}
