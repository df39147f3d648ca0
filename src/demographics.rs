//! The patient demographics table.
//!
//! One row per patient. Patient ids are sequential from a configurable
//! base, so the id column doubles as the join key for the clinical
//! events and medical procedures tables.

use arrow::array::{StringArray, UInt32Array, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GeneratorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

/// One row of the patient demographics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    pub patient_id: u64,
    pub age: u32,
    pub gender: Gender,
    pub ethnicity: String,
    pub insurance_provider: String,
}

/// Pick gender uniform randomly (only male or female)
fn make_gender(rng: &mut ChaCha8Rng) -> Gender {
    if rng.gen() {
        Gender::Female
    } else {
        Gender::Male
    }
}

/// Generate the demographics rows, one per patient id.
pub fn make_patients(config: &GeneratorConfig, rng: &mut ChaCha8Rng) -> Vec<Patient> {
    let demographics = &config.demographics;
    (0..config.num_patients)
        .map(|offset| Patient {
            patient_id: config.first_patient_id + offset as u64,
            age: rng.gen_range(demographics.age_low..=demographics.age_high),
            gender: make_gender(rng),
            ethnicity: demographics.ethnicities.choose(rng).clone(),
            insurance_provider: demographics
                .insurance_providers
                .choose(rng)
                .expect("insurance table was validated before generation")
                .clone(),
        })
        .collect()
}

pub fn to_record_batch(patients: &[Patient]) -> Result<RecordBatch, ArrowError> {
    let mut patient_id = Vec::new();
    let mut age = Vec::new();
    let mut gender = Vec::new();
    let mut ethnicity = Vec::new();
    let mut insurance_provider = Vec::new();

    for patient in patients {
        patient_id.push(patient.patient_id);
        age.push(patient.age);
        gender.push(patient.gender.as_str());
        ethnicity.push(patient.ethnicity.clone());
        insurance_provider.push(patient.insurance_provider.clone());
    }

    RecordBatch::try_from_iter([
        ("patient_id", Arc::new(UInt64Array::from(patient_id)) as _),
        ("age", Arc::new(UInt32Array::from(age)) as _),
        ("gender", Arc::new(StringArray::from(gender)) as _),
        ("ethnicity", Arc::new(StringArray::from(ethnicity)) as _),
        (
            "insurance_provider",
            Arc::new(StringArray::from(insurance_provider)) as _,
        ),
    ])
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::seeded_rng::make_rng;

    #[test]
    fn patient_ids_are_contiguous_from_the_base() {
        let mut config = GeneratorConfig::default();
        config.num_patients = 25;
        let mut rng = make_rng(9, "patient_demographics");

        let patients = make_patients(&config, &mut rng);
        let ids: Vec<u64> = patients.iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, (101..126).collect::<Vec<u64>>());
    }

    #[test]
    fn demographics_stay_within_their_categories() {
        let config = GeneratorConfig::default();
        let mut rng = make_rng(9, "patient_demographics");

        for patient in make_patients(&config, &mut rng) {
            assert!((18..=90).contains(&patient.age));
            assert!(config
                .demographics
                .ethnicities
                .0
                .iter()
                .any(|entry| entry.value == patient.ethnicity));
            assert!(config
                .demographics
                .insurance_providers
                .contains(&patient.insurance_provider));
        }
    }
}
