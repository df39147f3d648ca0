//! Run configuration for the generator.
//!
//! The default configuration reproduces the fixed tables the generator
//! shipped with: 200 patients with ids from 101, events and procedures
//! between 2024-01-01 and 2025-09-15, and the category tables below. A
//! YAML file with the same structure can override any subset of the
//! fields; everything missing falls back to the default.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::events::EventType;
use crate::procedures::Complication;
use crate::seeded_rng::WeightedTable;

/// A named measurement with a continuous sampling range and a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRange {
    pub name: String,
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

/// One vital-sign sub-category.
///
/// Blood pressure is the odd one out: it is reported as a composite
/// "systolic/diastolic" reading with separate bounds for the two
/// components, while every other vital is a scalar range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalRange {
    Scalar(MeasurementRange),
    BloodPressure {
        name: String,
        systolic_low: i64,
        systolic_high: i64,
        diastolic_low: i64,
        diastolic_high: i64,
        unit: String,
    },
}

/// Dose bounds for one medication. Doses are drawn from an evenly
/// spaced grid across the range rather than a continuous draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRange {
    pub name: String,
    pub low: i64,
    pub high: i64,
    pub unit: String,
}

/// A procedure type with its plausible duration range in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureType {
    pub name: String,
    pub min_minutes: i64,
    pub max_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicsConfig {
    pub age_low: u32,
    pub age_high: u32,
    pub ethnicities: WeightedTable<String>,
    pub insurance_providers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub min_per_patient: u32,
    pub max_per_patient: u32,
    /// Anchor dates are drawn from `[start_date, end_date - anchor_margin_days]`.
    pub anchor_margin_days: i64,
    /// Each patient's events fall within `[anchor, anchor + window_days]`.
    pub window_days: i64,
    pub event_types: WeightedTable<EventType>,
    pub vitals: Vec<VitalRange>,
    pub labs: Vec<MeasurementRange>,
    pub medications: Vec<DoseRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduresConfig {
    /// Probability that a patient has any procedure records at all.
    pub prevalence: f64,
    pub min_per_patient: u32,
    pub max_per_patient: u32,
    pub anchor_margin_days: i64,
    pub window_days: i64,
    pub types: Vec<ProcedureType>,
    pub complications: WeightedTable<Complication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub num_patients: usize,
    pub first_patient_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Global seed for all random draws. `None` picks a fresh seed from
    /// OS entropy, so successive runs produce different data.
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    /// Also save each table as Parquet next to the CSV files.
    pub parquet_mirror: bool,
    pub demographics: DemographicsConfig,
    pub events: EventsConfig,
    pub procedures: ProceduresConfig,
}

impl Default for DemographicsConfig {
    fn default() -> Self {
        Self {
            age_low: 18,
            age_high: 90,
            ethnicities: WeightedTable::new(vec![
                (String::from("Caucasian"), 0.6),
                (String::from("African American"), 0.15),
                (String::from("Hispanic"), 0.15),
                (String::from("Asian"), 0.05),
                (String::from("Other"), 0.05),
            ]),
            insurance_providers: vec![
                String::from("Blue Cross"),
                String::from("Aetna"),
                String::from("Cigna"),
                String::from("UnitedHealthcare"),
                String::from("Humana"),
                String::from("Other"),
            ],
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            min_per_patient: 5,
            max_per_patient: 15,
            anchor_margin_days: 30,
            window_days: 7,
            event_types: WeightedTable::new(vec![
                (EventType::Vitals, 0.5),
                (EventType::Lab, 0.3),
                (EventType::Medication, 0.2),
            ]),
            vitals: vec![
                VitalRange::Scalar(MeasurementRange {
                    name: String::from("heart_rate"),
                    low: 60.0,
                    high: 100.0,
                    unit: String::from("bpm"),
                }),
                VitalRange::BloodPressure {
                    name: String::from("blood_pressure"),
                    systolic_low: 110,
                    systolic_high: 140,
                    diastolic_low: 70,
                    diastolic_high: 90,
                    unit: String::from("mmHg"),
                },
                VitalRange::Scalar(MeasurementRange {
                    name: String::from("temperature"),
                    low: 97.0,
                    high: 99.5,
                    unit: String::from("F"),
                }),
            ],
            labs: vec![
                MeasurementRange {
                    name: String::from("glucose"),
                    low: 70.0,
                    high: 150.0,
                    unit: String::from("mg/dL"),
                },
                MeasurementRange {
                    name: String::from("cholesterol"),
                    low: 150.0,
                    high: 250.0,
                    unit: String::from("mg/dL"),
                },
                MeasurementRange {
                    name: String::from("hemoglobin"),
                    low: 12.0,
                    high: 17.5,
                    unit: String::from("g/dL"),
                },
            ],
            medications: vec![
                DoseRange {
                    name: String::from("aspirin"),
                    low: 81,
                    high: 325,
                    unit: String::from("mg"),
                },
                DoseRange {
                    name: String::from("lisinopril"),
                    low: 5,
                    high: 40,
                    unit: String::from("mg"),
                },
                DoseRange {
                    name: String::from("metformin"),
                    low: 500,
                    high: 1000,
                    unit: String::from("mg"),
                },
            ],
        }
    }
}

impl Default for ProceduresConfig {
    fn default() -> Self {
        let types = [
            ("appendectomy", 60, 120),
            ("angiography", 45, 90),
            ("cholecystectomy", 90, 150),
            ("colonoscopy", 30, 60),
            ("arthroscopy", 60, 100),
            ("biopsy", 20, 40),
            ("cataract surgery", 15, 30),
            ("endoscopy", 30, 50),
            ("hernia repair", 80, 130),
            ("tonsillectomy", 40, 60),
        ]
        .into_iter()
        .map(|(name, min_minutes, max_minutes)| ProcedureType {
            name: String::from(name),
            min_minutes,
            max_minutes,
        })
        .collect();

        Self {
            prevalence: 0.8,
            min_per_patient: 1,
            max_per_patient: 3,
            anchor_margin_days: 30,
            window_days: 2,
            types,
            complications: WeightedTable::new(vec![
                (Complication::None, 0.9),
                (Complication::Bleeding, 0.04),
                (Complication::Infection, 0.04),
                (Complication::AnesthesiaReaction, 0.02),
            ]),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_patients: 200,
            first_patient_id: 101,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 15).expect("valid date"),
            seed: None,
            output_dir: PathBuf::from("data/raw"),
            parquet_mirror: false,
            demographics: DemographicsConfig::default(),
            events: EventsConfig::default(),
            procedures: ProceduresConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let config = serde_yaml::from_reader(file)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start_date.and_hms_opt(0, 0, 0).expect("midnight is valid")
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        self.end_date.and_hms_opt(0, 0, 0).expect("midnight is valid")
    }

    /// Check the configuration before any generation starts.
    ///
    /// A degenerate range or a weight table that does not sum to 1
    /// would otherwise surface as a panic deep inside a sampling loop;
    /// checking here turns it into a diagnosable error up front.
    pub fn validate(&self) -> Result<()> {
        if self.end_date <= self.start_date {
            bail!("end_date must be after start_date");
        }

        self.demographics.validate()?;
        self.events
            .validate((self.end_date - self.start_date).num_days())?;
        self.procedures
            .validate((self.end_date - self.start_date).num_days())?;
        Ok(())
    }
}

impl DemographicsConfig {
    fn validate(&self) -> Result<()> {
        if self.age_low > self.age_high {
            bail!("age_low must not exceed age_high");
        }
        self.ethnicities.validate("ethnicities")?;
        if self.insurance_providers.is_empty() {
            bail!("insurance_providers must not be empty");
        }
        Ok(())
    }
}

impl EventsConfig {
    fn validate(&self, span_days: i64) -> Result<()> {
        if self.min_per_patient > self.max_per_patient {
            bail!("events.min_per_patient must not exceed max_per_patient");
        }
        if self.window_days < 0 || self.anchor_margin_days < self.window_days {
            bail!("events.anchor_margin_days must be at least window_days");
        }
        if span_days < self.anchor_margin_days {
            bail!("date span is shorter than events.anchor_margin_days");
        }
        self.event_types.validate("event_types")?;
        if self.vitals.is_empty() || self.labs.is_empty() || self.medications.is_empty() {
            bail!("each event category needs at least one sub-category");
        }
        for vital in &self.vitals {
            match vital {
                VitalRange::Scalar(range) => validate_measurement(range)?,
                VitalRange::BloodPressure {
                    name,
                    systolic_low,
                    systolic_high,
                    diastolic_low,
                    diastolic_high,
                    ..
                } => {
                    if systolic_low >= systolic_high || diastolic_low >= diastolic_high {
                        bail!("degenerate blood pressure range for '{name}'");
                    }
                }
            }
        }
        for lab in &self.labs {
            validate_measurement(lab)?;
        }
        for medication in &self.medications {
            if medication.low >= medication.high {
                bail!("degenerate dose range for '{}'", medication.name);
            }
        }
        Ok(())
    }
}

impl ProceduresConfig {
    fn validate(&self, span_days: i64) -> Result<()> {
        if !(0.0..=1.0).contains(&self.prevalence) {
            bail!("procedures.prevalence must lie in [0, 1]");
        }
        if self.min_per_patient > self.max_per_patient {
            bail!("procedures.min_per_patient must not exceed max_per_patient");
        }
        if self.window_days < 0 || self.anchor_margin_days < self.window_days {
            bail!("procedures.anchor_margin_days must be at least window_days");
        }
        if span_days < self.anchor_margin_days {
            bail!("date span is shorter than procedures.anchor_margin_days");
        }
        if self.types.is_empty() {
            bail!("procedures.types must not be empty");
        }
        for procedure in &self.types {
            if procedure.min_minutes > procedure.max_minutes {
                bail!("degenerate duration range for '{}'", procedure.name);
            }
        }
        self.complications.validate("complications")?;
        Ok(())
    }
}

fn validate_measurement(range: &MeasurementRange) -> Result<()> {
    if range.low >= range.high {
        bail!("degenerate measurement range for '{}'", range.name);
    }
    Ok(())
}
