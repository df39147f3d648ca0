//! The clinical events table (long format).
//!
//! Each patient owns a handful of observations clustered inside a
//! one-week window anchored at a per-patient start date. The rows are
//! heterogeneous: vitals, lab results and medication administrations
//! share the same columns, with the sub-category recorded in
//! `event_name` and the unit conditioned on it.

use arrow::array::{StringArray, TimestampSecondArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDateTime};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::config::{DoseRange, GeneratorConfig, MeasurementRange, VitalRange};
use crate::demographics::Patient;
use crate::output::timestamp_format;
use crate::seeded_rng::sample_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Vitals,
    Lab,
    Medication,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Vitals => "vitals",
            EventType::Lab => "lab",
            EventType::Medication => "medication",
        }
    }
}

/// The value of one observation.
///
/// Stored as a typed enum rather than a string so the tests can reason
/// about ranges, but serialized to a single scalar cell: scalars and
/// doses as numbers, blood pressure as a "systolic/diastolic" string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventValue {
    /// Continuous reading rounded to one decimal place.
    Scalar(f64),
    /// Whole-number medication dose.
    Dose(i64),
    /// Composite blood pressure reading.
    Pressure { systolic: i64, diastolic: i64 },
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Scalar(value) => write!(f, "{value}"),
            EventValue::Dose(dose) => write!(f, "{dose}"),
            EventValue::Pressure {
                systolic,
                diastolic,
            } => write!(f, "{systolic}/{diastolic}"),
        }
    }
}

impl Serialize for EventValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EventValue::Scalar(value) => serializer.serialize_f64(*value),
            EventValue::Dose(dose) => serializer.serialize_i64(*dose),
            EventValue::Pressure { .. } => serializer.collect_str(self),
        }
    }
}

/// One row of the clinical events table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalEvent {
    pub event_id: u64,
    pub patient_id: u64,
    pub event_type: EventType,
    pub event_name: String,
    #[serde(with = "timestamp_format")]
    pub event_timestamp: NaiveDateTime,
    pub event_value: EventValue,
    pub event_unit: String,
}

/// Generate the clinical events for every patient.
///
/// `event_id` is a single counter across the whole run; it is never
/// reset between patients.
pub fn make_clinical_events(
    config: &GeneratorConfig,
    patients: &[Patient],
    rng: &mut ChaCha8Rng,
) -> Vec<ClinicalEvent> {
    let events_config = &config.events;
    let anchor_start = config.start_datetime();
    let anchor_end =
        config.end_datetime() - Duration::days(events_config.anchor_margin_days);

    let mut events = Vec::new();
    let mut event_id = 1;
    for patient in patients {
        let anchor = sample_datetime(rng, anchor_start, anchor_end);
        let window_end = anchor + Duration::days(events_config.window_days);
        let num_events =
            rng.gen_range(events_config.min_per_patient..=events_config.max_per_patient);

        for _ in 0..num_events {
            let event_type = *events_config.event_types.choose(rng);
            let (event_name, event_value, event_unit) = match event_type {
                EventType::Vitals => make_vital(&events_config.vitals, rng),
                EventType::Lab => make_lab(&events_config.labs, rng),
                EventType::Medication => make_dose(&events_config.medications, rng),
            };

            events.push(ClinicalEvent {
                event_id,
                patient_id: patient.patient_id,
                event_type,
                event_name,
                event_timestamp: sample_datetime(rng, anchor, window_end),
                event_value,
                event_unit,
            });
            event_id += 1;
        }
    }
    events
}

fn make_vital(vitals: &[VitalRange], rng: &mut ChaCha8Rng) -> (String, EventValue, String) {
    let vital = vitals
        .choose(rng)
        .expect("vitals table was validated before generation");
    match vital {
        VitalRange::Scalar(range) => scalar_reading(range, rng),
        VitalRange::BloodPressure {
            name,
            systolic_low,
            systolic_high,
            diastolic_low,
            diastolic_high,
            unit,
        } => (
            name.clone(),
            EventValue::Pressure {
                systolic: rng.gen_range(*systolic_low..=*systolic_high),
                diastolic: rng.gen_range(*diastolic_low..=*diastolic_high),
            },
            unit.clone(),
        ),
    }
}

fn make_lab(labs: &[MeasurementRange], rng: &mut ChaCha8Rng) -> (String, EventValue, String) {
    let lab = labs
        .choose(rng)
        .expect("labs table was validated before generation");
    scalar_reading(lab, rng)
}

fn scalar_reading(range: &MeasurementRange, rng: &mut ChaCha8Rng) -> (String, EventValue, String) {
    let value = round_to_tenth(rng.gen_range(range.low..range.high));
    (range.name.clone(), EventValue::Scalar(value), range.unit.clone())
}

fn make_dose(medications: &[DoseRange], rng: &mut ChaCha8Rng) -> (String, EventValue, String) {
    let medication = medications
        .choose(rng)
        .expect("medications table was validated before generation");
    let dose = *dose_grid(medication.low, medication.high)
        .choose(rng)
        .expect("dose grid is never empty");
    (
        medication.name.clone(),
        EventValue::Dose(dose),
        medication.unit.clone(),
    )
}

/// The evenly spaced dose grid across `[low, high]`: quarter-range
/// steps, so five points for ranges that divide evenly and never fewer
/// than two.
pub fn dose_grid(low: i64, high: i64) -> Vec<i64> {
    let step = ((high - low) / 4).max(1);
    (low..=high).step_by(step as usize).collect()
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn to_record_batch(events: &[ClinicalEvent]) -> Result<RecordBatch, ArrowError> {
    let mut event_id = Vec::new();
    let mut patient_id = Vec::new();
    let mut event_type = Vec::new();
    let mut event_name = Vec::new();
    let mut event_timestamp = Vec::new();
    let mut event_value = Vec::new();
    let mut event_unit = Vec::new();

    for event in events {
        event_id.push(event.event_id);
        patient_id.push(event.patient_id);
        event_type.push(event.event_type.as_str());
        event_name.push(event.event_name.clone());
        event_timestamp.push(event.event_timestamp.and_utc().timestamp());
        // String column so composite blood pressure readings share the
        // column with plain numeric values.
        event_value.push(event.event_value.to_string());
        event_unit.push(event.event_unit.clone());
    }

    RecordBatch::try_from_iter([
        ("event_id", Arc::new(UInt64Array::from(event_id)) as _),
        ("patient_id", Arc::new(UInt64Array::from(patient_id)) as _),
        ("event_type", Arc::new(StringArray::from(event_type)) as _),
        ("event_name", Arc::new(StringArray::from(event_name)) as _),
        (
            "event_timestamp",
            Arc::new(TimestampSecondArray::from(event_timestamp)) as _,
        ),
        ("event_value", Arc::new(StringArray::from(event_value)) as _),
        ("event_unit", Arc::new(StringArray::from(event_unit)) as _),
    ])
}
