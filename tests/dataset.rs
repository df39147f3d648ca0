//! End-to-end properties of a generated dataset: field ranges, key
//! relationships, time windows, seeding behavior and CSV export.

use std::collections::{HashMap, HashSet};
use std::fs;

use chrono::NaiveDateTime;
use synth_ehr::config::{GeneratorConfig, VitalRange};
use synth_ehr::dataset::make_dataset;
use synth_ehr::events::{EventType, EventValue};
use synth_ehr::output::timestamp_format::FORMAT;

fn seeded_config(num_patients: usize, seed: u64) -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.num_patients = num_patients;
    config.seed = Some(seed);
    config
}

#[test]
fn patient_ids_form_a_contiguous_range() {
    let dataset = make_dataset(&seeded_config(200, 1)).unwrap();
    let ids: Vec<u64> = dataset.patients.iter().map(|p| p.patient_id).collect();
    assert_eq!(ids, (101..301).collect::<Vec<u64>>());
}

#[test]
fn events_reference_patients_and_stay_in_their_windows() {
    let config = seeded_config(200, 2);
    let dataset = make_dataset(&config).unwrap();
    let patient_ids: HashSet<u64> =
        dataset.patients.iter().map(|p| p.patient_id).collect();

    let start = config.start_datetime();
    let end = config.end_datetime();
    let mut windows: HashMap<u64, (NaiveDateTime, NaiveDateTime)> = HashMap::new();

    for (index, event) in dataset.events.iter().enumerate() {
        // The id counter is global and never resets between patients.
        assert_eq!(event.event_id, index as u64 + 1);
        assert!(patient_ids.contains(&event.patient_id));
        assert!(event.event_timestamp >= start && event.event_timestamp <= end);

        let window = windows
            .entry(event.patient_id)
            .or_insert((event.event_timestamp, event.event_timestamp));
        window.0 = window.0.min(event.event_timestamp);
        window.1 = window.1.max(event.event_timestamp);
    }

    // All of a patient's events cluster within the 7-day anchor window.
    for (earliest, latest) in windows.values() {
        assert!((*latest - *earliest).num_days() <= 7);
    }

    // Every patient owns between 5 and 15 events.
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for event in &dataset.events {
        *counts.entry(event.patient_id).or_default() += 1;
    }
    assert_eq!(counts.len(), dataset.patients.len());
    assert!(counts.values().all(|&n| (5..=15).contains(&n)));
}

#[test]
fn event_values_respect_their_category_tables() {
    let config = seeded_config(200, 3);
    let dataset = make_dataset(&config).unwrap();

    // name -> (low, high, unit) for every scalar sub-category.
    let mut scalar_ranges: HashMap<&str, (f64, f64, &str)> = HashMap::new();
    for vital in &config.events.vitals {
        if let VitalRange::Scalar(range) = vital {
            scalar_ranges.insert(&range.name, (range.low, range.high, &range.unit));
        }
    }
    for lab in &config.events.labs {
        scalar_ranges.insert(&lab.name, (lab.low, lab.high, &lab.unit));
    }
    let dose_grids: HashMap<&str, Vec<i64>> = config
        .events
        .medications
        .iter()
        .map(|m| (m.name.as_str(), synth_ehr::events::dose_grid(m.low, m.high)))
        .collect();

    let mut seen_pressure = false;
    let mut seen_dose = false;
    for event in &dataset.events {
        match &event.event_value {
            EventValue::Scalar(value) => {
                let (low, high, unit) = scalar_ranges[event.event_name.as_str()];
                assert!(*value >= low && *value <= high, "{} out of range", event.event_name);
                assert_eq!(event.event_unit, unit);
                // Rounded to one decimal place.
                assert_eq!((value * 10.0).round() / 10.0, *value);
            }
            EventValue::Dose(dose) => {
                assert_eq!(event.event_type, EventType::Medication);
                assert!(dose_grids[event.event_name.as_str()].contains(dose));
                seen_dose = true;
            }
            EventValue::Pressure {
                systolic,
                diastolic,
            } => {
                assert_eq!(event.event_name, "blood_pressure");
                assert!((110..=140).contains(systolic));
                assert!((70..=90).contains(diastolic));
                seen_pressure = true;
            }
        }
    }
    assert!(seen_pressure && seen_dose);
}

#[test]
fn procedures_respect_their_type_ranges() {
    let config = seeded_config(500, 4);
    let dataset = make_dataset(&config).unwrap();
    let patient_ids: HashSet<u64> =
        dataset.patients.iter().map(|p| p.patient_id).collect();

    let duration_ranges: HashMap<&str, (i64, i64)> = config
        .procedures
        .types
        .iter()
        .map(|t| (t.name.as_str(), (t.min_minutes, t.max_minutes)))
        .collect();

    let mut counts: HashMap<u64, usize> = HashMap::new();
    let mut windows: HashMap<u64, (NaiveDateTime, NaiveDateTime)> = HashMap::new();
    for (index, record) in dataset.procedures.iter().enumerate() {
        assert_eq!(record.record_id, index as u64 + 1);
        assert!(patient_ids.contains(&record.patient_id));

        let (min_minutes, max_minutes) = duration_ranges[record.procedure_type.as_str()];
        assert!((min_minutes..=max_minutes).contains(&record.duration_minutes));

        *counts.entry(record.patient_id).or_default() += 1;
        let window = windows
            .entry(record.patient_id)
            .or_insert((record.procedure_timestamp, record.procedure_timestamp));
        window.0 = window.0.min(record.procedure_timestamp);
        window.1 = window.1.max(record.procedure_timestamp);
    }

    assert!(counts.values().all(|&n| (1..=3).contains(&n)));
    for (earliest, latest) in windows.values() {
        assert!((*latest - *earliest).num_days() <= 2);
    }

    // Roughly 20% of patients have no procedures at all.
    let without = dataset.patients.len() - counts.len();
    let fraction = without as f64 / dataset.patients.len() as f64;
    assert!(
        (0.1..=0.35).contains(&fraction),
        "unexpected zero-procedure fraction {fraction}"
    );
}

#[test]
fn a_single_patient_dataset_hangs_together() {
    let dataset = make_dataset(&seeded_config(1, 5)).unwrap();

    assert_eq!(dataset.patients.len(), 1);
    let patient_id = dataset.patients[0].patient_id;
    assert_eq!(patient_id, 101);

    assert!((5..=15).contains(&dataset.events.len()));
    assert!(dataset.events.iter().all(|e| e.patient_id == patient_id));

    assert!(dataset.procedures.len() <= 3);
    assert!(dataset.procedures.iter().all(|r| r.patient_id == patient_id));
}

#[test]
fn the_same_seed_reproduces_the_dataset() {
    let config = seeded_config(50, 6);
    let first = make_dataset(&config).unwrap();
    let second = make_dataset(&config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unseeded_runs_differ() {
    let mut config = GeneratorConfig::default();
    config.num_patients = 50;
    config.seed = None;

    let first = make_dataset(&config).unwrap();
    let second = make_dataset(&config).unwrap();
    assert_ne!(first.seed, second.seed);
    assert_ne!(first.events, second.events);
}

#[test]
fn csv_export_writes_headers_and_rows() {
    let mut config = seeded_config(20, 7);
    config.output_dir = std::env::temp_dir().join("synth_ehr_csv_export_test");
    fs::create_dir_all(&config.output_dir).unwrap();

    let dataset = make_dataset(&config).unwrap();
    dataset.write(&config).unwrap();

    let patients = fs::read_to_string(config.output_dir.join("patient_demographics.csv")).unwrap();
    let mut lines = patients.lines();
    assert_eq!(
        lines.next().unwrap(),
        "patient_id,age,gender,ethnicity,insurance_provider"
    );
    assert_eq!(lines.count(), dataset.patients.len());

    let events = fs::read_to_string(config.output_dir.join("clinical_events.csv")).unwrap();
    let mut lines = events.lines();
    assert_eq!(
        lines.next().unwrap(),
        "event_id,patient_id,event_type,event_name,event_timestamp,event_value,event_unit"
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), dataset.events.len());
    for row in &rows {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 7);
        assert!(NaiveDateTime::parse_from_str(fields[4], FORMAT).is_ok());
        if fields[3] == "blood_pressure" {
            let (systolic, diastolic) = fields[5].split_once('/').unwrap();
            assert!(systolic.parse::<i64>().is_ok());
            assert!(diastolic.parse::<i64>().is_ok());
        }
    }

    let procedures = fs::read_to_string(config.output_dir.join("medical_procedures.csv")).unwrap();
    let mut lines = procedures.lines();
    assert_eq!(
        lines.next().unwrap(),
        "record_id,patient_id,procedure_type,procedure_timestamp,duration_minutes,complication"
    );
    assert_eq!(lines.count(), dataset.procedures.len());
}

#[test]
fn a_missing_output_directory_is_fatal() {
    let mut config = seeded_config(2, 8);
    config.output_dir = std::env::temp_dir()
        .join("synth_ehr_missing_dir_test")
        .join("does_not_exist");

    let dataset = make_dataset(&config).unwrap();
    assert!(dataset.write(&config).is_err());
}

#[test]
fn parquet_mirror_round_trips() {
    let mut config = seeded_config(10, 9);
    config.parquet_mirror = true;
    config.output_dir = std::env::temp_dir().join("synth_ehr_parquet_mirror_test");
    fs::create_dir_all(&config.output_dir).unwrap();

    let dataset = make_dataset(&config).unwrap();
    dataset.write(&config).unwrap();

    let batch =
        synth_ehr::output::load_record_batch(&config.output_dir.join("clinical_events.parquet"))
            .unwrap();
    assert_eq!(batch.num_rows(), dataset.events.len());
    assert_eq!(batch.num_columns(), 7);
}
