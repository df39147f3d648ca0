//! Synthetic electronic health record tables.
//!
//! Generates three related tables -- patient demographics, clinical
//! events and medical procedures -- from a configuration, with every
//! random draw flowing from a single (optional) global seed, and
//! exports each table to CSV with an optional Parquet mirror.

pub mod config;
pub mod dataset;
pub mod demographics;
pub mod events;
pub mod output;
pub mod procedures;
pub mod seeded_rng;

pub use config::GeneratorConfig;
pub use dataset::{make_dataset, SyntheticDataset};
