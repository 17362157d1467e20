//! # PRMS Core
//!
//! Core business logic for the patient record management service.
//!
//! This crate contains pure data operations over the flat-file patient store:
//! - Record validation and derived-field computation (BMI, weight verdict)
//! - Whole-file load/modify/save against a single JSON collection
//! - Query and sort operations over the collection
//!
//! **No API concerns**: HTTP routing, status-code mapping, and OpenAPI
//! documentation belong in `api-rest`.

pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use error::{PatientError, PatientResult};
pub use record::{Gender, NewPatient, PatientRecord, RecordDraft, RecordPatch, Verdict};
pub use service::{PatientService, SortKey, SortOrder};
pub use store::{Collection, RecordStore};

/// Default backing file for the patient collection.
pub const DEFAULT_DATA_FILE: &str = "patients.json";
